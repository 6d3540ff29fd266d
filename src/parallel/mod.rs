//! Ordered parallel map with progress reporting
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Resource Discovery**: Resolves `cores = "auto"` through an injectable
//!   core counter (`num_cpus::get` by default)
//! - **Execution Strategy**: Runs tasks on worker threads or worker processes
//!   behind one [`ExecutionPool`] interface
//! - **Ordering**: Results come back in input order whatever order workers
//!   finish in
//! - **Progress**: Turns completion count and elapsed time into a percentage
//!   and ETA, and hands them to a swappable [`ProgressSink`]
//!
//! ## What This Module Does NOT Do:
//! - **Retries or recovery**: The first failing task ends the run
//! - **Cancellation**: A run blocks until it finishes or fails
//! - **Distribution**: Every worker runs on this machine
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  LazyParallel   │    │  ExecutionPool   │    │    Workers      │
//! │                 │───▶│                  │───▶│                 │
//! │ • Task + inputs │    │ • ThreadPool     │    │ • threads       │
//! │ • Estimator     │◀───│ • ProcessPool    │◀───│ • processes     │
//! │ • ProgressSink  │    │ • ordered slots  │    │   (JSON lines)  │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use lazypar::config::PoolConfig;
//! use lazypar::parallel::{LazyParallel, NullSink, Task};
//!
//! let task = Task::named("double", |x: u32| -> anyhow::Result<u32> { Ok(x * 2) });
//! let mut runner = LazyParallel::new(task, 1..=5, &PoolConfig::threads(2))?
//!     .with_sink(Box::new(NullSink));
//!
//! let doubled: Vec<u32> = runner.run(false)?;
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod estimator;
pub mod pool;
pub mod process;
pub mod runner;
pub mod sink;
pub mod task;
pub mod worker;

// Re-export main types for easier access
pub use estimator::{Estimate, Eta, estimate};
pub use pool::{ExecutionPool, ThreadPool};
pub use process::ProcessPool;
pub use runner::LazyParallel;
pub use sink::{BarSink, LineSink, NullSink, ProgressSink, ProgressSnapshot, RunHeader};
pub use task::Task;
pub use worker::{TaskRegistry, serve_if_requested};
