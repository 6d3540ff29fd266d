//! # lazypar - ordered parallel map with progress
//!
//! Applies one function to every item of a list on a pool of worker
//! processes (or threads) and hands the results back in input order.
//! Verbose runs draw a live completion percentage and ETA on stderr.
//!
//! ## Features
//!
//! - **Ordered results**: result `i` always belongs to item `i`
//! - **Process or thread workers**: processes re-execute this binary and
//!   talk JSON lines over stdin/stdout, threads share the address space
//! - **Progress**: `[42%]   eta 1 min 3 s` status line or an indicatif bar
//! - **Layered config**: defaults, user and project files, `LAZYPAR_*`
//!   environment variables, then command-line flags
//!
//! ## Quick Start
//!
//! ```bash
//! # Square 0..1000 on every core
//! lazypar run square --range 1000
//!
//! # Four threads instead of processes
//! lazypar run collatz 27 97 871 --use-threads --threads 4
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod parallel;
pub mod tasks;

pub use cli::{Cli, Output};
pub use config::LazyparConfig;
pub use parallel::{LazyParallel, Task};
