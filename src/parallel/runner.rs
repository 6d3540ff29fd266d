use super::pool::{ExecutionPool, ThreadPool};
use super::process::ProcessPool;
use super::sink::{LineSink, ProgressSink, ProgressSnapshot, RunHeader};
use super::task::Task;
use crate::config::{PoolConfig, PoolMode, ResolvedPool};
use crate::error::{ConfigError, RunError};
use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Applies one task to every input in parallel and reports progress.
///
/// ```rust,no_run
/// use lazypar::config::{PoolConfig, WorkerCount};
/// use lazypar::parallel::{LazyParallel, Task};
///
/// fn square(x: u64) -> anyhow::Result<u64> {
///     Ok(x * x)
/// }
///
/// let pool = PoolConfig::processes(WorkerCount::Explicit(2));
/// let mut runner = LazyParallel::new(Task::new(square), [0, 1, 2, 3], &pool)?;
/// let squares: Vec<u64> = runner.run(true)?;
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// Process mode re-executes the current binary, which must answer with
/// [`serve_if_requested`](super::worker::serve_if_requested) and a registry
/// that knows the task's name.
pub struct LazyParallel<T, F> {
    task: Task<F>,
    items: Option<Vec<T>>,
    pool: ResolvedPool,
    worker_program: Option<PathBuf>,
    sink: Box<dyn ProgressSink>,
}

impl<T, F> LazyParallel<T, F> {
    /// Collect `items` and resolve the pool, detecting cores with `num_cpus`
    pub fn new<I>(task: Task<F>, items: I, config: &PoolConfig) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
    {
        Self::with_core_counter(task, items, config, num_cpus::get)
    }

    pub fn with_core_counter<I, D>(
        task: Task<F>,
        items: I,
        config: &PoolConfig,
        detect_cores: D,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        D: FnOnce() -> usize,
    {
        let pool = config.resolve(detect_cores)?;
        Ok(Self {
            task,
            items: Some(items.into_iter().collect()),
            pool,
            worker_program: None,
            sink: Box::new(LineSink::stderr()),
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Swap the task, keeping pending inputs, pool and sink
    pub fn with_task<G>(self, task: Task<G>) -> LazyParallel<T, G> {
        LazyParallel {
            task,
            items: self.items,
            pool: self.pool,
            worker_program: self.worker_program,
            sink: self.sink,
        }
    }

    /// Binary to spawn for process workers instead of the current executable
    pub fn with_worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    pub fn task_name(&self) -> &str {
        self.task.name()
    }

    pub fn mode(&self) -> PoolMode {
        self.pool.mode
    }

    pub fn workers(&self) -> usize {
        self.pool.workers
    }

    /// Inputs still waiting for `run`
    pub fn pending(&self) -> Option<usize> {
        self.items.as_ref().map(Vec::len)
    }

    /// Run over the inputs given at construction.
    ///
    /// Blocks until every task finished or the first one failed. The inputs
    /// are consumed; run again with [`run_on`](Self::run_on).
    pub fn run<R>(&mut self, verbose: bool) -> Result<Vec<R>>
    where
        T: Serialize + Send,
        R: DeserializeOwned + Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        let items = self.items.take().ok_or(RunError::MissingInput)?;
        self.execute(items, verbose)
    }

    /// Run the same task over fresh inputs
    pub fn run_on<I, R>(&mut self, items: I, verbose: bool) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = T>,
        T: Serialize + Send,
        R: DeserializeOwned + Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        self.execute(items.into_iter().collect(), verbose)
    }

    fn execute<R>(&mut self, items: Vec<T>, verbose: bool) -> Result<Vec<R>>
    where
        T: Serialize + Send,
        R: DeserializeOwned + Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        let Self {
            task,
            pool,
            worker_program,
            sink,
            ..
        } = self;

        let total = items.len();
        let start = Instant::now();
        info!(
            task = task.name(),
            mode = %pool.mode,
            workers = pool.workers,
            total,
            "run started"
        );

        if verbose {
            sink.start(&RunHeader {
                task_name: task.name().to_string(),
                mode: pool.mode,
                workers: pool.workers,
                total,
            });
            sink.update(&ProgressSnapshot {
                completed: 0,
                total,
                elapsed: start.elapsed(),
            });
        }

        let on_complete = |completed: usize| {
            if verbose {
                sink.update(&ProgressSnapshot {
                    completed,
                    total,
                    elapsed: start.elapsed(),
                });
            }
        };

        let results = match pool.mode {
            PoolMode::Thread => ThreadPool::new(pool.workers).map_ordered(task, items, on_complete)?,
            PoolMode::Process => {
                let process_pool = match worker_program {
                    Some(program) => ProcessPool::with_program(pool.workers, program.clone()),
                    None => ProcessPool::new(pool.workers)?,
                };
                process_pool.map_ordered(task, items, on_complete)?
            }
        };

        let elapsed = start.elapsed();
        if verbose {
            sink.finish(elapsed);
        }
        info!(task = task.name(), total, elapsed_ms = elapsed.as_millis() as u64, "run finished");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCount;
    use crate::parallel::sink::NullSink;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Writer whose bytes stay readable after the sink is boxed away
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn square(x: u64) -> Result<u64> {
        Ok(x * x)
    }

    #[test]
    fn test_squares_in_thread_mode() {
        let mut runner = LazyParallel::new(Task::new(square), [0, 1, 2, 3], &PoolConfig::threads(2))
            .unwrap()
            .with_sink(Box::new(NullSink));

        assert_eq!(runner.mode(), PoolMode::Thread);
        assert_eq!(runner.workers(), 2);
        assert_eq!(runner.task_name(), "square");
        assert_eq!(runner.pending(), Some(4));

        let results: Vec<u64> = runner.run(false).unwrap();
        assert_eq!(results, vec![0, 1, 4, 9]);
        assert_eq!(runner.pending(), None);
    }

    #[test]
    fn test_results_match_inputs_for_any_worker_count() {
        let inputs: Vec<u64> = (0..200).collect();
        let expected: Vec<u64> = inputs.iter().map(|x| x * x).collect();
        for threads in [1, 2, 3, 8, 64] {
            let mut runner = LazyParallel::new(Task::new(square), inputs.clone(), &PoolConfig::threads(threads))
                .unwrap()
                .with_sink(Box::new(NullSink));
            let results: Vec<u64> = runner.run(false).unwrap();
            assert_eq!(results, expected, "threads = {threads}");
        }
    }

    #[test]
    fn test_identical_runners_agree() {
        let build = || {
            LazyParallel::new(Task::new(square), 0..50u64, &PoolConfig::threads(4))
                .unwrap()
                .with_sink(Box::new(NullSink))
        };
        let first: Vec<u64> = build().run(false).unwrap();
        let second: Vec<u64> = build().run(false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_auto_uses_injected_core_count() {
        let runner = LazyParallel::with_core_counter(
            Task::new(square),
            Vec::<u64>::new(),
            &PoolConfig::processes(WorkerCount::Auto),
            || 6,
        )
        .unwrap();
        assert_eq!(runner.mode(), PoolMode::Process);
        assert_eq!(runner.workers(), 6);

        let runner = LazyParallel::new(Task::new(square), Vec::<u64>::new(), &PoolConfig::default()).unwrap();
        assert_eq!(runner.workers(), num_cpus::get());
        assert!(runner.workers() > 0);
    }

    #[test]
    fn test_invalid_count_fails_construction() {
        let err = LazyParallel::new(
            Task::new(square),
            [1u64],
            &PoolConfig::processes(WorkerCount::Explicit(0)),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::InvalidWorkerCount { field: "cores", .. }));

        assert!(LazyParallel::new(Task::new(square), [1u64], &PoolConfig::threads(0)).is_err());
    }

    #[test]
    fn test_verbose_output() {
        let buffer = SharedBuffer::default();
        let mut runner = LazyParallel::new(Task::new(square), [0, 1, 2, 3], &PoolConfig::threads(2))
            .unwrap()
            .with_sink(Box::new(LineSink::new(buffer.clone())));

        let results: Vec<u64> = runner.run(true).unwrap();
        assert_eq!(results, vec![0, 1, 4, 9]);

        let out = buffer.contents();
        assert!(out.starts_with("Running square in parallel on 2 cores.\nNumber of tasks: 4\n"));
        assert!(out.contains("\r[0%]   eta ? s"));
        assert!(out.contains("\r[100%]   eta 0 s"));
        assert!(out.contains("\nTime elapsed 0 s\n\n"));
        // Initial draw plus one redraw per task
        assert_eq!(out.matches('\r').count(), 5);
    }

    #[test]
    fn test_quiet_run_prints_nothing() {
        let buffer = SharedBuffer::default();
        let mut runner = LazyParallel::new(Task::new(square), [5, 6], &PoolConfig::threads(2))
            .unwrap()
            .with_sink(Box::new(LineSink::new(buffer.clone())));

        let results: Vec<u64> = runner.run(false).unwrap();
        assert_eq!(results, vec![25, 36]);
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_empty_input_verbose() {
        let buffer = SharedBuffer::default();
        let mut runner = LazyParallel::new(Task::new(square), Vec::<u64>::new(), &PoolConfig::threads(3))
            .unwrap()
            .with_sink(Box::new(LineSink::new(buffer.clone())));

        let results: Vec<u64> = runner.run(true).unwrap();
        assert!(results.is_empty());

        let out = buffer.contents();
        assert!(out.contains("Number of tasks: 0\n"));
        assert!(out.contains("[100%]   eta 0 s"));
        assert!(out.contains("Time elapsed 0 s"));
    }

    #[test]
    fn test_task_error_propagates_without_results() {
        #[derive(Debug)]
        struct Negative(i64);

        impl std::fmt::Display for Negative {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} is negative", self.0)
            }
        }

        impl std::error::Error for Negative {}

        let task = Task::named("checked", |x: i64| -> Result<i64> {
            if x < 0 {
                return Err(Negative(x).into());
            }
            Ok(x)
        });
        let mut runner = LazyParallel::new(task, [1, 2, -3, 4], &PoolConfig::threads(2))
            .unwrap()
            .with_sink(Box::new(NullSink));

        let err = runner.run::<i64>(false).unwrap_err();
        assert_eq!(err.downcast_ref::<Negative>().map(|n| n.0), Some(-3));
    }

    #[test]
    fn test_second_run_needs_new_input() {
        let mut runner = LazyParallel::new(Task::new(square), [2, 3], &PoolConfig::threads(2))
            .unwrap()
            .with_sink(Box::new(NullSink));

        let first: Vec<u64> = runner.run(false).unwrap();
        assert_eq!(first, vec![4, 9]);

        let err = runner.run::<u64>(false).unwrap_err();
        assert_eq!(err.downcast_ref::<RunError>(), Some(&RunError::MissingInput));

        let again: Vec<u64> = runner.run_on([7, 8], false).unwrap();
        assert_eq!(again, vec![49, 64]);
    }

    #[test]
    fn test_swapped_task_keeps_inputs_and_pool() {
        let runner = LazyParallel::new(Task::new(square), [1, 2, 3], &PoolConfig::threads(3))
            .unwrap()
            .with_sink(Box::new(NullSink));

        let mut runner = runner.with_task(Task::named("cube", |x: u64| -> Result<u64> { Ok(x * x * x) }));
        assert_eq!(runner.task_name(), "cube");
        assert_eq!(runner.workers(), 3);
        assert_eq!(runner.pending(), Some(3));

        let cubes: Vec<u64> = runner.run(false).unwrap();
        assert_eq!(cubes, vec![1, 8, 27]);

        // Spent inputs stay spent; fresh ones go through run_on
        let mut runner = runner.with_task(Task::new(square));
        assert_eq!(runner.pending(), None);
        let squares: Vec<u64> = runner.run_on([4, 5], false).unwrap();
        assert_eq!(squares, vec![16, 25]);
    }
}
