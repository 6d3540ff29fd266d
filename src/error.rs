use thiserror::Error;

/// Rejected pool configuration, raised while constructing a runner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid worker count for `{field}`: {value} (expected \"auto\" or a positive integer)")]
    InvalidWorkerCount { field: &'static str, value: String },
}

/// Misuse of a runner that is not a task or pool failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("no input found, provide one with run_on()")]
    MissingInput,
}

/// A task that failed inside a worker process.
///
/// Thread workers return the task's own error untouched; only process workers
/// have to flatten it into a message to get it across the pipe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {index} failed: {message}")]
pub struct TaskError {
    pub index: usize,
    pub message: String,
}

/// Failures of the worker process machinery itself.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    #[error("worker process {worker_id} exited before answering task {index}")]
    Disconnected { worker_id: usize, index: usize },

    #[error(
        "this process is already a worker for task `{0}`; the worker program must call serve_if_requested before running a process pool"
    )]
    NestedWorker(String),

    #[error("worker process {worker_id} wrote something other than a response: {line:?}")]
    Malformed { worker_id: usize, line: String },

    #[error("worker process {worker_id} answered task {got} while task {expected} was pending")]
    OutOfOrder {
        worker_id: usize,
        expected: usize,
        got: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
