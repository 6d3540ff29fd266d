use super::pool::{ExecutionPool, collect_ordered};
use super::task::Task;
use super::worker::{Outcome, Request, Response, WORKER_TASK_ENV};
use crate::config::PoolMode;
use crate::error::{TaskError, WorkerError};
use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{Receiver, Sender, bounded};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// Worker processes running a copy of a worker program.
///
/// Each child serves a single task by name (see [`super::worker`]); inputs
/// and results cross the pipe as JSON. One dispatcher thread per child keeps
/// exactly one request in flight, so idle children pull the next input the
/// same way pool threads do.
#[derive(Debug, Clone)]
pub struct ProcessPool {
    max_workers: usize,
    buffer_size: usize,
    program: PathBuf,
}

impl ProcessPool {
    /// Pool that re-executes the current binary as its worker program
    pub fn new(max_workers: usize) -> Result<Self> {
        let program =
            std::env::current_exe().context("Failed to locate the current executable")?;
        Ok(Self::with_program(max_workers, program))
    }

    pub fn with_program(max_workers: usize, program: impl Into<PathBuf>) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * 2,
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ExecutionPool for ProcessPool {
    fn mode(&self) -> PoolMode {
        PoolMode::Process
    }

    fn workers(&self) -> usize {
        self.max_workers
    }

    fn map_ordered<T, R, F, C>(&self, task: &Task<F>, items: Vec<T>, on_complete: C) -> Result<Vec<R>>
    where
        T: Serialize + Send,
        R: DeserializeOwned + Send,
        F: Fn(T) -> Result<R> + Sync,
        C: FnMut(usize),
    {
        // A worker that never served would spawn workers of its own, forever
        if let Ok(task_name) = std::env::var(WORKER_TASK_ENV) {
            return Err(WorkerError::NestedWorker(task_name).into());
        }

        let total_items = items.len();
        if total_items == 0 {
            return Ok(Vec::new());
        }

        let payloads = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .context("Failed to serialize task input")?;
        drop(items);

        // Spawn everything up front; an early failure drops (and kills) the
        // children already started
        let actual_workers = std::cmp::min(self.max_workers, total_items);
        let mut processes = Vec::with_capacity(actual_workers);
        for worker_id in 0..actual_workers {
            processes.push(WorkerProcess::spawn(&self.program, worker_id, task.name())?);
        }
        debug!(
            task = task.name(),
            program = %self.program.display(),
            workers = actual_workers,
            total = total_items,
            "started worker processes"
        );

        let (work_tx, work_rx) = bounded::<(usize, Value)>(self.buffer_size);
        let (result_tx, result_rx) = bounded::<(usize, Result<R>)>(self.buffer_size);
        let abort = AtomicBool::new(false);

        crossbeam::thread::scope(|s| -> Result<Vec<R>> {
            for process in processes {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let abort = &abort;
                s.spawn(move |_| dispatch(process, work_rx, result_tx, abort));
            }

            // Producer thread: send work to dispatchers
            let abort = &abort;
            s.spawn(move |_| {
                for work_item in payloads.into_iter().enumerate() {
                    if abort.load(Ordering::Relaxed) || work_tx.send(work_item).is_err() {
                        break;
                    }
                }
            });

            drop(work_rx);
            drop(result_tx);

            collect_ordered(result_rx, total_items, abort, on_complete)
        })
        .map_err(|_| anyhow!("Thread panic occurred during process dispatch"))?
    }
}

/// Feed one child until the work runs out or the map aborts
fn dispatch<R>(
    mut process: WorkerProcess,
    work_rx: Receiver<(usize, Value)>,
    result_tx: Sender<(usize, Result<R>)>,
    abort: &AtomicBool,
) where
    R: DeserializeOwned,
{
    while !abort.load(Ordering::Relaxed) {
        let Ok((index, input)) = work_rx.recv() else {
            break;
        };
        trace!(worker_id = process.worker_id, index, "task dispatched");

        let result = process
            .call(Request { index, input })
            .map_err(anyhow::Error::from)
            .and_then(|response| match response.outcome {
                Outcome::Ok(value) => serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode result of task {index}")),
                Outcome::Err(message) => Err(TaskError { index, message }.into()),
            });

        let failed = result.is_err();
        if result_tx.send((index, result)).is_err() || failed {
            break;
        }
    }

    if abort.load(Ordering::Relaxed) {
        process.kill();
    } else {
        process.shutdown();
    }
}

/// A spawned worker with its pipes; killed and reaped on drop
struct WorkerProcess {
    worker_id: usize,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    reaped: bool,
}

impl WorkerProcess {
    fn spawn(program: &Path, worker_id: usize, task_name: &str) -> Result<Self> {
        let mut child = Command::new(program)
            .env(WORKER_TASK_ENV, task_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn worker process {}", program.display()))?;

        let stdin = child.stdin.take();
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                child.kill().ok();
                child.wait().ok();
                anyhow::bail!("Worker process {worker_id} has no stdout pipe");
            }
        };

        trace!(worker_id, pid = child.id(), "worker process spawned");
        Ok(Self {
            worker_id,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            reaped: false,
        })
    }

    fn call(&mut self, request: Request) -> Result<Response, WorkerError> {
        let disconnected = WorkerError::Disconnected {
            worker_id: self.worker_id,
            index: request.index,
        };
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(disconnected);
        };

        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        if stdin.write_all(&line).and_then(|_| stdin.flush()).is_err() {
            return Err(disconnected);
        }

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            return Err(disconnected);
        }

        let response: Response =
            serde_json::from_str(&reply).map_err(|_| WorkerError::Malformed {
                worker_id: self.worker_id,
                line: reply.trim_end().to_string(),
            })?;
        if response.index != request.index {
            return Err(WorkerError::OutOfOrder {
                worker_id: self.worker_id,
                expected: request.index,
                got: response.index,
            });
        }
        Ok(response)
    }

    /// Close stdin so the child leaves its loop, then reap it
    fn shutdown(&mut self) {
        drop(self.stdin.take());
        match self.child.wait() {
            Ok(status) if !status.success() => {
                warn!(worker_id = self.worker_id, %status, "worker process exited with failure");
            }
            Ok(_) => trace!(worker_id = self.worker_id, "worker process exited"),
            Err(e) => warn!(worker_id = self.worker_id, error = %e, "failed to reap worker process"),
        }
        self.reaped = true;
    }

    fn kill(&mut self) {
        if self.reaped {
            return;
        }
        drop(self.stdin.take());
        self.child.kill().ok();
        self.child.wait().ok();
        self.reaped = true;
        trace!(worker_id = self.worker_id, "worker process killed");
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
