//! Child side of the process pool
//!
//! A worker program is any binary that calls [`serve_if_requested`] early in
//! `main` with a registry of the tasks it can run. The parent names the task
//! in the [`WORKER_TASK_ENV`] environment variable and then talks one JSON
//! object per line over the child's stdin/stdout:
//!
//! ```text
//! parent -> child   {"index":3,"input":9}
//! child  -> parent  {"index":3,"outcome":{"ok":81}}
//! child  -> parent  {"index":4,"outcome":{"err":"not a perfect square"}}
//! ```
//!
//! The child answers requests in the order they arrive and exits on EOF.

use super::task::Task;
use crate::error::WorkerError;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::debug;

/// Environment variable carrying the task name to a worker process
pub const WORKER_TASK_ENV: &str = "LAZYPAR_WORKER_TASK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub index: usize,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub index: usize,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok(Value),
    /// The task's error chain rendered with `{:#}`
    Err(String),
}

type ErasedFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

struct Entry {
    summary: String,
    func: ErasedFn,
}

/// Tasks a worker program can run, addressed by name
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Entry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`; inputs and outputs travel as JSON.
    ///
    /// Stdout belongs to the protocol while a worker serves. A task that
    /// prints to it (`println!` included) breaks the stream and the parent
    /// fails with [`WorkerError::Malformed`]; write diagnostics to stderr.
    pub fn register<T, R, F>(&mut self, name: &str, summary: &str, func: F) -> &mut Self
    where
        T: DeserializeOwned,
        R: Serialize,
        F: Fn(T) -> Result<R> + Send + Sync + 'static,
    {
        let erased: ErasedFn = Arc::new(move |input: Value| {
            let input: T = serde_json::from_value(input)?;
            Ok(serde_json::to_value(func(input)?)?)
        });
        self.tasks.insert(
            name.to_string(),
            Entry {
                summary: summary.to_string(),
                func: erased,
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered names with their one-line summaries, sorted by name
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tasks
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.summary.as_str()))
    }

    pub fn call(&self, name: &str, input: Value) -> Result<Value> {
        let entry = self
            .tasks
            .get(name)
            .ok_or_else(|| WorkerError::UnknownTask(name.to_string()))?;
        (entry.func)(input)
    }

    /// The registered function as a [`Task`] over JSON values, usable in
    /// either pool mode.
    pub fn task(&self, name: &str) -> Option<Task<impl Fn(Value) -> Result<Value> + Send + Sync + use<>>> {
        let func = Arc::clone(&self.tasks.get(name)?.func);
        Some(Task::named(name, move |input: Value| func(input)))
    }
}

/// Answer requests for `task_name` from `reader` until EOF.
///
/// Returns the number of requests served.
pub fn serve<Rd, W>(registry: &TaskRegistry, task_name: &str, reader: Rd, mut writer: W) -> Result<usize, WorkerError>
where
    Rd: BufRead,
    W: Write,
{
    let entry = registry
        .tasks
        .get(task_name)
        .ok_or_else(|| WorkerError::UnknownTask(task_name.to_string()))?;

    let mut served = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = serde_json::from_str(&line)?;
        let outcome = match (entry.func)(request.input) {
            Ok(value) => Outcome::Ok(value),
            Err(err) => Outcome::Err(format!("{err:#}")),
        };

        serde_json::to_writer(
            &mut writer,
            &Response {
                index: request.index,
                outcome,
            },
        )?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        served += 1;
    }

    debug!(task = task_name, served, "worker input closed");
    Ok(served)
}

/// Serve stdin/stdout if this process was started as a pool worker.
///
/// Returns `true` when it served, in which case the caller should exit
/// without doing anything else. Call it before anything that could start a
/// process pool: a worker that skips it fails with
/// [`WorkerError::NestedWorker`] as soon as it tries to spawn workers.
/// Tasks must not write to stdout, see [`TaskRegistry::register`].
pub fn serve_if_requested(registry: &TaskRegistry) -> Result<bool> {
    let Ok(task_name) = std::env::var(WORKER_TASK_ENV) else {
        return Ok(false);
    };

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    serve(registry, &task_name, stdin, stdout)?;
    Ok(true)
}
