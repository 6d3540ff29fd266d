use super::task::Task;
use crate::config::PoolMode;
use anyhow::{Result, anyhow, bail};
use crossbeam::channel::{Receiver, Sender, bounded};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// A fixed-size pool that maps a task over inputs in order.
///
/// `on_complete` runs on the calling thread once per finished task with the
/// number of tasks completed so far. The first failure aborts the map and is
/// returned; tasks that have not started yet are dropped.
pub trait ExecutionPool {
    fn mode(&self) -> PoolMode;

    fn workers(&self) -> usize;

    fn map_ordered<T, R, F, C>(&self, task: &Task<F>, items: Vec<T>, on_complete: C) -> Result<Vec<R>>
    where
        T: Serialize + Send,
        R: DeserializeOwned + Send,
        F: Fn(T) -> Result<R> + Sync,
        C: FnMut(usize);
}

/// Worker threads fed through crossbeam channels
#[derive(Debug, Clone)]
pub struct ThreadPool {
    max_workers: usize,
    buffer_size: usize,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, T, R, F> {
    worker_id: usize,
    work_rx: Receiver<(usize, T)>,
    result_tx: Sender<(usize, Result<R>)>,
    task: &'a Task<F>,
    abort: &'a AtomicBool,
}

impl ThreadPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * 2,
        }
    }

    /// Ordered map without the serialization bounds a process pool needs
    pub fn execute<T, R, F, C>(&self, task: &Task<F>, items: Vec<T>, on_complete: C) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync,
        C: FnMut(usize),
    {
        let total_items = items.len();
        if total_items == 0 {
            return Ok(Vec::new());
        }

        let actual_workers = std::cmp::min(self.max_workers, total_items);
        let (work_tx, work_rx) = bounded::<(usize, T)>(self.buffer_size);
        let (result_tx, result_rx) = bounded::<(usize, Result<R>)>(self.buffer_size);
        let abort = AtomicBool::new(false);

        debug!(
            task = task.name(),
            workers = actual_workers,
            total = total_items,
            "starting thread pool"
        );

        crossbeam::thread::scope(|s| -> Result<Vec<R>> {
            // Spawn worker threads
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    task,
                    abort: &abort,
                };
                s.spawn(move |_| worker_thread(ctx));
            }

            // Producer thread: send work to workers
            let abort = &abort;
            s.spawn(move |_| {
                for work_item in items.into_iter().enumerate() {
                    if abort.load(Ordering::Relaxed) || work_tx.send(work_item).is_err() {
                        break; // Aborted or workers dropped
                    }
                }
            });

            // Only the workers may keep these alive, otherwise a stopped
            // producer or collector would wait forever
            drop(work_rx);
            drop(result_tx);

            let outcome = collect_ordered(result_rx, total_items, abort, on_complete);
            debug!(task = task.name(), ok = outcome.is_ok(), "thread pool drained");
            outcome
        })
        .map_err(|_| anyhow!("Thread panic occurred during parallel execution"))?
    }
}

impl ExecutionPool for ThreadPool {
    fn mode(&self) -> PoolMode {
        PoolMode::Thread
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
        self.execute(task, items, on_complete)
    }
}

fn worker_thread<T, R, F>(ctx: WorkerContext<'_, T, R, F>)
where
    F: Fn(T) -> Result<R>,
{
    while !ctx.abort.load(Ordering::Relaxed) {
        let Ok((index, work_item)) = ctx.work_rx.recv() else {
            break;
        };
        trace!(worker_id = ctx.worker_id, index, "task started");

        let result = catch_unwind(AssertUnwindSafe(|| ctx.task.call(work_item)))
            .unwrap_or_else(|payload| Err(anyhow!("task {index} panicked: {}", panic_message(&*payload))));

        if ctx.result_tx.send((index, result)).is_err() {
            break; // Receiver dropped
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Gather `(index, result)` pairs into input order.
///
/// Raises `abort` and returns on the first error. Every slot is written at
/// most once; a short count after the senders hang up is an error.
pub(crate) fn collect_ordered<R, C>(
    result_rx: Receiver<(usize, Result<R>)>,
    total_items: usize,
    abort: &AtomicBool,
    mut on_complete: C,
) -> Result<Vec<R>>
where
    C: FnMut(usize),
{
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total_items).collect();
    let mut completed = 0;

    while completed < total_items {
        let Ok((index, result)) = result_rx.recv() else {
            break;
        };
        match result {
            Ok(value) => {
                debug_assert!(slots[index].is_none(), "slot {index} written twice");
                slots[index] = Some(value);
                completed += 1;
                on_complete(completed);
            }
            Err(err) => {
                abort.store(true, Ordering::Relaxed);
                return Err(err);
            }
        }
    }

    if completed < total_items {
        abort.store(true, Ordering::Relaxed);
        bail!("workers stopped after {completed} of {total_items} tasks");
    }

    Ok(slots.into_iter().flatten().collect())
}
