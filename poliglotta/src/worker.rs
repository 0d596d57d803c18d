//! Lazy shared state and the training worker pool.

use std::sync::{Arc, RwLock};
use std::thread;

use crate::errors::Result;

/// A double-checked, lazily initialized shared value.
///
/// Callers racing to trigger the first build block until one build finishes;
/// afterwards reads are shared-lock lookups. A failed build installs
/// nothing, so the next caller retries.
pub(crate) struct LazyShared<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> LazyShared<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub(crate) fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        {
            let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
            if let Some(value) = slot.as_ref() {
                return Ok(Arc::clone(value));
            }
        }
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

/// Runs independent fallible tasks on a fixed pool of worker threads and
/// waits for all of them. The first failure aborts the call; results keep
/// the submission order.
pub(crate) fn run_tasks<T, F>(tasks: Vec<F>, workers: usize) -> Result<Vec<T>>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    if tasks.is_empty() {
        return Ok(Vec::new());
    }
    let num_tasks = tasks.len();
    let (task_tx, task_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    for task in tasks.into_iter().enumerate() {
        // the channel cannot be closed here
        let _ = task_tx.send(task);
    }
    drop(task_tx);
    thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, task) in task_rx {
                    if result_tx.send((index, task())).is_err() {
                        // the caller aborted on an earlier failure
                        break;
                    }
                }
            });
        }
        drop(result_tx);
        let mut results = Vec::with_capacity(num_tasks);
        for (index, result) in result_rx {
            results.push((index, result?));
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, value)| value).collect())
    })
}
