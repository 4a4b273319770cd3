use super::Task;
use crate::error::{Error, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A task that failed inside a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub label: String,
    pub message: String,
}

/// Counting semaphore bounding how many leaf tasks run at once
pub struct AdmissionGate {
    available: Mutex<usize>,
    released: Condvar,
}

/// Held while a leaf task runs; dropping it frees the slot
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    pub fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits),
            released: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn acquire(&self) -> Permit<'_> {
        let mut available = self.lock();
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        Permit { gate: self }
    }

    pub fn available(&self) -> usize {
        *self.lock()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.gate.lock() += 1;
        self.gate.released.notify_one();
    }
}

/// Runs task trees, spreading groups over a worker pool.
///
/// With a limit of 1 there is no pool and every task runs on the calling
/// thread in order.
pub struct Executor {
    pool: Option<ThreadPool>,
    gate: AdmissionGate,
    limit: usize,
    failures: Mutex<Vec<TaskFailure>>,
}

impl Executor {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::ConfigError(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        let pool = if limit == 1 {
            None
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(limit)
                .thread_name(|i| format!("swiftmock-worker-{i}"))
                .build()
                .map_err(|e| Error::TaskError(format!("failed to start worker pool: {e}")))?;
            Some(pool)
        };
        debug!("Executor started with a limit of {limit}");

        Ok(Self {
            pool,
            gate: AdmissionGate::new(limit),
            limit,
            failures: Mutex::new(Vec::new()),
        })
    }

    /// One worker per available core
    pub fn with_default_limit() -> Result<Self> {
        Self::new(default_limit())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_synchronous(&self) -> bool {
        self.pool.is_none()
    }

    pub(crate) fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Run a task tree to completion on behalf of the caller
    pub fn run<T: Send + 'static>(&self, task: Task<T>, input: Vec<T>) -> Result<Vec<T>> {
        task.execute(input, self)
    }

    /// Failures recorded so far, in the order they happened
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.lock_failures().clone()
    }

    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut *self.lock_failures())
    }

    fn lock_failures(&self) -> MutexGuard<'_, Vec<TaskFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn run_group<T: Send + 'static>(&self, tasks: Vec<Task<T>>) -> Vec<T> {
        let results: Mutex<Vec<(usize, Vec<T>)>> = Mutex::new(Vec::with_capacity(tasks.len()));

        match &self.pool {
            None => {
                for (index, task) in tasks.into_iter().enumerate() {
                    self.finish(index, task, &results);
                }
            }
            Some(pool) => {
                let results = &results;
                pool.in_place_scope(|scope| {
                    for (index, task) in tasks.into_iter().enumerate() {
                        scope.spawn(move |_| self.finish(index, task, results));
                    }
                });
            }
        }

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().flat_map(|(_, output)| output).collect()
    }

    fn finish<T: Send + 'static>(
        &self,
        index: usize,
        task: Task<T>,
        results: &Mutex<Vec<(usize, Vec<T>)>>,
    ) {
        let label = task.label().to_string();
        match task.execute(Vec::new(), self) {
            Ok(output) => results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((index, output)),
            Err(e) => {
                debug!("Task {label} failed: {e}");
                self.lock_failures().push(TaskFailure {
                    label,
                    message: e.to_string(),
                });
            }
        }
    }
}

pub fn default_limit() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
