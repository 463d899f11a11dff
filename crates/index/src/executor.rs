//! Bounded pool for the CPU-bound build and sort phases.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::IndexError;

/// Runs blocking closures on tokio's blocking pool, at most `workers` at a
/// time. Only the owner joins; tasks never wait on each other.
pub struct BoundedExecutor<T> {
    phase: &'static str,
    permits: Arc<Semaphore>,
    tasks: JoinSet<Result<T, IndexError>>,
}

impl<T> BoundedExecutor<T>
where
    T: Send + 'static,
{
    pub fn new(phase: &'static str, workers: usize) -> Self {
        Self {
            phase,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn submit<F>(&mut self, task: impl Into<String>, work: F)
    where
        F: FnOnce() -> Result<T, IndexError> + Send + 'static,
    {
        let task = task.into();
        let permits = self.permits.clone();
        self.tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return Err(IndexError::TaskFailed {
                        task,
                        message: e.to_string(),
                    });
                }
            };
            match tokio::task::spawn_blocking(work).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(IndexError::TaskPanicked { task }),
                Err(e) => Err(IndexError::Join(format!("{task}: {e}"))),
            }
        });
    }

    /// Wait for every submitted task. Returns all results (in completion
    /// order) or the first error observed.
    pub async fn join_all(mut self) -> Result<Vec<T>, IndexError> {
        debug!(phase = self.phase, tasks = self.tasks.len(), "joining");
        let mut results = Vec::with_capacity(self.tasks.len());
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(IndexError::Join(e.to_string())),
            };
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    error!(phase = self.phase, error = %e, "task failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn collects_every_result() {
        let mut executor = BoundedExecutor::new("test", 2);
        for i in 0..10u32 {
            executor.submit(format!("task-{i}"), move || Ok(i * 2));
        }
        assert_eq!(executor.len(), 10);
        let mut results = executor.join_all().await.unwrap();
        results.sort();
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_worker_count() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut executor = BoundedExecutor::new("test", 3);
        for i in 0..12 {
            let running = running.clone();
            let peak = peak.clone();
            executor.submit(format!("task-{i}"), move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }
        executor.join_all().await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failure_is_reported_after_all_tasks_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut executor = BoundedExecutor::new("test", 4);
        for i in 0..5 {
            let finished = finished.clone();
            executor.submit(format!("task-{i}"), move || {
                finished.fetch_add(1, Ordering::SeqCst);
                if i == 2 {
                    return Err(IndexError::TaskFailed {
                        task: format!("task-{i}"),
                        message: "boom".into(),
                    });
                }
                Ok(i)
            });
        }
        let err = executor.join_all().await.unwrap_err();
        assert!(matches!(err, IndexError::TaskFailed { ref task, .. } if task == "task-2"));
        assert_eq!(finished.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn panic_becomes_an_error() {
        let mut executor: BoundedExecutor<()> = BoundedExecutor::new("test", 1);
        executor.submit("explodes", || panic!("worker panic"));
        let err = executor.join_all().await.unwrap_err();
        assert!(matches!(err, IndexError::TaskPanicked { task } if task == "explodes"));
    }
}
