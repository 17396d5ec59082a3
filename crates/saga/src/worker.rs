//! Bounded pool running flow work spawned by the observers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Runs spawned work on the tokio runtime with at most `concurrency` units
/// executing at once.
///
/// [`spawn`](WorkerPool::spawn) never waits for a free slot, so an observer
/// handing work to the pool keeps consuming its feed. Queued work waits for
/// a permit inside its own task.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            tasks: Mutex::new(JoinSet::new()),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawns one unit of work.
    pub async fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let mut tasks = self.tasks.lock().await;
        while let Some(finished) = tasks.try_join_next() {
            log_panic(finished);
        }
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::warn!("worker pool closed, dropping work");
                return;
            };
            work.await;
        });
        metrics::gauge!("worker_pool_in_flight").set(tasks.len() as f64);
    }

    /// Number of spawned units not yet reaped.
    pub async fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        while let Some(finished) = tasks.try_join_next() {
            log_panic(finished);
        }
        tasks.len()
    }

    /// Waits for all spawned work to finish.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(finished) = tasks.join_next().await {
            log_panic(finished);
        }
        metrics::gauge!("worker_pool_in_flight").set(0.0);
    }
}

fn log_panic(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "flow task panicked");
    }
}
