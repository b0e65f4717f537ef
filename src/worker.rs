//! Bounded offload pool for blocking collaborator calls.
//!
//! Work runs on tokio's blocking threads; a semaphore caps how many jobs
//! from this pool run at once so a slow index or disk cannot flood the
//! blocking thread pool.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// `size` of zero is bumped to one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` off the async scheduler and await its result.
    /// A panic inside `job` is reported as an error.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("worker pool closed")?;
        let out = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| anyhow!("blocking job failed: {e}"))?;
        out
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}
