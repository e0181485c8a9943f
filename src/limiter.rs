//! Bounded task runner gating all filesystem and process work.
//!
//! A single [`Limiter`] is shared across one ingestion run. Every syscall-bound
//! future (stat, readdir, read, rm) and every external git invocation is pushed
//! through [`Limiter::run`], which caps the number of units in flight at the
//! configured ceiling. Queued units are admitted in arrival order: the tokio
//! semaphore hands out permits FIFO, so no unit starves. The unit's outcome is
//! returned to the caller untouched, and a failing unit frees its slot for the
//! next queued unit just like a succeeding one.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Default ceiling on concurrently in-flight filesystem/process operations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
}

impl Limiter {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Run `work` once a concurrency slot is free, holding the slot until the
    /// future resolves.
    pub async fn run<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire can only fail after a
        // close() we never issue.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("limiter semaphore closed");
        work.await
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}
