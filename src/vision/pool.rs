//! Recognition worker pool
//!
//! A worker is checked out for exactly one recognition run. The returned
//! guard puts it back when dropped, so success, failure and cancellation
//! all release it.

use parking_lot::Mutex;
use std::ops::Deref;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::error::{OcrError, Result};

/// Fixed set of recognition workers
#[derive(Debug)]
pub struct EnginePool<E> {
    idle: Mutex<Vec<E>>,
    permits: Semaphore,
    size: usize,
}

impl<E> EnginePool<E> {
    /// Create a pool from a set of workers
    pub fn new(workers: Vec<E>) -> Result<Self> {
        if workers.is_empty() {
            return Err(OcrError::engine_unavailable("worker pool has no engines"));
        }

        let size = workers.len();
        Ok(Self {
            idle: Mutex::new(workers),
            permits: Semaphore::new(size),
            size,
        })
    }

    /// Total number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not currently checked out
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a free worker
    pub async fn acquire(&self) -> Result<PooledEngine<'_, E>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| OcrError::engine_unavailable_with_source("worker pool closed", e))?;

        // A permit guarantees an idle worker
        let engine = self
            .idle
            .lock()
            .pop()
            .ok_or_else(|| OcrError::engine_unavailable("worker pool is empty"))?;

        debug!("Acquired recognition worker ({} idle)", self.permits.available_permits());

        Ok(PooledEngine {
            pool: self,
            engine: Some(engine),
            _permit: permit,
        })
    }
}

/// A checked-out worker, returned to the pool on drop
pub struct PooledEngine<'a, E> {
    pool: &'a EnginePool<E>,
    engine: Option<E>,
    // Released after the engine is pushed back (fields drop after Drop::drop)
    _permit: SemaphorePermit<'a>,
}

impl<E> Deref for PooledEngine<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        // Only taken in Drop
        self.engine.as_ref().expect("pooled engine present until drop")
    }
}

impl<E> Drop for PooledEngine<'_, E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.idle.lock().push(engine);
            debug!("Released recognition worker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_pool_rejected() {
        let result = EnginePool::<u32>::new(vec![]);
        assert!(matches!(result, Err(OcrError::EngineUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let pool = EnginePool::new(vec![1u32, 2]).unwrap();
        assert_eq!(pool.available(), 2);

        {
            let a = pool.acquire().await.unwrap();
            let b = pool.acquire().await.unwrap();
            assert_eq!(pool.available(), 0);
            assert_ne!(*a, *b);
        }

        assert_eq!(pool.available(), 2);
        assert_eq!(pool.idle.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let pool = EnginePool::new(vec![7u32]).unwrap();
        let held = pool.acquire().await.unwrap();

        let waiting = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(waiting.is_err(), "second acquire should wait");

        drop(held);
        let next = pool.acquire().await.unwrap();
        assert_eq!(*next, 7);
    }
}
