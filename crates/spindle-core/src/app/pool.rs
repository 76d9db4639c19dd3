//! WorkerPool - 同時実行数の上限管理
//!
//! A counting semaphore with `capacity` permits. A [`Slot`] is one held
//! permit; dropping (or releasing) it returns the permit.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
}

/// Fixed-size budget of worker slots.
///
/// Clones share the same budget.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    sema: Arc<Semaphore>,
    capacity: usize,
}

/// One held unit of the concurrency budget.
#[derive(Debug)]
#[must_use = "dropping a slot releases it immediately"]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    /// Give the slot back to the pool.
    pub fn release(self) {
        drop(self);
    }
}

/// Every slot of a pool, held at once. Proof that nothing is in flight.
#[derive(Debug)]
pub struct Drained {
    _slots: Vec<Slot>,
}

impl WorkerPool {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            sema: Arc::new(Semaphore::new(capacity.get())),
            capacity: capacity.get(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.sema.available_permits()
    }

    /// Wait for a free slot and hold it.
    pub async fn acquire(&self) -> Result<Slot, PoolError> {
        let permit = Arc::clone(&self.sema)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(Slot { _permit: permit })
    }

    /// Acquire every slot, one at a time.
    ///
    /// Each acquire waits for some holder to release, so this resolves only
    /// once every slot taken before the call has come back.
    pub async fn drain(&self) -> Result<Drained, PoolError> {
        let mut slots = Vec::with_capacity(self.capacity);
        for _ in 0..self.capacity {
            slots.push(self.acquire().await?);
        }
        Ok(Drained { _slots: slots })
    }
}
