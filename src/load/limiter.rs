use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::args::PositiveUsize;

/// Counting gate that bounds how many calls of one run are in flight.
///
/// Cloning shares the same pool of slots. Each run builds its own limiter.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// An admitted slot. Dropping it returns the slot to the pool, so the slot is
/// released exactly once on every path out of the guarded work, unwinding
/// included.
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    #[must_use]
    pub fn new(capacity: PositiveUsize) -> Self {
        let capacity = capacity.get().min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until fewer than `capacity` holders are admitted, then admits the
    /// caller. Waiters are queued fairly.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying semaphore was closed, which the
    /// limiter itself never does.
    pub async fn acquire(&self) -> Result<SlotGuard, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        Ok(SlotGuard { _permit: permit })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}
