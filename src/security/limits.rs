//! Concurrency gate for streaming relays.
//!
//! A fixed pool of slots backed by a semaphore. Acquisition never waits: a
//! full pool is reported to the caller, who rejects the request. A slot is
//! returned when its [`StreamPermit`] is dropped, so every exit path of a
//! request releases it exactly once.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::observability::metrics;

/// The pool of stream slots.
#[derive(Debug, Clone)]
pub struct StreamSlots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl StreamSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot if one is free. Returns `None` immediately otherwise.
    pub fn try_acquire(&self) -> Option<StreamPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => {
                metrics::stream_slot_acquired();
                tracing::trace!(available = self.available(), "Stream slot acquired");
                Some(StreamPermit { _permit: permit })
            }
            Err(TryAcquireError::NoPermits) => None,
            // Never closed; treat like a full pool.
            Err(TryAcquireError::Closed) => None,
        }
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A held stream slot. Released on drop.
#[derive(Debug)]
pub struct StreamPermit {
    _permit: OwnedSemaphorePermit,
}

impl Drop for StreamPermit {
    fn drop(&mut self) {
        metrics::stream_slot_released();
        tracing::trace!("Stream slot released");
    }
}
