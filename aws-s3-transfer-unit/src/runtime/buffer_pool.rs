/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error;
use crate::metrics::instruments::IncreasingCounter;

/// Bounds the number of chunks a chunk producer may hold in memory at once.
///
/// `BufferPool` is internally reference-counted and can be freely cloned.
#[derive(Debug, Clone)]
pub struct BufferPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    released: IncreasingCounter,
}

impl BufferPool {
    /// Create a new pool allowing `capacity` chunks to be staged at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            released: IncreasingCounter::new(),
        }
    }

    /// Wait for room to stage another chunk.
    pub async fn acquire(&self) -> Result<BufferLease, error::Error> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(error::from_kind(error::ErrorKind::RuntimeError))?;
        Ok(self.lease(permit))
    }

    /// Stage another chunk only if there is room right now.
    pub fn try_acquire(&self) -> Option<BufferLease> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| self.lease(permit))
    }

    fn lease(&self, permit: OwnedSemaphorePermit) -> BufferLease {
        BufferLease {
            _permit: permit,
            released: self.released.clone(),
        }
    }

    /// Number of chunks that may still be staged
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Total number of chunks this pool admits at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of leases released so far
    pub fn released(&self) -> u64 {
        self.released.value()
    }
}

/// Accounts for one staged chunk. Dropping the lease returns its slot to the pool.
#[must_use]
#[clippy::has_significant_drop]
#[derive(Debug)]
pub struct BufferLease {
    _permit: OwnedSemaphorePermit,
    released: IncreasingCounter,
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        self.released.increment(1);
    }
}
