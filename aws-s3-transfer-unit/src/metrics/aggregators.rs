/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::metrics::instruments::{Gauge, IncreasingCounter};

/// Client-level metrics aggregating all work units driven by a [`Client`](crate::Client)
#[derive(Debug, Clone, Default)]
pub struct ClientMetrics {
    /// Total number of work units started
    units_started: IncreasingCounter,
    /// Total number of work units that finished successfully
    units_completed: IncreasingCounter,
    /// Total number of work units that ended in error
    units_failed: IncreasingCounter,
    /// Total bytes committed across all work units
    total_bytes_transferred: IncreasingCounter,
    /// Number of currently active work units
    active_units: Gauge,
}

impl ClientMetrics {
    /// Create new client metrics
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_units_started(&self) {
        self.units_started.increment(1);
        self.active_units.increment(1);
    }

    pub(crate) fn increment_units_completed(&self) {
        self.units_completed.increment(1);
        self.active_units.decrement(1);
    }

    pub(crate) fn increment_units_failed(&self) {
        self.units_failed.increment(1);
        self.active_units.decrement(1);
    }

    /// Add bytes to total transferred
    pub(crate) fn add_bytes_transferred(&self, bytes: u64) {
        self.total_bytes_transferred.increment(bytes);
    }

    /// Get the number of work units started
    pub fn units_started(&self) -> u64 {
        self.units_started.value()
    }

    /// Get the number of work units that finished successfully
    pub fn units_completed(&self) -> u64 {
        self.units_completed.value()
    }

    /// Get the number of work units that failed
    pub fn units_failed(&self) -> u64 {
        self.units_failed.value()
    }

    /// Get the total bytes transferred
    pub fn total_bytes_transferred(&self) -> u64 {
        self.total_bytes_transferred.value()
    }

    /// Get the number of currently active work units
    pub fn active_units(&self) -> u64 {
        self.active_units.value()
    }
}
