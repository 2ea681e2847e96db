/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;

use crate::metrics::unit::ByteUnit;
use crate::transport::SharedTransport;
use crate::{DEFAULT_CONCURRENCY, DEFAULT_MAX_STAGED_CHUNKS};

pub(crate) mod loader;

/// Largest payload S3 accepts in a single `PutObject` request
pub(crate) const MAX_SINGLE_REQUEST_SIZE_BYTES: u64 = 5 * ByteUnit::Gibibyte.as_bytes_u64();

/// Largest object S3 can store
pub(crate) const MAX_OBJECT_SIZE_BYTES: u64 = 5 * ByteUnit::Tebibyte.as_bytes_u64();

/// Default payload size above which a job no longer fits a single request
pub(crate) const DEFAULT_SINGLE_REQUEST_THRESHOLD_BYTES: u64 = 8 * ByteUnit::Mebibyte.as_bytes_u64();

/// Configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct Config {
    single_request_threshold: u64,
    max_object_size: u64,
    max_staged_chunks: usize,
    concurrency: usize,
    transport: SharedTransport,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Largest payload (in bytes) that is uploaded with a single request.
    ///
    /// Jobs above this size need a multi-request work unit.
    pub fn single_request_threshold(&self) -> u64 {
        self.single_request_threshold
    }

    /// Largest destination object (in bytes) a job may produce.
    pub fn max_object_size(&self) -> u64 {
        self.max_object_size
    }

    /// Maximum number of chunks that may be staged in memory at once.
    pub fn max_staged_chunks(&self) -> usize {
        self.max_staged_chunks
    }

    /// Maximum number of in-flight transport requests across _all_ work units.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The transport used to send requests to the destination store.
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone)]
pub struct Builder {
    single_request_threshold: u64,
    max_object_size: u64,
    max_staged_chunks: usize,
    concurrency: usize,
    transport: Option<SharedTransport>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            single_request_threshold: DEFAULT_SINGLE_REQUEST_THRESHOLD_BYTES,
            max_object_size: MAX_OBJECT_SIZE_BYTES,
            max_staged_chunks: DEFAULT_MAX_STAGED_CHUNKS,
            concurrency: DEFAULT_CONCURRENCY,
            transport: None,
        }
    }
}

impl Builder {
    /// Largest payload that is sent as a single request.
    ///
    /// S3 accepts at most 5 GiB in one `PutObject`, larger values are rounded down.
    /// Default is 8 MiB.
    pub fn single_request_threshold(mut self, threshold: u64) -> Self {
        self.single_request_threshold = cmp::min(threshold, MAX_SINGLE_REQUEST_SIZE_BYTES);
        self
    }

    /// Largest destination object a job may produce. Jobs above it fail before any
    /// request is sent.
    ///
    /// Default is 5 TiB, the largest object S3 can store.
    pub fn max_object_size(mut self, limit: u64) -> Self {
        self.max_object_size = limit;
        self
    }

    /// Maximum number of chunks staged in memory at once (minimum 1).
    ///
    /// Default is 128.
    pub fn max_staged_chunks(mut self, max: usize) -> Self {
        self.max_staged_chunks = cmp::max(max, 1);
        self
    }

    /// Maximum number of in-flight transport requests across _all_ work units (minimum 1).
    ///
    /// Default is 64.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = cmp::max(concurrency, 1);
        self
    }

    /// Set the transport to use.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Config {
        Config {
            single_request_threshold: self.single_request_threshold,
            max_object_size: self.max_object_size,
            max_staged_chunks: self.max_staged_chunks,
            concurrency: self.concurrency,
            transport: self.transport.expect("transport set"),
        }
    }
}
