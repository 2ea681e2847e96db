/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tower::limit::GlobalConcurrencyLimitLayer;
use tracing::Instrument;

use crate::error;
use crate::job::TransferJob;
use crate::metrics::aggregators::ClientMetrics;
use crate::operation::TransferHandle;
use crate::runtime::buffer_pool::BufferPool;
use crate::runtime::driver;
use crate::Config;

/// Transfer unit client for Amazon Simple Storage Service.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out work units, e.g. config, request limits, metrics.
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: Config,
    pub(crate) metrics: ClientMetrics,
    pub(crate) request_limit: GlobalConcurrencyLimitLayer,
    pub(crate) buffer_pool: BufferPool,
}

impl Drop for Handle {
    fn drop(&mut self) {
        // Log final metrics summary when the client is dropped
        tracing::debug!(
            "Client metrics summary - Units started: {}, completed: {}, failed: {}, total bytes: {}",
            self.metrics.units_started(),
            self.metrics.units_completed(),
            self.metrics.units_failed(),
            self.metrics.total_bytes_transferred()
        );
    }
}

impl Client {
    /// Creates a new client from a transfer unit config.
    pub fn new(config: Config) -> Client {
        let request_limit = GlobalConcurrencyLimitLayer::new(config.concurrency());
        let buffer_pool = BufferPool::new(config.max_staged_chunks());
        let handle = Arc::new(Handle {
            config,
            metrics: ClientMetrics::new(),
            request_limit,
            buffer_pool,
        });
        Client { handle }
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Returns the client's metrics
    pub fn metrics(&self) -> &ClientMetrics {
        &self.handle.metrics
    }

    /// Pool bounding the chunks staged in memory across this client's jobs.
    ///
    /// Chunk producers acquire a lease per chunk and attach it with
    /// [`DataChunk::with_lease`](crate::io::DataChunk::with_lease).
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.handle.buffer_pool
    }

    /// Start driving `job` on the current tokio runtime.
    ///
    /// Fails right away if no work unit can carry out the job. A job whose checkpoint
    /// already covers the whole payload completes without sending any request.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use aws_s3_transfer_unit::io::DataChunk;
    /// use aws_s3_transfer_unit::job::TransferJob;
    ///
    /// async fn upload(
    ///     client: &aws_s3_transfer_unit::Client,
    ///     data: bytes::Bytes,
    /// ) -> Result<(), Box<dyn std::error::Error>> {
    ///     let job = TransferJob::builder()
    ///         .source("memory://data")
    ///         .bucket("my-bucket")
    ///         .key("my-key")
    ///         .total_length(data.len() as u64)
    ///         .build()?;
    ///     let lease = client.buffer_pool().acquire().await?;
    ///     job.stage_chunk(DataChunk::new(0, data).with_lease(lease)).await?;
    ///
    ///     client.start(job)?.join().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn start(&self, job: TransferJob) -> Result<TransferHandle, error::Error> {
        let unit = job.work_unit(self)?;
        let cancel = unit.cancellation_token();
        let span = tracing::debug_span!(
            "transfer-job",
            source = %job.source(),
            destination = %job.destination()
        );
        let task = tokio::spawn(driver::run(unit, job).instrument(span));
        Ok(TransferHandle::new(task, cancel))
    }
}
