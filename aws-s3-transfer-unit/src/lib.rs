/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Resumable single-request upload work unit for Amazon S3.
//!
//! A [`TransferJob`](crate::job::TransferJob) describes one source to destination transfer.
//! When the payload fits in a single `PutObject` request the job is carried out by a
//! [`SinglePutUnit`](crate::operation::single_put::SinglePutUnit), a small state machine that
//!
//! 1. negotiates whether it may overwrite the destination (conditional `HeadObject`,
//!    object type checks, an optional confirmation hook), then
//! 2. uploads the staged chunk in one request and commits the chunk's offset to the job's
//!    [`Checkpoint`](crate::checkpoint::Checkpoint) so an interrupted job can resume.
//!
//! Units are pull-driven: a scheduler polls [`WorkUnit::is_ready`](crate::operation::WorkUnit::is_ready)
//! and calls [`WorkUnit::step`](crate::operation::WorkUnit::step). The crate ships a simple
//! driver behind [`Client::start`](crate::Client::start).
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> Result<(), aws_s3_transfer_unit::error::Error> {
//! use aws_s3_transfer_unit::io::DataChunk;
//! use aws_s3_transfer_unit::job::TransferJob;
//!
//! let config = aws_s3_transfer_unit::from_env().load().await;
//! let client = aws_s3_transfer_unit::Client::new(config);
//!
//! let body = bytes::Bytes::from_static(b"hello world");
//! let job = TransferJob::builder()
//!     .source("memory://greeting")
//!     .bucket("my-bucket")
//!     .key("greeting.txt")
//!     .total_length(body.len() as u64)
//!     .build()?;
//! job.stage_chunk(DataChunk::new(0, body)).await?;
//!
//! client.start(job)?.join().await?;
//! # Ok(())
//! # }
//! ```

/// Default number of chunks that may be staged in memory at once
pub(crate) const DEFAULT_MAX_STAGED_CHUNKS: usize = 128;

/// Default in-flight request concurrency
pub(crate) const DEFAULT_CONCURRENCY: usize = 64;

/// Error types emitted by `aws-s3-transfer-unit`
pub mod error;

/// Common types used by `aws-s3-transfer-unit`
pub mod types;

/// Types and helpers for I/O
pub mod io;

/// Transfer unit client
pub mod client;

/// Transfer jobs and the state they share with their work units
pub mod job;

/// Checkpoint window and journal persistence
pub mod checkpoint;

/// Storage transport abstraction and the Amazon S3 implementation
pub mod transport;

/// Work units
pub mod operation;

/// Configuration
pub mod config;

/// Internal runtime components
pub mod runtime;

/// Metrics
pub mod metrics;

pub use self::client::Client;
use self::config::loader::ConfigLoader;
pub use self::config::Config;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
