/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use aws_smithy_types::error::operation::BuildError;
use tokio::sync::Notify;

use crate::checkpoint::{Checkpoint, Journal, NoopJournal, WindowSnapshot};
use crate::error::{self, ErrorKind};
use crate::io::DataChunk;
use crate::operation::single_put::SinglePutUnit;
use crate::operation::{TransferContext, WorkUnit};
use crate::types::{AccessCondition, ObjectAttributes, ObjectProperties, ObjectType};
use crate::Client;

/// Identity of the data being transferred, e.g. a local path or a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    id: String,
}

impl Source {
    /// Create a source descriptor
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Display identity of the source
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Source::new(value)
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Source::new(value)
    }
}

impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Source::new(value.display().to_string())
    }
}

/// Where a job writes its object, and what the job has learned about it.
#[derive(Debug)]
pub struct Destination {
    bucket: String,
    key: String,
    access_condition: AccessCondition,
    expected_object_type: ObjectType,
    preconditions_validated: AtomicBool,
}

impl Destination {
    /// Create a destination descriptor for `key` in `bucket`
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            access_condition: AccessCondition::None,
            expected_object_type: ObjectType::Regular,
            preconditions_validated: AtomicBool::new(false),
        }
    }

    /// Set the condition evaluated when fetching the destination's attributes
    pub fn with_access_condition(mut self, condition: AccessCondition) -> Self {
        self.access_condition = condition;
        self
    }

    /// The bucket name containing the object
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key of the object
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Condition evaluated when fetching the destination's attributes
    pub fn access_condition(&self) -> &AccessCondition {
        &self.access_condition
    }

    /// The kind of object this job writes
    pub fn expected_object_type(&self) -> ObjectType {
        self.expected_object_type
    }

    /// Whether overwrite negotiation has completed for this destination
    pub fn preconditions_validated(&self) -> bool {
        self.preconditions_validated.load(Ordering::Acquire)
    }

    /// Returns true if this call performed the transition.
    pub(crate) fn mark_preconditions_validated(&self) -> bool {
        !self.preconditions_validated.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Chunks staged for a job, in the order they were staged.
#[derive(Debug)]
pub(crate) struct ChunkQueue {
    tx: async_channel::Sender<DataChunk>,
    rx: async_channel::Receiver<DataChunk>,
    staged: Notify,
}

impl ChunkQueue {
    fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            tx,
            rx,
            staged: Notify::new(),
        }
    }

    fn push(&self, chunk: DataChunk) -> Result<(), error::Error> {
        self.tx
            .try_send(chunk)
            .map_err(|_| error::Error::new(ErrorKind::RuntimeError, "chunk queue closed"))?;
        self.staged.notify_one();
        Ok(())
    }

    /// Take the next staged chunk, if any
    pub(crate) fn try_next(&self) -> Option<DataChunk> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

/// State shared between a job and its work units.
#[derive(Debug)]
pub struct SharedTransferContext {
    total_length: u64,
    attributes: OnceLock<ObjectAttributes>,
    properties: ObjectProperties,
    chunks: ChunkQueue,
}

impl SharedTransferContext {
    fn new(total_length: u64, properties: ObjectProperties) -> Self {
        Self {
            total_length,
            attributes: OnceLock::new(),
            properties,
            chunks: ChunkQueue::new(),
        }
    }

    /// Length of the whole payload in bytes
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Attributes of the destination as found by overwrite negotiation.
    ///
    /// `None` until negotiation has run.
    pub fn attributes(&self) -> Option<&ObjectAttributes> {
        self.attributes.get()
    }

    /// Properties the upload persists with the object
    pub fn properties(&self) -> &ObjectProperties {
        &self.properties
    }

    /// Number of staged chunks not yet taken by a work unit
    pub fn staged_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn chunks(&self) -> &ChunkQueue {
        &self.chunks
    }

    /// Store the negotiated attributes. They may be stored only once.
    pub(crate) fn record_attributes(
        &self,
        attributes: ObjectAttributes,
    ) -> Result<&ObjectAttributes, error::Error> {
        let mut recorded = false;
        let stored = self.attributes.get_or_init(|| {
            recorded = true;
            attributes
        });
        if !recorded {
            return Err(error::Error::new(
                ErrorKind::RuntimeError,
                "destination attributes were already recorded",
            ));
        }
        Ok(stored)
    }

    /// Resolves once a chunk has been staged since the last wake-up
    pub(crate) async fn chunk_staged(&self) {
        self.chunks.staged.notified().await
    }
}

/// Hooks a job's owner uses to steer and observe the job.
///
/// All methods have defaults: overwrites are approved, properties are left untouched and
/// reports are ignored.
#[async_trait::async_trait]
pub trait JobController: Send + Sync + fmt::Debug {
    /// Decide whether `existing` at `destination` may be replaced by `source`.
    ///
    /// Not consulted when the job forces overwrites.
    async fn confirm_overwrite(
        &self,
        _existing: &ObjectAttributes,
        _source: &Source,
        _destination: &Destination,
    ) -> bool {
        true
    }

    /// Adjust the properties sent with the upload request.
    fn set_custom_properties(&self, _properties: &mut ObjectProperties) {}

    /// Called with each increment of durably transferred bytes (possibly zero).
    fn report_progress(&self, _bytes: u64) {}

    /// Called exactly once per work unit when it reaches a terminal state.
    fn report_completion(&self, _result: Result<(), &error::Error>) {}
}

/// A [`JobController`] using every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultController;

impl JobController for DefaultController {}

/// State of a job shared by every handle to it.
#[derive(Debug)]
pub(crate) struct JobState {
    pub(crate) source: Source,
    pub(crate) destination: Destination,
    pub(crate) context: SharedTransferContext,
    pub(crate) checkpoint: Checkpoint,
    pub(crate) controller: Arc<dyn JobController>,
    pub(crate) force_overwrite: bool,
}

/// One source to destination transfer.
///
/// `TransferJob` is internally reference-counted and can be freely cloned, e.g. to keep
/// staging chunks while a work unit runs.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub(crate) state: Arc<JobState>,
}

impl TransferJob {
    /// Create a new job builder
    pub fn builder() -> TransferJobBuilder {
        TransferJobBuilder::default()
    }

    /// The source being transferred
    pub fn source(&self) -> &Source {
        &self.state.source
    }

    /// The destination being written
    pub fn destination(&self) -> &Destination {
        &self.state.destination
    }

    /// State shared with the job's work units
    pub fn context(&self) -> &SharedTransferContext {
        &self.state.context
    }

    /// Progress of the job
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.state.checkpoint
    }

    /// Whether existing objects are replaced without being checked
    pub fn force_overwrite(&self) -> bool {
        self.state.force_overwrite
    }

    /// Length of the whole payload in bytes
    pub fn total_length(&self) -> u64 {
        self.state.context.total_length()
    }

    /// Hand a chunk of source data to the job.
    ///
    /// The chunk's offset joins the checkpoint window until the chunk is uploaded. Chunks
    /// extending past the payload are rejected.
    pub async fn stage_chunk(&self, chunk: DataChunk) -> Result<(), error::Error> {
        let offset = chunk.offset();
        let len = chunk.len();
        let total = self.total_length();
        match offset.checked_add(len) {
            Some(end) if end <= total => {}
            _ => {
                return Err(error::invalid_input(format!(
                    "chunk at offset {offset} of {len} bytes does not fit a {total} byte payload"
                )))
            }
        }

        if !self.state.checkpoint.insert(offset).await {
            // offsets restored from a persisted window are staged again after a restart
            tracing::debug!(offset, "chunk offset already pending");
        }
        self.state.context.chunks.push(chunk)?;
        tracing::trace!(offset, len, "chunk staged");
        Ok(())
    }

    /// Whether every byte of the payload has been durably acknowledged
    pub async fn is_complete(&self) -> bool {
        self.state
            .checkpoint
            .snapshot()
            .await
            .covers(self.total_length())
    }

    /// Pick the work unit able to carry out this job with `client`.
    pub fn work_unit(&self, client: &Client) -> Result<Box<dyn WorkUnit>, error::Error> {
        Ok(Box::new(self.single_put_unit(client)?))
    }

    /// Create a single-request work unit for this job.
    ///
    /// Fails with [`ErrorKind::InputInvalid`] if the payload is larger than the client's
    /// single request threshold.
    pub fn single_put_unit(&self, client: &Client) -> Result<SinglePutUnit, error::Error> {
        let threshold = client.config().single_request_threshold();
        if self.total_length() > threshold {
            return Err(error::invalid_input(format!(
                "payload of {} bytes exceeds the single request threshold of {threshold} bytes",
                self.total_length()
            )));
        }
        let ctx = TransferContext::new(client.handle.clone(), self.state.clone());
        Ok(SinglePutUnit::new(ctx))
    }
}

/// Fluent style builder for [`TransferJob`]
#[derive(Debug, Default)]
pub struct TransferJobBuilder {
    source: Option<Source>,
    bucket: Option<String>,
    key: Option<String>,
    access_condition: AccessCondition,
    total_length: Option<u64>,
    properties: ObjectProperties,
    force_overwrite: bool,
    controller: Option<Arc<dyn JobController>>,
    journal: Option<Arc<dyn Journal>>,
    resume_from: Option<WindowSnapshot>,
}

impl TransferJobBuilder {
    /// Identity of the data being transferred (required)
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The bucket name containing the object (required)
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Key of the object (required)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Condition evaluated when checking the existing destination
    pub fn access_condition(mut self, condition: AccessCondition) -> Self {
        self.access_condition = condition;
        self
    }

    /// Length of the whole payload in bytes (required)
    pub fn total_length(mut self, total_length: u64) -> Self {
        self.total_length = Some(total_length);
        self
    }

    /// Properties persisted with the object
    pub fn properties(mut self, properties: ObjectProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Replace an existing object without checking it first
    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Hooks steering and observing the job. Defaults to [`DefaultController`].
    pub fn controller(mut self, controller: Arc<dyn JobController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Where the checkpoint window is persisted. Defaults to [`NoopJournal`].
    pub fn journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Continue from a previously persisted checkpoint window
    pub fn resume_from(mut self, snapshot: WindowSnapshot) -> Self {
        self.resume_from = Some(snapshot);
        self
    }

    /// Consumes the builder and constructs a [`TransferJob`]
    pub fn build(self) -> Result<TransferJob, BuildError> {
        let source = self
            .source
            .ok_or_else(|| BuildError::missing_field("source", "A source is required"))?;
        let bucket = self
            .bucket
            .ok_or_else(|| BuildError::missing_field("bucket", "A bucket is required"))?;
        let key = self
            .key
            .ok_or_else(|| BuildError::missing_field("key", "A key is required"))?;
        let total_length = self.total_length.ok_or_else(|| {
            BuildError::missing_field("total_length", "The payload length is required")
        })?;

        let journal = self.journal.unwrap_or_else(|| Arc::new(NoopJournal));
        let checkpoint = match self.resume_from {
            Some(snapshot) => Checkpoint::resume(snapshot, journal),
            None => Checkpoint::new(journal),
        };

        let state = JobState {
            source,
            destination: Destination::new(bucket, key).with_access_condition(self.access_condition),
            context: SharedTransferContext::new(total_length, self.properties),
            checkpoint,
            controller: self
                .controller
                .unwrap_or_else(|| Arc::new(DefaultController)),
            force_overwrite: self.force_overwrite,
        };
        Ok(TransferJob {
            state: Arc::new(state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Destination, TransferJob};
    use crate::checkpoint::WindowSnapshot;
    use crate::error::ErrorKind;
    use crate::io::DataChunk;
    use crate::types::ObjectAttributes;
    use bytes::Bytes;

    fn job(total_length: u64) -> TransferJob {
        TransferJob::builder()
            .source("memory://test")
            .bucket("test-bucket")
            .key("test-key")
            .total_length(total_length)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_destination() {
        let err = TransferJob::builder()
            .source("memory://test")
            .key("test-key")
            .total_length(1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[tokio::test]
    async fn test_stage_chunk_tracks_offset() {
        let job = job(8);
        job.stage_chunk(DataChunk::new(0, Bytes::from_static(b"abcd")))
            .await
            .unwrap();
        job.stage_chunk(DataChunk::new(4, Bytes::from_static(b"efgh")))
            .await
            .unwrap();

        assert_eq!(2, job.context().staged_chunks());
        let snapshot = job.checkpoint().snapshot().await;
        assert_eq!(vec![0, 4], snapshot.pending().iter().copied().collect::<Vec<_>>());

        let first = job.context().chunks().try_next().unwrap();
        assert_eq!(0, first.offset());
        assert_eq!(1, job.context().staged_chunks());
    }

    #[tokio::test]
    async fn test_stage_chunk_rejects_out_of_range() {
        let job = job(4);
        let err = job
            .stage_chunk(DataChunk::new(2, Bytes::from_static(b"abcd")))
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
        assert!(job.checkpoint().snapshot().await.pending().is_empty());

        let err = job
            .stage_chunk(DataChunk::new(u64::MAX, Bytes::from_static(b"a")))
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[tokio::test]
    async fn test_resumed_job_completion() {
        let done = TransferJob::builder()
            .source("memory://test")
            .bucket("test-bucket")
            .key("test-key")
            .total_length(10)
            .resume_from(WindowSnapshot::new(std::iter::empty(), 10, 1))
            .build()
            .unwrap();
        assert!(done.is_complete().await);

        let pending = TransferJob::builder()
            .source("memory://test")
            .bucket("test-bucket")
            .key("test-key")
            .total_length(10)
            .resume_from(WindowSnapshot::new([0], 0, 0))
            .build()
            .unwrap();
        assert!(!pending.is_complete().await);
        pending
            .stage_chunk(DataChunk::new(0, Bytes::from_static(b"0123456789")))
            .await
            .unwrap();
        assert_eq!(1, pending.checkpoint().snapshot().await.pending().len());
    }

    #[test]
    fn test_preconditions_validated_once() {
        let destination = Destination::new("test-bucket", "test-key");
        assert!(!destination.preconditions_validated());
        assert!(destination.mark_preconditions_validated());
        assert!(!destination.mark_preconditions_validated());
        assert!(destination.preconditions_validated());
        assert_eq!("s3://test-bucket/test-key", destination.to_string());
    }

    #[test]
    fn test_attributes_recorded_once() {
        let job = job(1);
        assert!(job.context().attributes().is_none());
        job.context()
            .record_attributes(ObjectAttributes::absent())
            .unwrap();
        let err = job
            .context()
            .record_attributes(ObjectAttributes::absent())
            .unwrap_err();
        assert_eq!(&ErrorKind::RuntimeError, err.kind());
        assert_eq!(Some(&ObjectAttributes::absent()), job.context().attributes());
    }
}
