/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aws_s3_transfer_unit::checkpoint::{Journal, WindowSnapshot};
use aws_s3_transfer_unit::error::{Error, ErrorKind};
use aws_s3_transfer_unit::job::{Destination, JobController, Source};
use aws_s3_transfer_unit::transport::{FetchError, PutOutput, PutRequest, Transport};
use aws_s3_transfer_unit::types::{AccessCondition, ObjectAttributes, ObjectProperties};
use bytes::Bytes;
use tokio::sync::Notify;

/// An object written through [`MockTransport`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub properties: ObjectProperties,
    pub access_condition: AccessCondition,
}

/// In-memory transport. Destinations start out missing unless seeded with
/// [`MockTransport::with_existing`].
#[derive(Debug, Default)]
pub struct MockTransport {
    existing: Mutex<HashMap<String, Result<ObjectAttributes, ()>>>,
    objects: Mutex<HashMap<String, StoredObject>>,
    put_failures: AtomicUsize,
    fetch_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

fn path(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `attributes` for `bucket/key`
    pub fn with_existing(self, bucket: &str, key: &str, attributes: ObjectAttributes) -> Self {
        self.existing
            .lock()
            .unwrap()
            .insert(path(bucket, key), Ok(attributes));
        self
    }

    /// Report an entry at `bucket/key` that is not an object
    pub fn with_incompatible(self, bucket: &str, key: &str) -> Self {
        self.existing
            .lock()
            .unwrap()
            .insert(path(bucket, key), Err(()));
        self
    }

    /// Fail every upload with a transport error
    pub fn failing_puts(self) -> Self {
        self.failing_next_puts(usize::MAX)
    }

    /// Fail the next `count` uploads with a transport error
    pub fn failing_next_puts(self, count: usize) -> Self {
        self.put_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// The object written to `bucket/key`, if any
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(&path(bucket, key)).cloned()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn fetch_attributes(
        &self,
        destination: &Destination,
        _condition: &AccessCondition,
    ) -> Result<ObjectAttributes, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let existing = self.existing.lock().unwrap();
        match existing.get(&path(destination.bucket(), destination.key())) {
            Some(Ok(attributes)) => Ok(attributes.clone()),
            Some(Err(())) => Err(FetchError::TypeMismatch),
            None => Err(FetchError::NotFound),
        }
    }

    async fn put_object(&self, request: PutRequest) -> Result<PutOutput, Error> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .put_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::new(ErrorKind::TransportFailed, "injected put failure"));
        }

        let key = path(request.bucket(), request.key());
        let stored = StoredObject {
            properties: request.properties().clone(),
            access_condition: request.access_condition().clone(),
            data: request.into_body().into_bytes(),
        };
        let e_tag = format!("\"{}\"", stored.data.len());
        self.objects.lock().unwrap().insert(key, stored);
        Ok(PutOutput::default().with_e_tag(e_tag))
    }
}

/// Transport whose uploads never complete. Attribute fetches report a missing destination
/// unless they are made to stall too.
#[derive(Debug, Default)]
pub struct StallingTransport {
    stall_fetches: bool,
    fetch_started: Notify,
    fetches_dropped: Arc<AtomicUsize>,
    put_started: Notify,
    puts_dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl StallingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make attribute fetches never complete either
    pub fn stalling_fetches(mut self) -> Self {
        self.stall_fetches = true;
        self
    }

    /// Resolves once an attribute fetch is in flight
    pub async fn fetch_started(&self) {
        self.fetch_started.notified().await
    }

    /// Number of in-flight attribute fetches that were abandoned
    pub fn fetches_dropped(&self) -> usize {
        self.fetches_dropped.load(Ordering::SeqCst)
    }

    /// Resolves once an upload is in flight
    pub async fn put_started(&self) {
        self.put_started.notified().await
    }

    /// Number of in-flight uploads that were abandoned
    pub fn puts_dropped(&self) -> usize {
        self.puts_dropped.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for StallingTransport {
    async fn fetch_attributes(
        &self,
        _destination: &Destination,
        _condition: &AccessCondition,
    ) -> Result<ObjectAttributes, FetchError> {
        if !self.stall_fetches {
            return Err(FetchError::NotFound);
        }
        let _in_flight = DropCounter(self.fetches_dropped.clone());
        self.fetch_started.notify_one();
        std::future::pending::<()>().await;
        unreachable!("stalled fetches never complete")
    }

    async fn put_object(&self, _request: PutRequest) -> Result<PutOutput, Error> {
        let _in_flight = DropCounter(self.puts_dropped.clone());
        self.put_started.notify_one();
        std::future::pending::<()>().await;
        unreachable!("stalled uploads never complete")
    }
}

/// Something a [`RecordingController`] was told
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    ConfirmOverwrite { source: String, destination: String },
    Progress(u64),
    Completed(Option<ErrorKind>),
}

/// Job controller recording every call it receives
#[derive(Debug)]
pub struct RecordingController {
    approve_overwrites: bool,
    metadata: Option<(String, String)>,
    events: Mutex<Vec<ControllerEvent>>,
}

impl Default for RecordingController {
    fn default() -> Self {
        Self {
            approve_overwrites: true,
            metadata: None,
            events: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decline every overwrite
    pub fn declining(mut self) -> Self {
        self.approve_overwrites = false;
        self
    }

    /// Add a metadata entry to every upload
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata = Some((key.to_owned(), value.to_owned()));
        self
    }

    pub fn events(&self) -> Vec<ControllerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ControllerEvent::Progress(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> Vec<Option<ErrorKind>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ControllerEvent::Completed(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ControllerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait::async_trait]
impl JobController for RecordingController {
    async fn confirm_overwrite(
        &self,
        _existing: &ObjectAttributes,
        source: &Source,
        destination: &Destination,
    ) -> bool {
        self.record(ControllerEvent::ConfirmOverwrite {
            source: source.to_string(),
            destination: destination.to_string(),
        });
        self.approve_overwrites
    }

    fn set_custom_properties(&self, properties: &mut ObjectProperties) {
        if let Some((key, value)) = &self.metadata {
            properties.insert_metadata(key.as_str(), value.as_str());
        }
    }

    fn report_progress(&self, bytes: u64) {
        self.record(ControllerEvent::Progress(bytes));
    }

    fn report_completion(&self, result: Result<(), &Error>) {
        self.record(ControllerEvent::Completed(
            result.err().map(|err| err.kind().clone()),
        ));
    }
}

/// Journal keeping every persisted window in memory
#[derive(Debug, Default)]
pub struct RecordingJournal {
    snapshots: Mutex<Vec<WindowSnapshot>>,
}

impl RecordingJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<WindowSnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Journal for RecordingJournal {
    async fn persist(&self, snapshot: &WindowSnapshot) -> Result<(), Error> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}
