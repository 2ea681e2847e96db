/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;
use std::time::Duration;

use aws_s3_transfer_unit::error::ErrorKind;
use aws_s3_transfer_unit::io::DataChunk;
use aws_s3_transfer_unit::job::TransferJob;
use aws_s3_transfer_unit::metrics::unit::ByteUnit;
use aws_s3_transfer_unit::transport::{SharedTransport, Transport};
use aws_s3_transfer_unit::types::{AccessCondition, ObjectAttributes, ObjectType};
use aws_s3_transfer_unit::{Client, Config};
use bytes::Bytes;
use test_common::{
    ControllerEvent, MockTransport, RecordingController, RecordingJournal, StallingTransport,
};

const BUCKET: &str = "test-bucket";
const KEY: &str = "test-key";

fn client_with(transport: SharedTransport, max_object_size: Option<u64>) -> Client {
    let mut builder = Config::builder().transport(transport).concurrency(4);
    if let Some(limit) = max_object_size {
        builder = builder.max_object_size(limit);
    }
    Client::new(builder.build())
}

fn payload(len: u64) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}

struct Fixture {
    job: TransferJob,
    controller: Arc<RecordingController>,
    journal: Arc<RecordingJournal>,
}

fn fixture(total_length: u64, force_overwrite: bool, controller: RecordingController) -> Fixture {
    let controller = Arc::new(controller);
    let journal = Arc::new(RecordingJournal::new());
    let job = TransferJob::builder()
        .source("file:///tmp/payload.bin")
        .bucket(BUCKET)
        .key(KEY)
        .total_length(total_length)
        .force_overwrite(force_overwrite)
        .controller(controller.clone())
        .journal(journal.clone())
        .build()
        .unwrap();
    Fixture {
        job,
        controller,
        journal,
    }
}

#[tokio::test]
async fn test_five_mebibyte_object_is_uploaded() {
    let len = 5 * ByteUnit::Mebibyte.as_bytes_u64();
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(
        len,
        false,
        RecordingController::new().with_metadata("origin", "integration-test"),
    );

    let data = payload(len);
    let lease = client.buffer_pool().acquire().await.unwrap();
    fx.job
        .stage_chunk(DataChunk::new(0, data.clone()).with_lease(lease))
        .await
        .unwrap();
    client.start(fx.job.clone()).unwrap().join().await.unwrap();

    let stored = transport.object(BUCKET, KEY).unwrap();
    assert_eq!(data, stored.data);
    assert_eq!(AccessCondition::None, stored.access_condition);
    assert_eq!(
        Some(&"integration-test".to_owned()),
        stored.properties.metadata().unwrap().get("origin")
    );

    assert_eq!(1, transport.fetch_calls());
    assert_eq!(1, transport.put_calls());
    assert_eq!(vec![0, len], fx.controller.progress());
    assert_eq!(vec![None], fx.controller.completions());

    let persisted = fx.journal.snapshots();
    assert_eq!(1, persisted.len());
    assert!(persisted[0].covers(len));
    assert!(fx.job.is_complete().await);

    assert_eq!(len, client.metrics().total_bytes_transferred());
    assert_eq!(1, client.metrics().units_completed());
    assert_eq!(
        client.buffer_pool().capacity(),
        client.buffer_pool().available()
    );
}

#[tokio::test]
async fn test_segmented_chunk_is_uploaded_in_order() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(18, false, RecordingController::new());

    fx.job
        .stage_chunk(DataChunk::from_buffers(
            0,
            [
                Bytes::from_static(b"goes "),
                Bytes::from_static(b"bonkers "),
                Bytes::from_static(b"early"),
            ],
        ))
        .await
        .unwrap();
    client.start(fx.job.clone()).unwrap().join().await.unwrap();

    assert_eq!(
        Bytes::from_static(b"goes bonkers early"),
        transport.object(BUCKET, KEY).unwrap().data
    );
}

#[tokio::test]
async fn test_two_mebibyte_upload_onto_incompatible_object_fails() {
    let len = 2 * ByteUnit::Mebibyte.as_bytes_u64();
    let transport = Arc::new(MockTransport::new().with_existing(
        BUCKET,
        KEY,
        ObjectAttributes::existing(ObjectType::DirectoryMarker),
    ));
    let client = client_with(transport.clone(), None);
    let fx = fixture(len, false, RecordingController::new());
    fx.job
        .stage_chunk(DataChunk::new(0, payload(len)))
        .await
        .unwrap();

    let err = client
        .start(fx.job.clone())
        .unwrap()
        .join()
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::TypeMismatch, err.kind());
    assert_eq!(0, transport.put_calls());
    assert!(!fx.job.destination().preconditions_validated());
    assert_eq!(vec![0], fx.controller.progress());
    assert_eq!(vec![Some(ErrorKind::TypeMismatch)], fx.controller.completions());
    assert!(fx.journal.snapshots().is_empty());
    assert!(fx
        .job
        .checkpoint()
        .snapshot()
        .await
        .pending()
        .contains(&0));
    assert_eq!(1, client.metrics().units_failed());
}

#[tokio::test]
async fn test_incompatible_entry_reported_by_transport_fails() {
    let transport = Arc::new(MockTransport::new().with_incompatible(BUCKET, KEY));
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")))
        .await
        .unwrap();

    let err = client.start(fx.job).unwrap().join().await.unwrap_err();
    assert_eq!(&ErrorKind::TypeMismatch, err.kind());
    assert_eq!(0, transport.put_calls());
}

#[tokio::test]
async fn test_payload_above_object_limit_fails_before_any_request() {
    let len = 2 * ByteUnit::Mebibyte.as_bytes_u64();
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), Some(ByteUnit::Mebibyte.as_bytes_u64()));
    let fx = fixture(len, false, RecordingController::new());

    let err = client.start(fx.job).unwrap().join().await.unwrap_err();

    assert_eq!(&ErrorKind::SizeLimitExceeded, err.kind());
    assert_eq!(0, transport.fetch_calls());
    assert_eq!(0, transport.put_calls());
    assert_eq!(
        vec![
            ControllerEvent::Progress(0),
            ControllerEvent::Completed(Some(ErrorKind::SizeLimitExceeded))
        ],
        fx.controller.events()
    );
}

#[tokio::test]
async fn test_existing_object_is_replaced_after_confirmation() {
    let transport = Arc::new(MockTransport::new().with_existing(
        BUCKET,
        KEY,
        ObjectAttributes::existing(ObjectType::Regular).with_content_length(3),
    ));
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"new!")))
        .await
        .unwrap();

    client.start(fx.job.clone()).unwrap().join().await.unwrap();

    assert_eq!(
        vec![
            ControllerEvent::ConfirmOverwrite {
                source: "file:///tmp/payload.bin".to_owned(),
                destination: format!("s3://{BUCKET}/{KEY}"),
            },
            ControllerEvent::Progress(0),
            ControllerEvent::Progress(4),
            ControllerEvent::Completed(None),
        ],
        fx.controller.events()
    );
    assert!(fx.job.context().attributes().unwrap().exists());
    assert_eq!(
        Bytes::from_static(b"new!"),
        transport.object(BUCKET, KEY).unwrap().data
    );
}

#[tokio::test]
async fn test_declined_overwrite_leaves_object_untouched() {
    let transport = Arc::new(MockTransport::new().with_existing(
        BUCKET,
        KEY,
        ObjectAttributes::existing(ObjectType::Regular),
    ));
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new().declining());
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"new!")))
        .await
        .unwrap();

    let err = client.start(fx.job).unwrap().join().await.unwrap_err();
    assert_eq!(&ErrorKind::OverwriteDeclined, err.kind());
    assert_eq!(0, transport.put_calls());
    assert!(transport.object(BUCKET, KEY).is_none());
}

#[tokio::test]
async fn test_force_overwrite_skips_existence_check() {
    let transport = Arc::new(MockTransport::new().with_existing(
        BUCKET,
        KEY,
        ObjectAttributes::existing(ObjectType::DirectoryMarker),
    ));
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, true, RecordingController::new().declining());
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")))
        .await
        .unwrap();

    client.start(fx.job.clone()).unwrap().join().await.unwrap();

    assert_eq!(0, transport.fetch_calls());
    assert_eq!(1, transport.put_calls());
    assert!(fx.job.destination().preconditions_validated());
    assert!(!fx.job.context().attributes().unwrap().exists());
    assert!(!fx
        .controller
        .events()
        .iter()
        .any(|e| matches!(e, ControllerEvent::ConfirmOverwrite { .. })));
}

#[tokio::test]
async fn test_transport_failure_keeps_chunk_pending() {
    let transport = Arc::new(MockTransport::new().failing_puts());
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    let lease = client.buffer_pool().acquire().await.unwrap();
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")).with_lease(lease))
        .await
        .unwrap();

    let err = client
        .start(fx.job.clone())
        .unwrap()
        .join()
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::TransportFailed, err.kind());
    assert_eq!(1, transport.put_calls());
    assert_eq!(1, client.buffer_pool().released());
    let snapshot = fx.job.checkpoint().snapshot().await;
    assert!(snapshot.pending().contains(&0));
    assert_eq!(0, snapshot.bytes_transferred());
    assert_eq!(vec![0], fx.controller.progress());
    assert_eq!(vec![Some(ErrorKind::TransportFailed)], fx.controller.completions());
}

#[tokio::test]
async fn test_failed_job_is_retried_with_a_fresh_unit() {
    let transport = Arc::new(MockTransport::new().failing_next_puts(1));
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")))
        .await
        .unwrap();

    let err = client
        .start(fx.job.clone())
        .unwrap()
        .join()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::TransportFailed, err.kind());

    // the failed chunk was consumed, the producer stages it again
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")))
        .await
        .unwrap();
    let retry = client.start(fx.job.clone()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), retry.join())
        .await
        .expect("retried job stalled")
        .unwrap();

    assert_eq!(1, transport.fetch_calls());
    assert_eq!(2, transport.put_calls());
    assert!(fx.job.is_complete().await);
    assert_eq!(
        Bytes::from_static(b"data"),
        transport.object(BUCKET, KEY).unwrap().data
    );
    assert_eq!(
        vec![Some(ErrorKind::TransportFailed), None],
        fx.controller.completions()
    );
}

#[tokio::test]
async fn test_partial_chunk_is_never_uploaded() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(8, false, RecordingController::new());
    fx.job
        .stage_chunk(DataChunk::new(4, Bytes::from_static(b"efgh")))
        .await
        .unwrap();

    let err = client
        .start(fx.job.clone())
        .unwrap()
        .join()
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::InputInvalid, err.kind());
    assert_eq!(0, transport.put_calls());
    assert!(transport.object(BUCKET, KEY).is_none());
    assert!(!fx.job.is_complete().await);
    assert_eq!(vec![Some(ErrorKind::InputInvalid)], fx.controller.completions());
}

#[tokio::test]
async fn test_abort_cancels_in_flight_attribute_fetch() {
    let transport = Arc::new(StallingTransport::new().stalling_fetches());
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    let lease = client.buffer_pool().acquire().await.unwrap();
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")).with_lease(lease))
        .await
        .unwrap();

    let handle = client.start(fx.job.clone()).unwrap();
    transport.fetch_started().await;
    handle.abort().await.unwrap();

    assert_eq!(1, transport.fetches_dropped());
    assert_eq!(
        vec![ControllerEvent::Completed(Some(ErrorKind::OperationCancelled))],
        fx.controller.events()
    );
    assert!(fx.controller.progress().is_empty());
    assert!(!fx.job.destination().preconditions_validated());
    assert!(fx.job.context().attributes().is_none());
    assert_eq!(1, client.metrics().units_failed());

    // the chunk was never taken, it goes away with the job
    assert_eq!(0, client.buffer_pool().released());
    drop(fx.job);
    assert_eq!(1, client.buffer_pool().released());
    assert_eq!(
        client.buffer_pool().capacity(),
        client.buffer_pool().available()
    );
}

#[tokio::test]
async fn test_chunk_staged_after_start_is_picked_up() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());

    let handle = client.start(fx.job.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());
    assert_eq!(0, transport.put_calls());

    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"late")))
        .await
        .unwrap();
    handle.join().await.unwrap();
    assert_eq!(1, transport.put_calls());
}

#[tokio::test]
async fn test_abort_cancels_in_flight_upload() {
    let transport = Arc::new(StallingTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());
    let lease = client.buffer_pool().acquire().await.unwrap();
    fx.job
        .stage_chunk(DataChunk::new(0, Bytes::from_static(b"data")).with_lease(lease))
        .await
        .unwrap();

    let handle = client.start(fx.job.clone()).unwrap();
    transport.put_started().await;
    handle.abort().await.unwrap();

    assert_eq!(1, transport.puts_dropped());
    assert_eq!(1, client.buffer_pool().released());
    assert_eq!(
        client.buffer_pool().capacity(),
        client.buffer_pool().available()
    );
    assert_eq!(
        vec![Some(ErrorKind::OperationCancelled)],
        fx.controller.completions()
    );
    assert!(fx
        .job
        .checkpoint()
        .snapshot()
        .await
        .pending()
        .contains(&0));
    assert!(fx.journal.snapshots().is_empty());
    assert_eq!(1, client.metrics().units_failed());
}

#[tokio::test]
async fn test_abort_while_waiting_for_a_chunk() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);
    let fx = fixture(4, false, RecordingController::new());

    let handle = client.start(fx.job.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.abort().await.unwrap();

    assert_eq!(1, transport.fetch_calls());
    assert_eq!(0, transport.put_calls());
    assert_eq!(
        vec![Some(ErrorKind::OperationCancelled)],
        fx.controller.completions()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_jobs_share_one_client() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(transport.clone(), None);

    let mut handles = Vec::new();
    for i in 0..32u64 {
        let job = TransferJob::builder()
            .source(format!("memory://{i}"))
            .bucket(BUCKET)
            .key(format!("object-{i}"))
            .total_length(i + 1)
            .build()
            .unwrap();
        job.stage_chunk(DataChunk::new(0, payload(i + 1)))
            .await
            .unwrap();
        handles.push(client.start(job).unwrap());
    }
    for handle in handles {
        handle.join().await.unwrap();
    }

    assert_eq!(32, transport.put_calls());
    assert_eq!(32, client.metrics().units_completed());
    assert_eq!((1..=32).sum::<u64>(), client.metrics().total_bytes_transferred());
    assert_eq!(0, client.metrics().active_units());
    for i in 0..32u64 {
        let stored = transport.object(BUCKET, &format!("object-{i}")).unwrap();
        assert_eq!(i + 1, stored.data.len() as u64);
    }
}

#[tokio::test]
async fn test_payload_above_single_request_threshold_is_rejected() {
    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    let client = Client::new(
        Config::builder()
            .transport(transport)
            .single_request_threshold(8)
            .build(),
    );
    let fx = fixture(9, false, RecordingController::new());

    let err = client.start(fx.job).unwrap_err();
    assert_eq!(&ErrorKind::InputInvalid, err.kind());
    assert!(fx.controller.events().is_empty());
}
