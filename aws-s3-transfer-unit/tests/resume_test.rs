/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use aws_s3_transfer_unit::checkpoint::{FileJournal, Journal, WindowSnapshot};
use aws_s3_transfer_unit::error::ErrorKind;
use aws_s3_transfer_unit::io::DataChunk;
use aws_s3_transfer_unit::job::TransferJob;
use aws_s3_transfer_unit::{Client, Config};
use bytes::Bytes;
use test_common::{MockTransport, RecordingController, StallingTransport};

const DATA: &[u8] = b"every adolescent dog goes bonkers early";

fn job(journal: FileJournal, snapshot: Option<WindowSnapshot>) -> TransferJob {
    let mut builder = TransferJob::builder()
        .source("memory://dog")
        .bucket("test-bucket")
        .key("dog.txt")
        .total_length(DATA.len() as u64)
        .journal(Arc::new(journal));
    if let Some(snapshot) = snapshot {
        builder = builder.resume_from(snapshot);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_interrupted_job_resumes_from_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal = FileJournal::new(dir.path().join("dog.journal"));

    // first run: the window is persisted with the chunk still pending, then the upload stalls
    let stalling = Arc::new(StallingTransport::new());
    let client = Client::new(Config::builder().transport(stalling.clone()).build());
    let first = job(journal.clone(), None);
    first
        .stage_chunk(DataChunk::new(0, Bytes::from_static(DATA)))
        .await
        .unwrap();
    journal
        .persist(&first.checkpoint().snapshot().await)
        .await
        .unwrap();
    let handle = client.start(first).unwrap();
    stalling.put_started().await;
    handle.abort().await.unwrap();

    let restored = journal.load().await.unwrap().unwrap();
    assert!(restored.pending().contains(&0));
    assert!(!restored.covers(DATA.len() as u64));

    // second run: restage the pending chunk and finish
    let transport = Arc::new(MockTransport::new());
    let client = Client::new(Config::builder().transport(transport.clone()).build());
    let second = job(journal.clone(), Some(restored));
    second
        .stage_chunk(DataChunk::new(0, Bytes::from_static(DATA)))
        .await
        .unwrap();
    client.start(second.clone()).unwrap().join().await.unwrap();

    assert_eq!(1, transport.put_calls());
    assert!(second.is_complete().await);
    let persisted = journal.load().await.unwrap().unwrap();
    assert!(persisted.covers(DATA.len() as u64));
    assert_eq!(DATA.len() as u64, persisted.bytes_transferred());
}

#[tokio::test]
async fn test_completed_job_sends_no_requests() {
    let dir = tempfile::tempdir().unwrap();
    let journal = FileJournal::new(dir.path().join("done.journal"));
    journal
        .persist(&WindowSnapshot::new(
            std::iter::empty(),
            DATA.len() as u64,
            1,
        ))
        .await
        .unwrap();

    let transport = Arc::new(MockTransport::new());
    let client = Client::new(Config::builder().transport(transport.clone()).build());
    let controller = Arc::new(RecordingController::new());
    let snapshot = journal.load().await.unwrap();
    let job = TransferJob::builder()
        .source("memory://dog")
        .bucket("test-bucket")
        .key("dog.txt")
        .total_length(DATA.len() as u64)
        .controller(controller.clone())
        .journal(Arc::new(journal))
        .resume_from(snapshot.unwrap())
        .build()
        .unwrap();

    client.start(job).unwrap().join().await.unwrap();

    assert_eq!(0, transport.fetch_calls());
    assert_eq!(0, transport.put_calls());
    assert!(controller.events().is_empty());
    assert_eq!(0, client.metrics().units_started());
}

#[tokio::test]
async fn test_corrupt_journal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.journal");
    tokio::fs::write(&path, "pending zero\n").await.unwrap();

    let err = FileJournal::new(path).load().await.unwrap_err();
    assert_eq!(&ErrorKind::InputInvalid, err.kind());
}
