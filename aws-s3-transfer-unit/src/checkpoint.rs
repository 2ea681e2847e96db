/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{self, ErrorKind};

mod file_journal;
pub use file_journal::FileJournal;

/// Point-in-time copy of a job's checkpoint window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub(crate) pending: BTreeSet<u64>,
    pub(crate) bytes_transferred: u64,
    pub(crate) committed_chunks: u64,
}

impl WindowSnapshot {
    /// Create a snapshot from its parts, e.g. when restoring from custom storage.
    pub fn new(
        pending: impl IntoIterator<Item = u64>,
        bytes_transferred: u64,
        committed_chunks: u64,
    ) -> Self {
        Self {
            pending: pending.into_iter().collect(),
            bytes_transferred,
            committed_chunks,
        }
    }

    /// Start offsets of chunks that were staged but not yet acknowledged
    pub fn pending(&self) -> &BTreeSet<u64> {
        &self.pending
    }

    /// Bytes durably acknowledged so far
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Number of chunks durably acknowledged so far
    pub fn committed_chunks(&self) -> u64 {
        self.committed_chunks
    }

    /// Whether a job of `total_length` bytes has been fully acknowledged
    pub fn covers(&self, total_length: u64) -> bool {
        self.pending.is_empty()
            && self.committed_chunks > 0
            && self.bytes_transferred >= total_length
    }
}

/// Durable storage for a job's checkpoint window.
#[async_trait::async_trait]
pub trait Journal: Send + Sync + fmt::Debug {
    /// Durably record `snapshot` as the job's current window.
    async fn persist(&self, snapshot: &WindowSnapshot) -> Result<(), error::Error>;
}

/// A [`Journal`] that keeps nothing. Jobs using it cannot resume after a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopJournal;

#[async_trait::async_trait]
impl Journal for NoopJournal {
    async fn persist(&self, _snapshot: &WindowSnapshot) -> Result<(), error::Error> {
        Ok(())
    }
}

/// The set of not-yet-acknowledged chunk offsets of a job, along with the bytes acknowledged so far.
///
/// All reads and writes go through one lock so that an offset's removal, the matching
/// increase of transferred bytes and the journal write are observed together.
#[derive(Debug)]
pub struct Checkpoint {
    window: Mutex<WindowSnapshot>,
    journal: Arc<dyn Journal>,
}

impl Checkpoint {
    /// Create an empty checkpoint persisted through `journal`
    pub fn new(journal: Arc<dyn Journal>) -> Self {
        Self::resume(WindowSnapshot::default(), journal)
    }

    /// Create a checkpoint starting from a previously persisted window
    pub fn resume(snapshot: WindowSnapshot, journal: Arc<dyn Journal>) -> Self {
        Self {
            window: Mutex::new(snapshot),
            journal,
        }
    }

    /// Record a newly staged chunk. Returns false if the offset was already pending.
    pub async fn insert(&self, offset: u64) -> bool {
        self.window.lock().await.pending.insert(offset)
    }

    /// Acknowledge the chunk starting at `offset`.
    ///
    /// Removes the offset, persists the resulting window and adds `len` to the bytes
    /// transferred while holding the window lock. If the journal write fails the window is
    /// left untouched.
    pub async fn commit(&self, offset: u64, len: u64) -> Result<WindowSnapshot, error::Error> {
        let mut window = self.window.lock().await;
        if !window.pending.contains(&offset) {
            return Err(error::Error::new(
                ErrorKind::RuntimeError,
                format!("offset {offset} is not pending in the checkpoint window"),
            ));
        }

        let mut next = window.clone();
        next.pending.remove(&offset);
        next.bytes_transferred += len;
        next.committed_chunks += 1;
        self.journal.persist(&next).await?;

        tracing::trace!(
            offset,
            len,
            remaining = next.pending.len(),
            "checkpoint window committed"
        );
        *window = next.clone();
        Ok(next)
    }

    /// A consistent copy of the current window
    pub async fn snapshot(&self) -> WindowSnapshot {
        self.window.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{Checkpoint, Journal, NoopJournal, WindowSnapshot};
    use crate::error::{self, ErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct FailingJournal {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Journal for FailingJournal {
        async fn persist(&self, _snapshot: &WindowSnapshot) -> Result<(), error::Error> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(error::Error::new(ErrorKind::IOError, "journal unavailable"))
        }
    }

    #[tokio::test]
    async fn test_commit_removes_offset_and_counts_bytes() {
        let checkpoint = Checkpoint::new(Arc::new(NoopJournal));
        assert!(checkpoint.insert(0).await);
        assert!(checkpoint.insert(4096).await);
        assert!(!checkpoint.insert(0).await);

        let snapshot = checkpoint.commit(0, 4096).await.unwrap();
        assert_eq!(1, snapshot.pending().len());
        assert!(snapshot.pending().contains(&4096));
        assert_eq!(4096, snapshot.bytes_transferred());
        assert_eq!(1, snapshot.committed_chunks());
        assert_eq!(snapshot, checkpoint.snapshot().await);
    }

    #[tokio::test]
    async fn test_commit_is_at_most_once() {
        let checkpoint = Checkpoint::new(Arc::new(NoopJournal));
        checkpoint.insert(0).await;
        checkpoint.commit(0, 10).await.unwrap();

        let err = checkpoint.commit(0, 10).await.unwrap_err();
        assert_eq!(&ErrorKind::RuntimeError, err.kind());
        assert_eq!(10, checkpoint.snapshot().await.bytes_transferred());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_window_untouched() {
        let journal = Arc::new(FailingJournal::default());
        let checkpoint = Checkpoint::new(journal.clone());
        checkpoint.insert(0).await;

        let err = checkpoint.commit(0, 10).await.unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        assert_eq!(1, journal.attempts.load(Ordering::SeqCst));

        let snapshot = checkpoint.snapshot().await;
        assert!(snapshot.pending().contains(&0));
        assert_eq!(0, snapshot.bytes_transferred());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_are_never_partially_visible() {
        let checkpoint = Arc::new(Checkpoint::new(Arc::new(NoopJournal)));
        for i in 0..64u64 {
            checkpoint.insert(i * 100).await;
        }

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64u64 {
            let checkpoint = checkpoint.clone();
            tasks.spawn(async move { checkpoint.commit(i * 100, 100).await.map(|_| ()) });
        }
        let observer = {
            let checkpoint = checkpoint.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = checkpoint.snapshot().await;
                    let committed = 64 - snapshot.pending().len() as u64;
                    assert_eq!(committed * 100, snapshot.bytes_transferred());
                    assert_eq!(committed, snapshot.committed_chunks());
                    tokio::task::yield_now().await;
                }
            })
        };

        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        observer.await.unwrap();

        let snapshot = checkpoint.snapshot().await;
        assert!(snapshot.covers(6400));
    }

    #[test]
    fn test_covers_requires_a_commit() {
        assert!(!WindowSnapshot::default().covers(0));
        assert!(WindowSnapshot::new(std::iter::empty(), 0, 1).covers(0));
        assert!(!WindowSnapshot::new([0], 10, 1).covers(10));
    }
}
