/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{self, ErrorKind};

/// Response type for a started transfer job.
///
/// # Cancellation
///
/// Calling [`Self::abort`] cancels the job's work unit. An in-flight request is dropped
/// at its next await point, the unit moves to its error state and reports completion, and
/// the staged chunk is released. Dropping the handle detaches the job; it keeps running
/// in the background.
#[derive(Debug)]
#[non_exhaustive]
pub struct TransferHandle {
    task: JoinHandle<Result<(), error::Error>>,
    cancel: CancellationToken,
}

impl TransferHandle {
    pub(crate) fn new(
        task: JoinHandle<Result<(), error::Error>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { task, cancel }
    }

    /// Wait for the job to finish
    pub async fn join(self) -> Result<(), error::Error> {
        self.task.await?
    }

    /// Cancel the job and wait for its work unit to wind down.
    ///
    /// Returns `Ok(())` if the job was cancelled or had already finished successfully.
    pub async fn abort(self) -> Result<(), error::Error> {
        self.cancel.cancel();
        match self.task.await? {
            Err(err) if err.kind() == &ErrorKind::OperationCancelled => Ok(()),
            result => result,
        }
    }

    /// Token cancelling the job, e.g. to share with other tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the job has stopped running
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
