/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error;
use crate::job::JobState;
use crate::operation::{TransferContext, WorkUnit};

mod executor;
mod negotiate;

pub(crate) type SinglePutContext = TransferContext<JobState>;

/// States of a [`SinglePutUnit`].
///
/// A unit only ever moves forward: `FetchAttributes -> UploadBlob -> Finished`, with any
/// non-terminal state able to move to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Deciding whether the destination may be written
    FetchAttributes,
    /// Waiting to upload the staged chunk
    UploadBlob,
    /// Terminal: the unit failed
    Error,
    /// Terminal: the object was written and its chunk committed
    Finished,
}

/// Work unit uploading a whole payload with a single request.
///
/// The unit first negotiates the overwrite of the destination, then uploads the job's staged
/// chunk and commits it to the job's checkpoint. Completion is reported to the job's
/// controller exactly once.
#[derive(Debug)]
pub struct SinglePutUnit {
    ctx: SinglePutContext,
    state: UnitState,
    has_pending_work: bool,
    preprocessed: bool,
    started: bool,
    cancel: CancellationToken,
}

impl SinglePutUnit {
    pub(crate) fn new(ctx: SinglePutContext) -> Self {
        Self {
            ctx,
            state: UnitState::FetchAttributes,
            has_pending_work: false,
            preprocessed: false,
            started: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Current state of the unit
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Whether overwrite negotiation has succeeded
    pub fn is_preprocessed(&self) -> bool {
        self.preprocessed
    }

    fn finish(&mut self) {
        self.state = UnitState::Finished;
        self.has_pending_work = false;
        self.ctx.metrics().increment_units_completed();
        tracing::debug!(destination = %self.ctx.state().destination, "single put finished");
        self.ctx.state().controller.report_completion(Ok(()));
    }

    fn fail(&mut self, err: &error::Error) {
        self.state = UnitState::Error;
        self.has_pending_work = false;
        self.ctx.metrics().increment_units_failed();
        tracing::error!(
            destination = %self.ctx.state().destination,
            "single put failed: {err}"
        );
        self.ctx.state().controller.report_completion(Err(err));
    }

    async fn advance(&mut self) -> Result<(), error::Error> {
        if self.cancel.is_cancelled() {
            return Err(error::operation_cancelled());
        }

        match self.state {
            UnitState::FetchAttributes => {
                negotiate::negotiate(&self.ctx, &self.cancel).await?;
                tracing::trace!("overwrite negotiated, ready to upload");
                self.state = UnitState::UploadBlob;
                self.preprocessed = true;
                self.has_pending_work = true;
            }
            UnitState::UploadBlob => match executor::upload(&self.ctx, &self.cancel).await? {
                Some(_) => self.finish(),
                // nothing staged yet, nothing consumed
                None => self.has_pending_work = true,
            },
            UnitState::Error | UnitState::Finished => {}
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkUnit for SinglePutUnit {
    fn is_ready(&self) -> bool {
        let job = self.ctx.state();
        self.has_pending_work
            && (!self.preprocessed
                || (self.state == UnitState::UploadBlob
                    && !job.context.chunks().is_empty()
                    && job.context.attributes().is_some()))
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, UnitState::Error | UnitState::Finished)
    }

    fn schedule(&mut self) {
        if !self.is_terminal() {
            self.has_pending_work = true;
        }
    }

    async fn step(&mut self) -> Result<(), error::Error> {
        if self.is_terminal() {
            return Ok(());
        }
        if !self.started {
            self.started = true;
            self.ctx.metrics().increment_units_started();
        }

        self.has_pending_work = false;
        let result = self.advance().await;
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Run `fut` unless `cancel` fires first. A cancelled future is dropped.
async fn with_cancellation<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output, error::Error>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(error::operation_cancelled()),
        output = fut => Ok(output),
    }
}
