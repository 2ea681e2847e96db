/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error;
use crate::job::TransferJob;
use crate::operation::WorkUnit;

/// Drive `unit` until it reaches a terminal state.
///
/// The unit is stepped whenever it is ready. Otherwise the driver parks until the job
/// stages another chunk or the unit is cancelled.
#[tracing::instrument(skip_all, level = "debug", name = "drive-work-unit")]
pub(crate) async fn run(mut unit: Box<dyn WorkUnit>, job: TransferJob) -> Result<(), error::Error> {
    if job.is_complete().await {
        tracing::debug!("checkpoint covers the whole payload, nothing to upload");
        return Ok(());
    }

    let cancel = unit.cancellation_token();
    unit.schedule();
    while !unit.is_terminal() {
        if unit.is_ready() || cancel.is_cancelled() {
            unit.step().await?;
            continue;
        }

        tracing::trace!("waiting for a staged chunk");
        tokio::select! {
            _ = job.context().chunk_staged() => {}
            _ = cancel.cancelled() => {}
        }
    }
    Ok(())
}
