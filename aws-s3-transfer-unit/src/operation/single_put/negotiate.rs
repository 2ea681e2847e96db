/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio_util::sync::CancellationToken;

use super::{with_cancellation, SinglePutContext};
use crate::error::{self, ErrorKind};
use crate::transport::FetchError;
use crate::types::ObjectAttributes;

/// Decide whether the job may write its destination.
///
/// A zero byte progress report follows every negotiation that runs to completion,
/// successful or not. Cancelled negotiations report nothing.
pub(super) async fn negotiate(
    ctx: &SinglePutContext,
    cancel: &CancellationToken,
) -> Result<(), error::Error> {
    let result = check_destination(ctx, cancel).await;
    match &result {
        Err(err) if err.kind() == &ErrorKind::OperationCancelled => {}
        _ => ctx.state().controller.report_progress(0),
    }
    result
}

async fn check_destination(
    ctx: &SinglePutContext,
    cancel: &CancellationToken,
) -> Result<(), error::Error> {
    let job = ctx.state();
    let total_length = job.context.total_length();
    let max_object_size = ctx.config().max_object_size();
    if total_length > max_object_size {
        return Err(error::size_limit_exceeded(total_length, max_object_size));
    }

    let attributes = match job.context.attributes() {
        // an earlier unit of this job already validated the destination
        Some(recorded) => {
            tracing::debug!(
                destination = %job.destination,
                "reusing recorded destination attributes"
            );
            recorded
        }
        None => {
            let fetched = if job.force_overwrite {
                tracing::debug!("overwrite forced, skipping destination check");
                ObjectAttributes::absent()
            } else {
                fetch_attributes(ctx, cancel).await?
            };

            if job.destination.mark_preconditions_validated() {
                tracing::trace!(
                    destination = %job.destination,
                    "destination preconditions validated"
                );
            }
            job.context.record_attributes(fetched)?
        }
    };

    if attributes.exists() && !job.force_overwrite {
        let confirm =
            job.controller
                .confirm_overwrite(attributes, &job.source, &job.destination);
        if !with_cancellation(cancel, confirm).await? {
            return Err(error::Error::new(
                ErrorKind::OverwriteDeclined,
                format!("overwrite of {} declined", job.destination),
            ));
        }
    }

    let expected = job.destination.expected_object_type();
    if attributes.exists() && attributes.object_type() != expected {
        return Err(error::type_mismatch(format!(
            "{} holds a {:?} object, expected {expected:?}",
            job.destination,
            attributes.object_type()
        )));
    }
    Ok(())
}

async fn fetch_attributes(
    ctx: &SinglePutContext,
    cancel: &CancellationToken,
) -> Result<ObjectAttributes, error::Error> {
    let destination = &ctx.state().destination;
    let transport = ctx.transport();
    let fetch = ctx.send((), |()| {
        transport.fetch_attributes(destination, destination.access_condition())
    });

    match with_cancellation(cancel, fetch).await? {
        Ok(attributes)
            if attributes
                .object_type()
                .is_foreign_to(destination.expected_object_type()) =>
        {
            Err(error::type_mismatch(format!(
                "{destination} holds a {:?} object",
                attributes.object_type()
            )))
        }
        Ok(attributes) => Ok(attributes),
        Err(FetchError::NotFound) => {
            tracing::debug!(%destination, "destination does not exist");
            Ok(ObjectAttributes::absent())
        }
        Err(FetchError::TypeMismatch) => Err(error::type_mismatch(format!(
            "{destination} holds an entry that is not an object"
        ))),
        Err(FetchError::PreconditionFailed) => Err(error::Error::new(
            ErrorKind::PreconditionFailed,
            format!(
                "{destination} does not satisfy {:?}",
                destination.access_condition()
            ),
        )),
        Err(FetchError::Other(err)) => Err(err),
    }
}
