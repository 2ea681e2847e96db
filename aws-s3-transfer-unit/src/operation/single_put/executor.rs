/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio_util::sync::CancellationToken;

use super::{with_cancellation, SinglePutContext};
use crate::error;
use crate::transport::{PutOutput, PutRequest};
use crate::types::AccessCondition;

/// Upload the next staged chunk and commit it to the job's checkpoint.
///
/// Returns `None` if nothing is staged. A chunk that is not the whole payload fails with
/// [`ErrorKind::InputInvalid`](crate::error::ErrorKind::InputInvalid) before any request is
/// sent. The chunk, and its lease, is dropped on every path out of this function.
pub(super) async fn upload(
    ctx: &SinglePutContext,
    cancel: &CancellationToken,
) -> Result<Option<PutOutput>, error::Error> {
    let job = ctx.state();
    let Some(chunk) = job.context.chunks().try_next() else {
        tracing::trace!("no chunk staged");
        return Ok(None);
    };
    let offset = chunk.offset();
    let len = chunk.len();
    let total_length = job.context.total_length();
    if offset != 0 || len != total_length {
        return Err(error::invalid_input(format!(
            "a single request upload needs the whole {total_length} byte payload, \
             got {len} bytes at offset {offset}"
        )));
    }

    let mut properties = job.context.properties().clone();
    job.controller.set_custom_properties(&mut properties);

    // the destination was negotiated already, the upload never re-checks it
    let request = PutRequest {
        bucket: job.destination.bucket().to_owned(),
        key: job.destination.key().to_owned(),
        body: chunk.body(),
        access_condition: AccessCondition::None,
        properties,
    };

    let transport = ctx.transport();
    let put = ctx.send(request, |request| transport.put_object(request));
    let output = with_cancellation(cancel, put).await??;

    job.checkpoint.commit(offset, len).await?;
    ctx.metrics().add_bytes_transferred(len);
    job.controller.report_progress(len);
    tracing::debug!(
        offset,
        len,
        e_tag = output.e_tag(),
        buffers = chunk.buffer_count(),
        "chunk uploaded and committed"
    );
    Ok(Some(output))
}
