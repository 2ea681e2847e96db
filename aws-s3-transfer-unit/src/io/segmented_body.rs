/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_1x::{Body, Frame, SizeHint};

/// HTTP body yielding each buffer of a segmented chunk as its own data frame.
#[derive(Debug)]
pub(super) struct SegmentedBody {
    segments: VecDeque<Bytes>,
    remaining: u64,
}

impl SegmentedBody {
    pub(super) fn new(segments: Vec<Bytes>) -> Self {
        let remaining = segments.iter().map(|s| s.len() as u64).sum();
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
            remaining,
        }
    }
}

impl Body for SegmentedBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let frame = this.segments.pop_front().map(|segment| {
            this.remaining -= segment.len() as u64;
            Ok(Frame::data(segment))
        });
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.segments.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentedBody;
    use bytes::Bytes;
    use http_body_1x::Body;

    #[test]
    fn test_size_hint_is_exact() {
        let body = SegmentedBody::new(vec![
            Bytes::from_static(b"abc"),
            Bytes::new(),
            Bytes::from_static(b"de"),
        ]);
        assert_eq!(Some(5), body.size_hint().exact());
        assert!(!body.is_end_stream());
    }
}
