/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::IoSlice;

use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::body::SdkBody;
use bytes::{Buf, Bytes};
use bytes_utils::SegmentedBuf;

use super::segmented_body::SegmentedBody;

/// Read-only view over the data of a staged chunk.
///
/// A chunk backed by a single buffer is exposed directly. A chunk backed by several buffers
/// is exposed as one logical sequence of bytes via [`impl Buf`](bytes::Buf) without copying
/// the buffers into contiguous storage.
#[derive(Debug, Clone)]
pub struct ChunkBody {
    inner: Inner,
}

#[derive(Debug, Clone)]
enum Inner {
    Contiguous(Bytes),
    Segmented(SegmentedBuf<Bytes>),
}

impl ChunkBody {
    pub(crate) fn new(buffers: &[Bytes]) -> Self {
        let inner = match buffers {
            [] => Inner::Contiguous(Bytes::new()),
            [single] => Inner::Contiguous(single.clone()),
            many => {
                let mut segmented = SegmentedBuf::new();
                for buf in many {
                    segmented.push(buf.clone());
                }
                Inner::Segmented(segmented)
            }
        };
        Self { inner }
    }

    /// Logical length of the data in bytes
    pub fn len(&self) -> u64 {
        self.remaining() as u64
    }

    /// Returns true if the view holds no data
    pub fn is_empty(&self) -> bool {
        !self.has_remaining()
    }

    /// Convert this view into an [`Iterator`] of the underlying segments, in order.
    pub fn into_segments(self) -> impl Iterator<Item = Bytes> {
        let segments: Vec<Bytes> = match self.inner {
            Inner::Contiguous(bytes) => vec![bytes],
            Inner::Segmented(segmented) => segmented.into_inner().into_iter().collect(),
        };
        segments.into_iter()
    }

    /// Convert this view into [`Bytes`], copying only if the data is segmented.
    pub fn into_bytes(self) -> Bytes {
        match self.inner {
            Inner::Contiguous(bytes) => bytes,
            Inner::Segmented(mut segmented) => segmented.copy_to_bytes(segmented.remaining()),
        }
    }

    /// Converts the view into a retryable [`ByteStream`] suitable for a `PutObject` body.
    pub(crate) fn into_byte_stream(self) -> ByteStream {
        match self.inner {
            Inner::Contiguous(bytes) => ByteStream::from(bytes),
            Inner::Segmented(segmented) => {
                let segments: Vec<Bytes> = segmented.into_inner().into_iter().collect();
                let body = SdkBody::retryable(move || {
                    SdkBody::from_body_1_x(SegmentedBody::new(segments.clone()))
                });
                ByteStream::new(body)
            }
        }
    }
}

impl Buf for ChunkBody {
    fn remaining(&self) -> usize {
        match &self.inner {
            Inner::Contiguous(bytes) => bytes.remaining(),
            Inner::Segmented(segmented) => segmented.remaining(),
        }
    }

    fn chunk(&self) -> &[u8] {
        match &self.inner {
            Inner::Contiguous(bytes) => bytes.chunk(),
            Inner::Segmented(segmented) => segmented.chunk(),
        }
    }

    fn chunks_vectored<'a>(&'a self, dst: &mut [IoSlice<'a>]) -> usize {
        match &self.inner {
            Inner::Contiguous(bytes) => bytes.chunks_vectored(dst),
            Inner::Segmented(segmented) => segmented.chunks_vectored(dst),
        }
    }

    fn advance(&mut self, cnt: usize) {
        match &mut self.inner {
            Inner::Contiguous(bytes) => bytes.advance(cnt),
            Inner::Segmented(segmented) => segmented.advance(cnt),
        }
    }

    fn copy_to_bytes(&mut self, len: usize) -> Bytes {
        match &mut self.inner {
            Inner::Contiguous(bytes) => bytes.copy_to_bytes(len),
            Inner::Segmented(segmented) => segmented.copy_to_bytes(len),
        }
    }
}
