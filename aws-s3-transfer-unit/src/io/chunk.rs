/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;

use crate::io::ChunkBody;
use crate::runtime::buffer_pool::BufferLease;

/// A staged, in-memory slice of source data awaiting upload.
///
/// Chunks are produced outside of this crate and handed to a job with
/// [`TransferJob::stage_chunk`](crate::job::TransferJob::stage_chunk). A work unit consumes
/// each chunk exactly once; its buffers (and the [`BufferLease`] accounting for them, if any)
/// are released when the chunk is dropped, whatever the outcome of the upload.
#[derive(Debug)]
pub struct DataChunk {
    offset: u64,
    buffers: Vec<Bytes>,
    lease: Option<BufferLease>,
}

impl DataChunk {
    /// Create a chunk starting at `offset` backed by a single buffer
    pub fn new(offset: u64, data: impl Into<Bytes>) -> Self {
        Self::from_buffers(offset, [data.into()])
    }

    /// Create a chunk starting at `offset` backed by one or more buffers, in order
    pub fn from_buffers(offset: u64, buffers: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            offset,
            buffers: buffers.into_iter().collect(),
            lease: None,
        }
    }

    /// Attach the lease that accounts for this chunk's memory. It is released with the chunk.
    pub fn with_lease(mut self, lease: BufferLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Start offset of this chunk within the source
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of this chunk in bytes
    pub fn len(&self) -> u64 {
        self.buffers.iter().map(|b| b.len() as u64).sum()
    }

    /// Returns true if the chunk holds no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of backing buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// A byte view over this chunk's buffers
    pub fn body(&self) -> ChunkBody {
        ChunkBody::new(&self.buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::DataChunk;
    use crate::runtime::buffer_pool::BufferPool;
    use bytes::Bytes;

    #[test]
    fn test_chunk_length_spans_buffers() {
        let chunk = DataChunk::from_buffers(
            1024,
            [Bytes::from_static(b"abc"), Bytes::from_static(b"defg")],
        );
        assert_eq!(1024, chunk.offset());
        assert_eq!(7, chunk.len());
        assert_eq!(2, chunk.buffer_count());
        assert_eq!(7, chunk.body().len());
    }

    #[tokio::test]
    async fn test_dropping_chunk_releases_lease() {
        let pool = BufferPool::new(1);
        let lease = pool.acquire().await.unwrap();
        let chunk = DataChunk::new(0, Bytes::from_static(b"data")).with_lease(lease);
        assert_eq!(0, pool.available());
        drop(chunk);
        assert_eq!(1, pool.available());
        assert_eq!(1, pool.released());
    }
}
