/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod chunk;
mod chunk_body;
mod segmented_body;

// re-exports
pub use self::chunk::DataChunk;
pub use self::chunk_body::ChunkBody;
