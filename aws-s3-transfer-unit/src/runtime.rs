/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Memory accounting for staged chunks
pub mod buffer_pool;

/// Drives a work unit to a terminal state
pub(crate) mod driver;
