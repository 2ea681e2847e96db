/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use aws_types::SdkConfig;

use crate::config::Builder;
use crate::transport::s3::S3Transport;
use crate::Config;

/// Load transfer unit [`Config`] from the environment.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
    sdk_config: Option<SdkConfig>,
}

impl ConfigLoader {
    /// Largest payload that is sent as a single request.
    ///
    /// S3 accepts at most 5 GiB in one `PutObject`, larger values are rounded down.
    /// Default is 8 MiB.
    pub fn single_request_threshold(mut self, threshold: u64) -> Self {
        self.builder = self.builder.single_request_threshold(threshold);
        self
    }

    /// Largest destination object a job may produce.
    ///
    /// Default is 5 TiB.
    pub fn max_object_size(mut self, limit: u64) -> Self {
        self.builder = self.builder.max_object_size(limit);
        self
    }

    /// Maximum number of chunks staged in memory at once.
    ///
    /// Default is 128.
    pub fn max_staged_chunks(mut self, max: usize) -> Self {
        self.builder = self.builder.max_staged_chunks(max);
        self
    }

    /// Maximum number of in-flight requests across all work units.
    ///
    /// Default is 64.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.builder = self.builder.concurrency(concurrency);
        self
    }

    /// Use an already loaded AWS [`SdkConfig`] instead of resolving one from the environment.
    pub fn sdk_config(mut self, sdk_config: SdkConfig) -> Self {
        self.sdk_config = Some(sdk_config);
        self
    }

    /// Load the default configuration
    ///
    /// If fields have been overridden during builder construction, the override values will be
    /// used. Otherwise, the default values for each field will be provided.
    pub async fn load(self) -> Config {
        let shared_config = match self.sdk_config {
            Some(sdk_config) => sdk_config,
            None => aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await,
        };
        let s3_client = aws_sdk_s3::Client::new(&shared_config);
        self.builder
            .transport(Arc::new(S3Transport::new(s3_client)))
            .build()
    }
}
