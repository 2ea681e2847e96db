/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use crate::error;
use crate::io::ChunkBody;
use crate::job::Destination;
use crate::types::{AccessCondition, ObjectAttributes, ObjectProperties};

/// Amazon S3 transport
pub mod s3;

/// A [`Transport`] shared between the client and its work units.
pub type SharedTransport = Arc<dyn Transport>;

/// The requests a work unit sends to the destination store.
///
/// Implementations own retries and backoff. Work units never retry a failed request.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Fetch the attributes of the object currently at `destination`.
    ///
    /// `condition` is evaluated by the store. A destination that does not exist yields
    /// [`FetchError::NotFound`].
    async fn fetch_attributes(
        &self,
        destination: &Destination,
        condition: &AccessCondition,
    ) -> Result<ObjectAttributes, FetchError>;

    /// Upload the whole object in a single request.
    async fn put_object(&self, request: PutRequest) -> Result<PutOutput, error::Error>;
}

/// Why an attribute fetch did not return attributes.
#[derive(Debug)]
#[non_exhaustive]
pub enum FetchError {
    /// Nothing exists at the destination
    NotFound,

    /// Something exists at the destination that is not an object this crate can replace
    /// (e.g. a delete marker)
    TypeMismatch,

    /// The destination did not satisfy the access condition
    PreconditionFailed,

    /// Any other failure, propagated as-is
    Other(error::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound => write!(f, "destination not found"),
            FetchError::TypeMismatch => write!(f, "destination holds an incompatible entry"),
            FetchError::PreconditionFailed => write!(f, "destination precondition failed"),
            FetchError::Other(err) => write!(f, "fetching destination attributes failed: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Other(err) => Some(err),
            _ => None,
        }
    }
}

impl From<error::Error> for FetchError {
    fn from(value: error::Error) -> Self {
        FetchError::Other(value)
    }
}

/// A single-request upload of a whole object.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) body: ChunkBody,
    pub(crate) access_condition: AccessCondition,
    pub(crate) properties: ObjectProperties,
}

impl PutRequest {
    /// The bucket name containing the object
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key of the object to write
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The object data
    pub fn body(&self) -> &ChunkBody {
        &self.body
    }

    /// Consume the request, returning its body
    pub fn into_body(self) -> ChunkBody {
        self.body
    }

    /// Length of the object data in bytes
    pub fn content_length(&self) -> u64 {
        self.body.len()
    }

    /// Condition the store evaluates before writing
    pub fn access_condition(&self) -> &AccessCondition {
        &self.access_condition
    }

    /// Properties persisted with the object
    pub fn properties(&self) -> &ObjectProperties {
        &self.properties
    }
}

/// Result of a successful [`Transport::put_object`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOutput {
    e_tag: Option<String>,
    version_id: Option<String>,
}

impl PutOutput {
    /// Set the entity tag of the written object
    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }

    /// Set the version of the written object
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Entity tag of the written object
    pub fn e_tag(&self) -> Option<&str> {
        self.e_tag.as_deref()
    }

    /// Version of the written object, if the bucket is versioned
    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }
}
