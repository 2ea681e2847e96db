/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
use aws_sdk_s3::types::StorageClass;
use tracing::Instrument;

use super::{FetchError, PutOutput, PutRequest, Transport};
use crate::error;
use crate::job::Destination;
use crate::types::{AccessCondition, ObjectAttributes, ObjectProperties, ObjectType};

const STATUS_NOT_FOUND: u16 = 404;
const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
const STATUS_PRECONDITION_FAILED: u16 = 412;

/// [`Transport`] backed by an Amazon S3 client.
///
/// Attributes are fetched with `HeadObject` and objects are written with `PutObject`. Retries
/// are left to the client's retry configuration.
#[derive(Debug, Clone)]
pub struct S3Transport {
    client: aws_sdk_s3::Client,
}

impl S3Transport {
    /// Create a transport sending requests with `client`
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// The underlying S3 client
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl Transport for S3Transport {
    async fn fetch_attributes(
        &self,
        destination: &Destination,
        condition: &AccessCondition,
    ) -> Result<ObjectAttributes, FetchError> {
        let result = self
            .client
            .head_object()
            .bucket(destination.bucket())
            .key(destination.key())
            .set_if_match(condition.if_match())
            .set_if_none_match(condition.if_none_match())
            .send()
            .instrument(tracing::debug_span!(
                "fetch-attributes",
                bucket = destination.bucket(),
                key = destination.key()
            ))
            .await;

        match result {
            Ok(output) => Ok(attributes_from_head(destination.key(), &output)),
            Err(err) => Err(classify_head_error(err)),
        }
    }

    async fn put_object(&self, request: PutRequest) -> Result<PutOutput, error::Error> {
        let content_length =
            i64::try_from(request.content_length()).map_err(error::invalid_input)?;
        let span = tracing::debug_span!(
            "send-put-object",
            bucket = request.bucket.as_str(),
            key = request.key.as_str(),
            content_length
        );

        let PutRequest {
            bucket,
            key,
            body,
            access_condition,
            properties,
        } = request;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(content_length)
            .body(body.into_byte_stream())
            .set_if_match(access_condition.if_match())
            .set_if_none_match(access_condition.if_none_match())
            .set_content_type(properties.content_type)
            .set_content_encoding(properties.content_encoding)
            .set_content_language(properties.content_language)
            .set_content_disposition(properties.content_disposition)
            .set_cache_control(properties.cache_control)
            .set_storage_class(properties.storage_class.as_deref().map(StorageClass::from))
            .set_metadata(properties.metadata)
            .send()
            .instrument(span)
            .await?;

        tracing::trace!("put object complete");
        let mut put_output = PutOutput::default();
        if let Some(e_tag) = output.e_tag() {
            put_output = put_output.with_e_tag(e_tag);
        }
        if let Some(version_id) = output.version_id() {
            put_output = put_output.with_version_id(version_id);
        }
        Ok(put_output)
    }
}

fn classify_head_error(err: SdkError<HeadObjectError, HttpResponse>) -> FetchError {
    if let Some(service_err) = err.as_service_error() {
        if service_err.is_not_found() || service_err.code() == Some("NoSuchKey") {
            return FetchError::NotFound;
        }
        match service_err.code() {
            Some("MethodNotAllowed") => return FetchError::TypeMismatch,
            Some("PreconditionFailed") => return FetchError::PreconditionFailed,
            _ => {}
        }
    }
    // HEAD responses carry no error body, fall back to the status code
    match err.raw_response().map(|r| r.status().as_u16()) {
        Some(STATUS_NOT_FOUND) => FetchError::NotFound,
        Some(STATUS_METHOD_NOT_ALLOWED) => FetchError::TypeMismatch,
        Some(STATUS_PRECONDITION_FAILED) => FetchError::PreconditionFailed,
        _ => FetchError::Other(err.into()),
    }
}

fn attributes_from_head(key: &str, output: &HeadObjectOutput) -> ObjectAttributes {
    let content_length = output.content_length().and_then(|l| u64::try_from(l).ok());
    let object_type = match content_length {
        None => ObjectType::Unspecified,
        Some(0) if key.ends_with('/') => ObjectType::DirectoryMarker,
        Some(_) => ObjectType::Regular,
    };

    let mut properties = ObjectProperties::new();
    properties
        .set_content_type(output.content_type().map(str::to_owned))
        .set_content_encoding(output.content_encoding().map(str::to_owned))
        .set_content_language(output.content_language().map(str::to_owned))
        .set_content_disposition(output.content_disposition().map(str::to_owned))
        .set_cache_control(output.cache_control().map(str::to_owned))
        .set_storage_class(output.storage_class().map(|s| s.as_str().to_owned()))
        .set_metadata(output.metadata().cloned());

    let mut attributes = ObjectAttributes::existing(object_type).with_properties(properties);
    if let Some(e_tag) = output.e_tag() {
        attributes = attributes.with_e_tag(e_tag);
    }
    if let Some(len) = content_length {
        attributes = attributes.with_content_length(len);
    }
    attributes
}
