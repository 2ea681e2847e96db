/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

use aws_sdk_s3::error::ProvideErrorMetadata;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of transfer errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation input validation issues
    InputInvalid,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (e.g. task failure, poisoned mutex, etc)
    RuntimeError,

    /// The payload is larger than the maximum destination object size
    SizeLimitExceeded,

    /// The destination exists but is not the kind of object this writer produces
    TypeMismatch,

    /// Resource not found (e.g. bucket or key)
    NotFound,

    /// The destination no longer satisfies the job's access condition (e.g. a stale entity tag)
    PreconditionFailed,

    /// A request sent through the transport failed
    TransportFailed,

    /// The job controller refused to overwrite an existing destination
    OverwriteDeclined,

    /// The work unit observed a cancellation signal
    OperationCancelled,
}

impl Error {
    /// Creates a new transfer [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
            ErrorKind::SizeLimitExceeded => write!(f, "payload exceeds maximum object size"),
            ErrorKind::TypeMismatch => write!(f, "destination object type mismatch"),
            ErrorKind::NotFound => write!(f, "resource not found"),
            ErrorKind::PreconditionFailed => write!(f, "destination precondition failed"),
            ErrorKind::TransportFailed => write!(f, "transport request failed"),
            ErrorKind::OverwriteDeclined => write!(f, "overwrite of existing object declined"),
            ErrorKind::OperationCancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for Error {
    fn from(value: aws_smithy_types::error::operation::BuildError) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn size_limit_exceeded(length: u64, limit: u64) -> Error {
    Error::new(
        ErrorKind::SizeLimitExceeded,
        format!("payload of {length} bytes exceeds the maximum object size of {limit} bytes"),
    )
}

pub(crate) fn type_mismatch<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::TypeMismatch, err)
}

pub(crate) fn from_kind<E>(kind: ErrorKind) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    |err| Error::new(kind, err)
}

impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    R: Send + Sync + fmt::Debug + 'static,
{
    fn from(value: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        let kind = match value.code() {
            Some("NotFound" | "NoSuchKey" | "NoSuchBucket") => ErrorKind::NotFound,
            Some("PreconditionFailed") => ErrorKind::PreconditionFailed,
            _ => ErrorKind::TransportFailed,
        };

        Error::new(kind, value)
    }
}

static CANCELLATION_ERROR: &str = "work unit cancelled while a request was in flight";

pub(crate) fn operation_cancelled() -> Error {
    Error::new(ErrorKind::OperationCancelled, CANCELLATION_ERROR)
}
