/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;

/// The kind of object found at (or written to) a destination key.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ObjectType {
    /// A regular object holding data. This is what a single-request writer produces.
    #[default]
    Regular,

    /// A zero byte "folder" object. S3 console folders are 0-byte objects whose key
    /// ends with '/'.
    DirectoryMarker,

    /// The transport could not classify the object.
    Unspecified,
}

impl ObjectType {
    /// Returns true if this is a known object type other than `expected`.
    ///
    /// `Unspecified` is never "foreign": it is rejected separately once the overwrite
    /// has been confirmed.
    pub(crate) fn is_foreign_to(&self, expected: ObjectType) -> bool {
        !matches!(self, ObjectType::Unspecified) && *self != expected
    }
}

/// Precondition attached to requests against a destination.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessCondition {
    /// No precondition; the request always applies.
    #[default]
    None,

    /// The request only applies if the destination's entity tag matches.
    IfMatch(String),

    /// The request only applies if the destination's entity tag does not match
    /// (`*` matches any existing object).
    IfNoneMatch(String),
}

impl AccessCondition {
    pub(crate) fn if_match(&self) -> Option<String> {
        match self {
            AccessCondition::IfMatch(etag) => Some(etag.clone()),
            _ => None,
        }
    }

    pub(crate) fn if_none_match(&self) -> Option<String> {
        match self {
            AccessCondition::IfNoneMatch(etag) => Some(etag.clone()),
            _ => None,
        }
    }
}

/// Properties persisted alongside an object's data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectProperties {
    pub(crate) content_type: Option<String>,
    pub(crate) content_encoding: Option<String>,
    pub(crate) content_language: Option<String>,
    pub(crate) content_disposition: Option<String>,
    pub(crate) cache_control: Option<String>,
    pub(crate) storage_class: Option<String>,
    pub(crate) metadata: Option<HashMap<String, String>>,
}

impl ObjectProperties {
    /// Create a new, empty set of properties
    pub fn new() -> Self {
        Self::default()
    }

    /// A standard MIME type describing the format of the object data.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Set the MIME type describing the format of the object data.
    pub fn set_content_type(&mut self, input: Option<String>) -> &mut Self {
        self.content_type = input;
        self
    }

    /// The content encodings applied to the object.
    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    /// Set the content encodings applied to the object.
    pub fn set_content_encoding(&mut self, input: Option<String>) -> &mut Self {
        self.content_encoding = input;
        self
    }

    /// The language the content is in.
    pub fn content_language(&self) -> Option<&str> {
        self.content_language.as_deref()
    }

    /// Set the language the content is in.
    pub fn set_content_language(&mut self, input: Option<String>) -> &mut Self {
        self.content_language = input;
        self
    }

    /// Presentational information for the object.
    pub fn content_disposition(&self) -> Option<&str> {
        self.content_disposition.as_deref()
    }

    /// Set presentational information for the object.
    pub fn set_content_disposition(&mut self, input: Option<String>) -> &mut Self {
        self.content_disposition = input;
        self
    }

    /// Caching behavior along the request/reply chain.
    pub fn cache_control(&self) -> Option<&str> {
        self.cache_control.as_deref()
    }

    /// Set caching behavior along the request/reply chain.
    pub fn set_cache_control(&mut self, input: Option<String>) -> &mut Self {
        self.cache_control = input;
        self
    }

    /// The storage class to store the object in.
    pub fn storage_class(&self) -> Option<&str> {
        self.storage_class.as_deref()
    }

    /// Set the storage class to store the object in.
    pub fn set_storage_class(&mut self, input: Option<String>) -> &mut Self {
        self.storage_class = input;
        self
    }

    /// User-defined metadata.
    pub fn metadata(&self) -> Option<&HashMap<String, String>> {
        self.metadata.as_ref()
    }

    /// Add a single user-defined metadata entry.
    pub fn insert_metadata(&mut self, k: impl Into<String>, v: impl Into<String>) -> &mut Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(k.into(), v.into());
        self
    }

    /// Replace all user-defined metadata.
    pub fn set_metadata(&mut self, input: Option<HashMap<String, String>>) -> &mut Self {
        self.metadata = input;
        self
    }
}

/// Attributes of a destination object as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub(crate) exists: bool,
    pub(crate) object_type: ObjectType,
    pub(crate) e_tag: Option<String>,
    pub(crate) content_length: Option<u64>,
    pub(crate) properties: ObjectProperties,
}

impl ObjectAttributes {
    /// Attributes describing an existing object of the given type.
    pub fn existing(object_type: ObjectType) -> Self {
        Self {
            exists: true,
            object_type,
            ..Default::default()
        }
    }

    /// Attributes describing a destination with no object at it yet.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Set the entity tag of the existing object.
    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }

    /// Set the length of the existing object.
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// Set the properties of the existing object.
    pub fn with_properties(mut self, properties: ObjectProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Whether an object exists at the destination.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The type of the existing object (meaningless when [`exists`](Self::exists) is false).
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// The entity tag of the existing object.
    pub fn e_tag(&self) -> Option<&str> {
        self.e_tag.as_deref()
    }

    /// The length of the existing object in bytes.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// The properties stored with the existing object.
    pub fn properties(&self) -> &ObjectProperties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessCondition, ObjectProperties, ObjectType};

    #[test]
    fn test_foreign_object_types() {
        assert!(!ObjectType::Regular.is_foreign_to(ObjectType::Regular));
        assert!(ObjectType::DirectoryMarker.is_foreign_to(ObjectType::Regular));
        assert!(!ObjectType::Unspecified.is_foreign_to(ObjectType::Regular));
    }

    #[test]
    fn test_access_condition_headers() {
        let cond = AccessCondition::IfMatch("\"abc\"".to_owned());
        assert_eq!(Some("\"abc\"".to_owned()), cond.if_match());
        assert_eq!(None, cond.if_none_match());
        assert_eq!(None, AccessCondition::None.if_match());
    }

    #[test]
    fn test_insert_metadata() {
        let mut props = ObjectProperties::new();
        props.insert_metadata("a", "1").insert_metadata("b", "2");
        let metadata = props.metadata().unwrap();
        assert_eq!(2, metadata.len());
        assert_eq!("1", metadata["a"]);
    }
}
