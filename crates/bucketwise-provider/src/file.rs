// Bucketwise - Multi-bucket object storage provider
// Copyright (C) 2025 Bucketwise Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//! File records exchanged with the host.
//!
//! The host owns these records. The provider only fills in `url` and
//! `provider_metadata` and reads them back on later operations.

use bucketwise_storage::{ContentStream, ObjectBody};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Where a stored object lives, as persisted by the host
///
/// Serialized as `{"bucket", "key", "isPrivate", ...}`; unknown fields added
/// by the host are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Logical bucket name
    #[serde(default)]
    pub bucket: String,

    /// Object key
    #[serde(default)]
    pub key: String,

    /// Frozen at store/move time from the bucket's public domain setting
    #[serde(default)]
    pub is_private: bool,

    /// Host-added fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProviderMetadata {
    /// Metadata for an object at `bucket`/`key`
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, is_private: bool) -> Self {
        ProviderMetadata {
            bucket: bucket.into(),
            key: key.into(),
            is_private,
            extra: Map::new(),
        }
    }

    /// `(bucket, key)` when both are present
    pub fn location(&self) -> Option<(&str, &str)> {
        if self.bucket.is_empty() || self.key.is_empty() {
            None
        } else {
            Some((self.bucket.as_str(), self.key.as_str()))
        }
    }

    /// Point at a new location, keeping host-added fields
    pub(crate) fn relocate(&mut self, bucket: &str, key: &str, is_private: bool) {
        self.bucket = bucket.to_string();
        self.key = key.to_string();
        self.is_private = is_private;
    }
}

/// One stored asset and its derived format variants
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Content hash; with `ext` it forms the physical file name
    pub hash: String,

    /// Extension including the dot, e.g. `.png`
    pub ext: String,

    /// Logical path, optionally starting with a `bucket:<name>:` selector
    #[serde(default)]
    pub path: Option<String>,

    /// MIME type sent as the object's content type
    pub mime: String,

    /// Declared size in bytes
    #[serde(default)]
    pub size: Option<u64>,

    /// Public or signed URL
    #[serde(default)]
    pub url: Option<String>,

    /// Set by store and move
    #[serde(default)]
    pub provider_metadata: Option<ProviderMetadata>,

    /// Variants keyed by format label (thumbnail, small, ...)
    #[serde(default)]
    pub formats: BTreeMap<String, FormatRecord>,

    /// Upload content, consumed by store
    #[serde(skip)]
    pub content: Option<ObjectBody>,
}

impl FileRecord {
    /// A record with no content, path or metadata yet
    pub fn new(hash: impl Into<String>, ext: impl Into<String>, mime: impl Into<String>) -> Self {
        FileRecord {
            hash: hash.into(),
            ext: ext.into(),
            mime: mime.into(),
            ..Default::default()
        }
    }

    /// Set the logical path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach in-memory content
    pub fn with_buffer(mut self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if self.size.is_none() {
            self.size = Some(data.len() as u64);
        }
        self.content = Some(ObjectBody::Bytes(data));
        self
    }

    /// Attach streamed content
    pub fn with_stream(mut self, reader: ContentStream, length: Option<u64>) -> Self {
        if self.size.is_none() {
            self.size = length;
        }
        self.content = Some(ObjectBody::stream(reader, length));
        self
    }

    /// Attach a format variant
    pub fn with_format(mut self, label: impl Into<String>, format: FormatRecord) -> Self {
        self.formats.insert(label.into(), format);
        self
    }

    /// Physical file name: `hash + ext`
    pub fn file_name(&self) -> String {
        format!("{}{}", self.hash, self.ext)
    }

    /// Declared size, falling back to the content's length
    pub fn effective_size(&self) -> Option<u64> {
        self.size
            .or_else(|| self.content.as_ref().and_then(ObjectBody::len_hint))
    }
}

/// A size variant of a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatRecord {
    /// Content hash
    pub hash: String,

    /// Extension including the dot
    pub ext: String,

    /// MIME type
    pub mime: String,

    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,

    /// URL recorded when the variant was stored
    #[serde(default)]
    pub url: Option<String>,

    /// Location of the variant's object
    #[serde(default)]
    pub provider_metadata: Option<ProviderMetadata>,
}

/// Hosts store variants as files, then file them under a format label.
impl From<FileRecord> for FormatRecord {
    fn from(file: FileRecord) -> Self {
        FormatRecord {
            hash: file.hash,
            ext: file.ext,
            mime: file.mime,
            size: file.size,
            url: file.url,
            provider_metadata: file.provider_metadata,
        }
    }
}
