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
//! Object key derivation.
//!
//! Keys have the shape `[prefix/][folder/]hash+ext`. The file name part is
//! content-addressed and never changes when a file moves between folders.

use crate::file::FileRecord;
use crate::selector::parse_bucket_selector;
use bucketwise_config::ProviderConfig;

/// Derive the object key for `file`.
///
/// In pool mode the key is the file name alone. Otherwise the folder comes
/// from `folder_override` when given, else from the file's path with any
/// bucket selector stripped.
pub fn derive_key(file: &FileRecord, config: &ProviderConfig, folder_override: Option<&str>) -> String {
    let name = file.file_name();
    if config.pool {
        return object_key(None, &name, config);
    }

    let folder = match folder_override {
        Some(folder) => Some(folder),
        None => file.path.as_deref().map(|path| {
            parse_bucket_selector(Some(path))
                .map(|selector| selector.remainder)
                .unwrap_or(path)
        }),
    };
    object_key(folder, &name, config)
}

/// Join the key prefix, a folder and a file name.
///
/// Empty folders (after trimming slashes) are skipped.
pub fn object_key(folder: Option<&str>, file_name: &str, config: &ProviderConfig) -> String {
    let mut key = String::new();
    if let Some(prefix) = config.normalized_key_prefix() {
        key.push_str(prefix);
        key.push('/');
    }
    if let Some(folder) = folder.map(trim_folder).filter(|f| !f.is_empty()) {
        key.push_str(folder);
        key.push('/');
    }
    key.push_str(file_name);
    key
}

/// Last path segment of a key
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Folder of a key, with the configured key prefix removed.
///
/// `None` when the object sits at the namespace root.
pub fn folder_of<'a>(key: &'a str, config: &ProviderConfig) -> Option<&'a str> {
    let unprefixed = match config.normalized_key_prefix() {
        Some(prefix) => key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key),
        None => key,
    };
    unprefixed
        .rsplit_once('/')
        .map(|(folder, _)| trim_folder(folder))
        .filter(|folder| !folder.is_empty())
}

pub(crate) fn trim_folder(folder: &str) -> &str {
    folder.trim_matches('/')
}
