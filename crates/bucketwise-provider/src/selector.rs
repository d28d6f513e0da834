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
//! Bucket selectors embedded in logical paths.
//!
//! A selector has the exact shape `bucket:<logical>:<rest>`, where `<logical>`
//! is a non-empty token without `:` and `<rest>` is anything, including empty.

const SCHEME: &str = "bucket:";

/// A parsed `bucket:<logical>:<rest>` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSelector<'a> {
    /// Logical bucket name
    pub logical_bucket: &'a str,
    /// Everything after the second colon
    pub remainder: &'a str,
}

/// Parse a bucket selector. Total: anything that does not match yields `None`.
pub fn parse_bucket_selector(path: Option<&str>) -> Option<BucketSelector<'_>> {
    let rest = path?.strip_prefix(SCHEME)?;
    let (logical_bucket, remainder) = rest.split_once(':')?;
    if logical_bucket.is_empty() {
        return None;
    }
    Some(BucketSelector {
        logical_bucket,
        remainder,
    })
}

/// Format a selector string
pub fn format_selector(logical_bucket: &str, remainder: &str) -> String {
    format!("{SCHEME}{logical_bucket}:{remainder}")
}
