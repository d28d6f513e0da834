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

//! Multi-bucket storage provider
//!
//! Maps a host's file lifecycle (store, delete, sign, move, replace) onto an
//! S3-compatible object store spread over several buckets.
//!
//! # Routing
//!
//! A file's logical path may start with a selector, `bucket:<logical>:<folder>`.
//! Selectors naming a configured bucket route the file there; anything else
//! falls back to the default bucket. Keys are `[prefix/][folder/]hash+ext`,
//! or just `hash+ext` in pool mode.
//!
//! # URLs
//!
//! A bucket with a public domain is public and its files get stable URLs.
//! Every other bucket is private and its files need signed URLs.
//!
//! # Example
//!
//! ```rust,no_run
//! use bucketwise_config::ProviderConfig;
//! use bucketwise_provider::{BucketProvider, FileRecord};
//! use bucketwise_storage::{MockTransport, ObjectParams};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProviderConfig::default()
//!     .with_bucket("uploads", "real-uploads")
//!     .with_public_domain("uploads", "https://cdn.x");
//! let provider = BucketProvider::new(Arc::new(MockTransport::new()), config);
//!
//! let mut file = FileRecord::new("abc", ".png", "image/png")
//!     .with_path("bucket:uploads:a/b")
//!     .with_buffer(&b"..."[..]);
//! provider.store(&mut file, ObjectParams::default()).await?;
//! assert_eq!(file.url.as_deref(), Some("https://cdn.x/a/b/abc.png"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod keys;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod selector;

pub use error::{DeleteFailure, ProviderError, ProviderResult};
pub use file::{FileRecord, FormatRecord, ProviderMetadata};
pub use provider::{BucketProvider, MoveReport, StoreOptions};
pub use resolver::{resolve_bucket, ResolvedBucket};
pub use selector::{parse_bucket_selector, BucketSelector};
