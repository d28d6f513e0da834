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
//! Configuration for the Bucketwise provider
//!
//! This crate turns configuration files and raw host option bags into the one
//! normalized [`ProviderConfig`] shape the provider core reads.
//!
//! # Features
//!
//! - Multi-format configuration files (TOML, YAML, JSON)
//! - Environment variable overrides with the `BUCKETWISE_` prefix
//! - Normalization of legacy flat and nested `s3Options` option bags
//! - Validation of bucket names, URLs and expiry settings
//!
//! # Example
//!
//! ```no_run
//! use bucketwise_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("bucketwise.toml").await?;
//!
//!     for (logical, physical) in &config.provider.buckets {
//!         println!("{logical} -> {physical}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod normalize;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ENV_PREFIX};
pub use normalize::{ProviderOptions, S3Options, S3Params, LEGACY_BUCKET_NAME};
pub use schema::*;
pub use validation::Validator;
