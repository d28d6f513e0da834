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
//! Bucketwise Observability
//!
//! Structured logging setup for hosts embedding the Bucketwise provider.
//! The provider crates only emit `tracing` events; installing a subscriber is
//! the host's call, and this crate is the supported way to do it.
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, compact and JSON
//! - **Environment-based Filtering**: `EnvFilter` directives, falling back to `RUST_LOG`
//! - **Config-driven**: [`LogConfig::from_settings`] reads the `observability` section
//!
//! # Example
//!
//! ```ignore
//! use bucketwise_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Json, Some("info"))?;
//! tracing::info!("Application started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{build_subscriber, init_tracing, init_tracing_with_config};
