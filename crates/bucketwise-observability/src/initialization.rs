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
//! Subscriber construction and global installation.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Initialize tracing with the given format and optional level.
///
/// `level` falls back to `RUST_LOG`, then `info`.
///
/// ```ignore
/// use bucketwise_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, Some("bucketwise_provider=debug"))?;
/// tracing::info!("provider ready");
/// ```
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Install a subscriber built from `config` as the global default.
///
/// Fails with [`LogError::AlreadyInitialized`] when a global subscriber is
/// already set.
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    build_subscriber(&config)?
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

/// Build a subscriber without installing it.
///
/// Useful with [`tracing::subscriber::with_default`] in tests.
pub fn build_subscriber(config: &LogConfig) -> Result<impl Subscriber + Send + Sync + 'static, LogError> {
    let filter = build_env_filter(config)?;
    Ok(Registry::default().with(filter).with(build_fmt_layer(config)))
}

fn build_fmt_layer(config: &LogConfig) -> BoxedLayer {
    let base = fmt::layer()
        .with_writer(get_writer(config.output))
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids);

    match config.format {
        LogFormat::Pretty => {
            let layer = base
                .with_ansi(config.use_color)
                .with_span_events(FmtSpan::ACTIVE)
                .pretty();
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Compact => {
            let layer = base
                .with_ansi(config.use_color)
                .with_span_events(FmtSpan::CLOSE)
                .compact();
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Json => {
            let layer = base.with_ansi(false).json().with_span_events(FmtSpan::CLOSE);
            if config.use_timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
    }
}

fn get_writer(output: LogOutput) -> fn() -> Box<dyn io::Write + Send> {
    match output {
        LogOutput::Stderr => || Box::new(io::stderr()),
        LogOutput::Stdout => || Box::new(io::stdout()),
    }
}

fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let directive = config.effective_level();

    EnvFilter::try_new(&directive).map_err(|e| LogError::InvalidFilter {
        directive: directive.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("debug")).is_ok());
        assert!(build_env_filter(&LogConfig::new().with_level("bucketwise_provider=trace")).is_ok());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = build_env_filter(&LogConfig::new().with_level("bucketwise=loudest"));
        assert!(matches!(result, Err(LogError::InvalidFilter { .. })));
    }

    #[test]
    fn test_every_format_builds() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let config = LogConfig::new()
                .with_format(format)
                .with_timestamps(false)
                .with_thread_ids(true);
            assert!(build_subscriber(&config).is_ok());
        }
    }
}
