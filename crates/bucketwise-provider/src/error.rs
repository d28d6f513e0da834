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
use bucketwise_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// One object that could not be deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// Logical bucket recorded in the file's metadata
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Why the delete failed
    pub reason: String,
}

impl fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.bucket, self.key, self.reason)
    }
}

/// Errors surfaced by provider operations
///
/// None of these are retried by the provider; retry policy belongs to the
/// transport.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No usable bucket, missing endpoint, or an unconfigured bucket name
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input
    #[error("invalid input: {0}")]
    Input(String),

    /// The file record is missing state the operation needs
    #[error("invalid file state: {0}")]
    State(String),

    /// A move destination already holds an object, or two entries of the same
    /// move would land on it; nothing was changed
    #[error("destination already taken: {bucket}/{key}")]
    Conflict { bucket: String, key: String },

    /// One or more deletes failed; every delete was still attempted
    #[error("{} of the deletes failed: {}", .failures.len(), join_failures(.failures))]
    AggregateDelete { failures: Vec<DeleteFailure> },

    /// A move copy failed; objects already copied remain at the destination
    #[error("copy of {bucket}/{key} failed after {} copies: {source}", .copied.len())]
    CopyFailed {
        bucket: String,
        key: String,
        /// Destination keys already written before the failure
        copied: Vec<String>,
        #[source]
        source: StorageError,
    },

    /// Any other transport failure
    #[error(transparent)]
    Transport(#[from] StorageError),
}

impl ProviderError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        ProviderError::Configuration(msg.into())
    }

    pub fn input<S: Into<String>>(msg: S) -> Self {
        ProviderError::Input(msg.into())
    }

    pub fn state<S: Into<String>>(msg: S) -> Self {
        ProviderError::State(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::Configuration(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(self, ProviderError::Input(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, ProviderError::State(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ProviderError::Conflict { .. })
    }
}

fn join_failures(failures: &[DeleteFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_message_lists_every_failure() {
        let err = ProviderError::AggregateDelete {
            failures: vec![
                DeleteFailure {
                    bucket: "uploads".into(),
                    key: "a.png".into(),
                    reason: "denied".into(),
                },
                DeleteFailure {
                    bucket: "uploads".into(),
                    key: "thumb_a.png".into(),
                    reason: "timeout".into(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("2 of the deletes failed"));
        assert!(message.contains("uploads/thumb_a.png: timeout"));
    }

    #[test]
    fn test_copy_failure_keeps_source() {
        let err = ProviderError::CopyFailed {
            bucket: "uploads".into(),
            key: "b.png".into(),
            copied: vec!["dest/a.png".into()],
            source: StorageError::backend("boom"),
        };
        assert!(err.to_string().contains("after 1 copies"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_predicates() {
        assert!(ProviderError::configuration("x").is_configuration());
        assert!(ProviderError::input("x").is_input());
        assert!(ProviderError::state("x").is_state());
        assert!(ProviderError::Conflict {
            bucket: "b".into(),
            key: "k".into()
        }
        .is_conflict());
    }
}
