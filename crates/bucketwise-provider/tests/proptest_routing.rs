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
//! Property-based tests for routing
//!
//! - Selector parsing is exact for well-formed selectors and total otherwise
//! - Pool-mode keys depend only on hash and extension
//! - Bucket resolution is deterministic and always lands on a configured bucket
//! - Privacy is exactly "no public domain"
#![allow(clippy::unwrap_used)]

use bucketwise_config::ProviderConfig;
use bucketwise_provider::keys::derive_key;
use bucketwise_provider::policy::is_private;
use bucketwise_provider::{parse_bucket_selector, resolve_bucket, BucketProvider, FileRecord};
use bucketwise_storage::{MockTransport, ObjectParams};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_logical_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,12}"
}

fn arb_path() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/:._ -]{0,40}"
}

fn arb_config() -> impl Strategy<Value = ProviderConfig> {
    (
        prop::collection::btree_set(arb_logical_name(), 0..5),
        prop::option::of(arb_logical_name()),
        any::<u8>(),
    )
        .prop_map(|(names, default, public_mask)| {
            let mut config = ProviderConfig::default();
            for (i, name) in names.iter().enumerate() {
                config = config.with_bucket(name.clone(), format!("phys-{name}"));
                if public_mask & (1 << i) != 0 {
                    config = config.with_public_domain(name.clone(), format!("https://{name}.cdn"));
                }
            }
            config.default_bucket = default;
            config
        })
}

#[test]
fn proptest_selector_parses_exactly() {
    proptest!(|(bucket in arb_logical_name(), rest in ".*")| {
        let raw = format!("bucket:{bucket}:{rest}");
        let selector = parse_bucket_selector(Some(&raw)).unwrap();
        prop_assert_eq!(selector.logical_bucket, bucket.as_str());
        prop_assert_eq!(selector.remainder, rest.as_str());
    });
}

#[test]
fn proptest_non_selectors_parse_to_none() {
    proptest!(|(path in ".*")| {
        prop_assume!(!path.starts_with("bucket:"));
        prop_assert!(parse_bucket_selector(Some(&path)).is_none());
    });
}

#[test]
fn proptest_pool_keys_ignore_paths() {
    proptest!(|(hash in "[a-f0-9]{6,32}", path_a in arb_path(), path_b in arb_path())| {
        let config = ProviderConfig::default().with_pool(true);
        let a = FileRecord::new(hash.clone(), ".jpg", "image/jpeg").with_path(path_a);
        let b = FileRecord::new(hash.clone(), ".jpg", "image/jpeg").with_path(path_b);
        prop_assert_eq!(derive_key(&a, &config, None), derive_key(&b, &config, None));
        prop_assert_eq!(derive_key(&a, &config, None), format!("{hash}.jpg"));
    });
}

#[test]
fn proptest_resolution_is_deterministic() {
    proptest!(|(config in arb_config(), path in prop::option::of(arb_path()))| {
        let first = resolve_bucket(path.as_deref(), &config);
        let second = resolve_bucket(path.as_deref(), &config);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(config.physical_bucket(&a.logical), Some(a.physical.as_str()));
            }
            (Err(a), Err(b)) => {
                prop_assert!(config.buckets.is_empty());
                prop_assert!(a.is_configuration() && b.is_configuration());
            }
            _ => prop_assert!(false, "resolution changed between calls"),
        }
    });
}

#[test]
fn proptest_privacy_is_absence_of_public_domain() {
    proptest!(|(config in arb_config(), probe in arb_logical_name())| {
        prop_assert_eq!(is_private(&probe, &config), !config.public_domains.contains_key(&probe));
    });
}

/// Stored metadata privacy matches the resolved bucket
#[test]
fn proptest_store_freezes_privacy() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(&(arb_config(), arb_path()), |(config, path)| {
            prop_assume!(!config.buckets.is_empty());
            tokio::runtime::Runtime::new().unwrap().block_on(async {
                let provider = BucketProvider::new(Arc::new(MockTransport::new()), config.clone());
                let mut file = FileRecord::new("abc", ".png", "image/png")
                    .with_path(path)
                    .with_buffer(&b"png"[..]);

                provider.store(&mut file, ObjectParams::default()).await.unwrap();

                let meta = file.provider_metadata.unwrap();
                prop_assert_eq!(meta.is_private, is_private(&meta.bucket, &config));
                prop_assert!(config.is_configured(&meta.bucket));
                Ok(())
            })
        })
        .unwrap();
}
