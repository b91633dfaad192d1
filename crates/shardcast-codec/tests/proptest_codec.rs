// Shardcast - Peer-to-Peer File Distribution
// Copyright (C) 2025 Shardcast Contributors
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
#![allow(clippy::unwrap_used)]
//! Property-based tests for the chunk codec
//!
//! Verifies with random data that the two transforms invert cleanly and
//! that decompression is deterministic regardless of input shape.

use proptest::prelude::*;
use shardcast_codec::{compression, encryption};

/// Generate random binary data for testing
fn arb_binary_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..8192)
}

/// Generate text-like data (compressible)
fn arb_text_data() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::char::range('a', 'z').prop_map(|c| c as u8), 100..8192)
}

#[test]
fn proptest_compression_roundtrip() {
    proptest!(|(data in arb_binary_data())| {
        let compressed = compression::compress(&data).unwrap();
        let decompressed = compression::decompress(&compressed).unwrap();
        prop_assert_eq!(data, decompressed);
    });
}

#[test]
fn proptest_compression_determinism() {
    proptest!(|(data in arb_text_data())| {
        let first = compression::compress(&data).unwrap();
        let second = compression::compress(&data).unwrap();
        prop_assert_eq!(first, second);
    });
}

#[test]
fn proptest_worthwhile_result_always_decompresses() {
    proptest!(|(data in arb_text_data())| {
        if let Some(compressed) = compression::compress_if_worthwhile(&data).unwrap() {
            prop_assert!(compressed.len() < data.len());
            prop_assert_eq!(compression::decompress(&compressed).unwrap(), data);
        }
    });
}

// scrypt at N=32768 costs ~100ms per call, so keep the encryption case
// count small.
#[test]
fn proptest_encryption_roundtrip() {
    let mut config = ProptestConfig::default();
    config.cases = 8;
    proptest!(config, |(data in prop::collection::vec(any::<u8>(), 0..512))| {
        let envelope = encryption::encrypt("pw", &data).unwrap();
        prop_assert_eq!(encryption::decrypt("pw", &envelope).unwrap(), data);
    });
}
