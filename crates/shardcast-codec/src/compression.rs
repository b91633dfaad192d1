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

//! LZ4 frame compression with an extension-based skip list
//!
//! Compression is applied before encryption: ciphertext is incompressible,
//! so the order matters. Files whose extension marks them as already
//! compressed (media containers, archives) skip the compressor entirely, and
//! data that does not beat [`MIN_COMPRESSION_RATIO`] is stored raw.

use crate::error::{CodecError, CodecResult};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{Read, Write};
use tracing::debug;

/// Minimum ratio (original / compressed) for compression to be worthwhile
pub const MIN_COMPRESSION_RATIO: f64 = 1.1;

/// Filename extensions for which compression is suppressed.
///
/// All of these formats are already entropy-coded; recompressing them wastes
/// CPU for a ratio near 1.0.
const SKIP_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "jpg", "jpeg", "png", "gif", "webp", "zip", "rar", "7z", "mp3", "flac",
    "aac", "apk", "iso",
];

/// Check whether compression should be skipped for the given filename
///
/// Matches the extension after the final `.` case-insensitively. Filenames
/// without an extension are never skipped.
///
/// # Examples
///
/// ```
/// use shardcast_codec::compression::is_compression_skipped;
///
/// assert!(is_compression_skipped("movie.MP4"));
/// assert!(is_compression_skipped("archive.tar.zip"));
/// assert!(!is_compression_skipped("notes.txt"));
/// assert!(!is_compression_skipped("Makefile"));
/// ```
pub fn is_compression_skipped(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            SKIP_EXTENSIONS.iter().any(|s| *s == ext)
        }
        _ => false,
    }
}

/// Compress data using the LZ4 frame format
///
/// # Errors
///
/// Returns `CodecError::Compression` if the frame encoder fails.
pub fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut encoder = FrameEncoder::new(Vec::with_capacity(data.len() / 2));
    encoder
        .write_all(data)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress an LZ4 frame
///
/// # Errors
///
/// Returns `CodecError::Corrupt` if the input is not a valid LZ4 frame.
pub fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut decoder = FrameDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Corrupt(format!("lz4 decompression failed: {}", e)))?;
    Ok(out)
}

/// Compress only if the result beats [`MIN_COMPRESSION_RATIO`]
///
/// Returns `Some(compressed)` when compression is worthwhile, `None` when the
/// data should be stored raw.
pub fn compress_if_worthwhile(data: &[u8]) -> CodecResult<Option<Vec<u8>>> {
    if data.is_empty() {
        return Ok(None);
    }

    let compressed = compress(data)?;
    let ratio = data.len() as f64 / compressed.len() as f64;
    if ratio > MIN_COMPRESSION_RATIO {
        debug!(
            original = data.len(),
            compressed = compressed.len(),
            ratio,
            "compression accepted"
        );
        Ok(Some(compressed))
    } else {
        debug!(original = data.len(), ratio, "compression rejected, storing raw");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_roundtrip() {
        let original = b"The quick brown fox jumps over the lazy dog. ".repeat(50);

        let compressed = compress(&original).unwrap();
        assert!(compressed.len() < original.len());

        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_compress_empty() {
        assert!(compress(b"").unwrap().is_empty());
        assert!(decompress(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let err = decompress(b"definitely not an lz4 frame").unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_skip_list_case_insensitive() {
        assert!(is_compression_skipped("video.mp4"));
        assert!(is_compression_skipped("video.MP4"));
        assert!(is_compression_skipped("photo.JPeG"));
        assert!(is_compression_skipped("music.flac"));
        assert!(is_compression_skipped("backup.7z"));
    }

    #[test]
    fn test_skip_list_misses() {
        assert!(!is_compression_skipped("document.txt"));
        assert!(!is_compression_skipped("data.bin"));
        assert!(!is_compression_skipped("README"));
        assert!(!is_compression_skipped(".mp4")); // hidden file, no stem
        assert!(!is_compression_skipped("mp4"));
    }

    #[test]
    fn test_compound_extension_uses_final_suffix() {
        assert!(is_compression_skipped("bundle.tar.zip"));
        assert!(!is_compression_skipped("movie.mp4.txt"));
    }

    #[test]
    fn test_worthwhile_accepts_repetitive_data() {
        let data = b"abcdefghijklmnopq".repeat(1000);
        let compressed = compress_if_worthwhile(&data).unwrap();
        assert!(compressed.is_some());
        assert_eq!(decompress(&compressed.unwrap()).unwrap(), data);
    }

    #[test]
    fn test_worthwhile_rejects_incompressible_data() {
        // A pseudo-random byte walk that LZ4 cannot shrink by 1.1x.
        let mut state = 0x12345678u32;
        let data: Vec<u8> = (0..4096)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 24) as u8
            })
            .collect();
        assert!(compress_if_worthwhile(&data).unwrap().is_none());
    }

    #[test]
    fn test_worthwhile_empty_is_raw() {
        assert!(compress_if_worthwhile(b"").unwrap().is_none());
    }
}
