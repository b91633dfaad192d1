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

//! Chunk codec for Shardcast
//!
//! This crate provides the two transforms applied to every chunk on its way
//! into the content store, and their inverses on the way out:
//!
//! - **Compression**: LZ4 frame format, suppressed for filename extensions
//!   that are already compressed (media containers, archives) and for data
//!   that does not reach the minimum ratio.
//! - **Encryption**: ChaCha20-Poly1305 AEAD with a per-chunk scrypt-derived
//!   key. Every chunk carries its own random salt and nonce, so a single
//!   password can safely protect any number of chunks.
//!
//! # Envelope format
//!
//! ```text
//! [salt:16][nonce:12][ciphertext:N][tag:16]
//! ```
//!
//! # Examples
//!
//! ```
//! use shardcast_codec::{compression, encryption};
//!
//! # fn main() -> shardcast_codec::CodecResult<()> {
//! let plaintext = b"chunk payload".repeat(100);
//!
//! let compressed = compression::compress(&plaintext)?;
//! let envelope = encryption::encrypt("password", &compressed)?;
//!
//! let decrypted = encryption::decrypt("password", &envelope)?;
//! let restored = compression::decompress(&decrypted)?;
//! assert_eq!(restored, plaintext);
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod encryption;
pub mod error;

pub use compression::{
    compress, compress_if_worthwhile, decompress, is_compression_skipped, MIN_COMPRESSION_RATIO,
};
pub use encryption::{decrypt, encrypt, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
pub use error::{CodecError, CodecResult};
