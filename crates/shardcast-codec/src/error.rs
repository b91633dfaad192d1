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

//! Codec error types

use thiserror::Error;

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a chunk
#[derive(Error, Debug)]
pub enum CodecError {
    /// AEAD open failed: tag mismatch, truncated envelope, or scrypt failure
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Decompression failed: the stored bytes are not a valid LZ4 frame
    #[error("corrupt chunk data: {0}")]
    Corrupt(String),

    /// Compression failed
    #[error("compression failed: {0}")]
    Compression(String),

    /// scrypt parameter or derivation failure
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

impl CodecError {
    /// Create a Decrypt error with context
    pub fn decrypt<S: Into<String>>(msg: S) -> Self {
        CodecError::Decrypt(msg.into())
    }

    /// Create a Corrupt error with context
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        CodecError::Corrupt(msg.into())
    }

    /// Check if this is a Decrypt error
    pub fn is_decrypt(&self) -> bool {
        matches!(self, CodecError::Decrypt(_))
    }

    /// Check if this is a Corrupt error
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CodecError::Corrupt(_))
    }
}
