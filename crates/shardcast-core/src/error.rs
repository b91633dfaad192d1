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

//! Core error types
//!
//! Every failed operation carries enough context to diagnose without a
//! re-run: the chunk index, the expected and actual hashes, or the key that
//! was missing. Codec and storage failures convert transparently.

use shardcast_codec::CodecError;
use shardcast_storage::StorageError;
use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the chunk pipeline
#[derive(Error, Debug)]
pub enum CoreError {
    /// No file metadata under the given name or id
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A decoded chunk's hash did not match its recorded hash
    #[error("chunk {index} integrity check failed: expected {expected}, actual {actual}")]
    Integrity {
        /// Position of the failing chunk in the file
        index: u64,
        /// Hash recorded at ingest
        expected: String,
        /// Hash of the decoded bytes
        actual: String,
    },

    /// The reassembled output did not hash back to the file id
    #[error("file integrity check failed: expected {expected}, actual {actual}")]
    FileIntegrity {
        /// The file id
        expected: String,
        /// Hash of the written output
        actual: String,
    },

    /// The chunk list is not a valid doubly-linked sequence
    #[error("invalid chunk chain: {0}")]
    Chain(String),

    /// A chunk failed to decrypt or decompress during reassembly
    #[error("chunk {index} failed to decode: {source}")]
    ChunkDecode {
        /// Position of the failing chunk in the file
        index: u64,
        /// The codec failure
        source: CodecError,
    },

    /// Codec failure outside the per-chunk reassembly loop
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Content store failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] shardcast_config::ConfigError),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A hex string did not parse as a content hash
    #[error("invalid hash: {0}")]
    InvalidHash(String),
}

impl CoreError {
    /// Check if this is an integrity failure (chunk- or file-level)
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            CoreError::Integrity { .. } | CoreError::FileIntegrity { .. }
        )
    }

    /// Check if this is a chain validation failure
    pub fn is_chain(&self) -> bool {
        matches!(self, CoreError::Chain(_))
    }

    /// Index of the failing chunk, when the error is chunk-scoped
    pub fn chunk_index(&self) -> Option<u64> {
        match self {
            CoreError::Integrity { index, .. } | CoreError::ChunkDecode { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_error_context() {
        let err = CoreError::Integrity {
            index: 3,
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(err.is_integrity());
        assert_eq!(err.chunk_index(), Some(3));
        assert!(err.to_string().contains("chunk 3"));
    }

    #[test]
    fn test_decode_error_carries_index() {
        let err = CoreError::ChunkDecode {
            index: 7,
            source: CodecError::decrypt("authentication failed"),
        };
        assert_eq!(err.chunk_index(), Some(7));
        assert!(!err.is_integrity());
    }
}
