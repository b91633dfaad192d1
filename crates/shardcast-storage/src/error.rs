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

//! Storage error types and utilities

use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during chunk store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Chunk not found in the store
    #[error("chunk not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stored representation could not be decoded
    #[error("corrupt chunk: {0}")]
    Corrupt(String),

    /// Index serialization or deserialization failed
    #[error("index serialization error: {0}")]
    Serialization(String),

    /// Store misconfigured or in an unusable state
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a NotFound error with the given key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        StorageError::NotFound(key.into())
    }

    /// Create a Corrupt error with context
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        StorageError::Corrupt(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Check if this is a Corrupt error
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Corrupt(_))
    }
}

impl From<shardcast_codec::CodecError> for StorageError {
    fn from(err: shardcast_codec::CodecError) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StorageError::not_found("abc123");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "chunk not found: abc123");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::other("write failed");
        let storage_err = StorageError::from(io_err);
        assert!(matches!(storage_err, StorageError::Io(_)));
    }

    #[test]
    fn test_codec_error_maps_to_corrupt() {
        let codec_err = shardcast_codec::CodecError::corrupt("bad frame");
        let storage_err = StorageError::from(codec_err);
        assert!(storage_err.is_corrupt());
    }
}
