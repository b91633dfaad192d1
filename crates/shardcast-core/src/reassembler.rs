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

//! Reassembly: walk a file's chunk chain, verify, decode, write
//!
//! Integrity is gated at every chunk boundary: the chain is validated
//! before any I/O, each decoded chunk must hash back to its recorded
//! [`ChunkMetadata::hash`], and the finished output must hash back to the
//! file id. Any failure aborts the run with the failing chunk's index;
//! partial output is left on disk for the caller to discard. Retries are a
//! policy of the distribution layer, not of the reassembler.

use crate::error::{CoreError, CoreResult};
use crate::hash::ContentHash;
use crate::metadata::{validate_chunk_chain, ChunkMetadata, MetadataStore};
use sha2::{Digest, Sha256};
use shardcast_storage::ChunkStorage;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Rebuilds original files from their stored chunks
#[derive(Debug)]
pub struct Reassembler {
    store: Arc<dyn ChunkStorage>,
    metadata: Arc<MetadataStore>,
}

impl Reassembler {
    /// Create a reassembler over the given store and metadata collaborators
    pub fn new(store: Arc<dyn ChunkStorage>, metadata: Arc<MetadataStore>) -> Self {
        Self { store, metadata }
    }

    /// Reassemble a file to `output_path`, truncating any existing file
    ///
    /// A zero-chunk file reassembles to an empty output and succeeds.
    pub async fn reassemble(
        &self,
        file_id: &ContentHash,
        output_path: impl AsRef<Path>,
        password: &str,
    ) -> CoreResult<()> {
        let output_path = output_path.as_ref();

        if self.metadata.get_file_metadata_by_id(file_id).await.is_none() {
            return Err(CoreError::FileNotFound(file_id.to_hex()));
        }

        let mut chunks = self.metadata.get_chunks_by_file_id(file_id).await;
        validate_chunk_chain(&chunks)?;

        // Redundant with the index order, kept as a cross-check of the
        // recorded offsets.
        chunks.sort_by_key(|c| c.offset);

        info!(
            file_id = %file_id,
            chunks = chunks.len(),
            output = %output_path.display(),
            "reassembly started"
        );

        let mut output = tokio::fs::File::create(output_path).await?;
        let mut hasher = Sha256::new();

        for chunk in &chunks {
            let data = self.decode_chunk(chunk, password).await?;
            hasher.update(&data);
            output.write_all(&data).await?;
        }

        output.flush().await?;
        output.sync_all().await?;

        let actual = ContentHash::from_digest(hasher);
        if actual != *file_id {
            return Err(CoreError::FileIntegrity {
                expected: file_id.to_hex(),
                actual: actual.to_hex(),
            });
        }

        info!(file_id = %file_id, "reassembly verified");
        Ok(())
    }

    // Read, decrypt, decompress and hash-verify a single chunk.
    async fn decode_chunk(&self, chunk: &ChunkMetadata, password: &str) -> CoreResult<Vec<u8>> {
        let envelope = self.store.get(&chunk.path).await?;

        let payload = shardcast_codec::decrypt(password, &envelope).map_err(|source| {
            CoreError::ChunkDecode {
                index: chunk.index,
                source,
            }
        })?;

        let data = if chunk.is_compressed {
            shardcast_codec::decompress(&payload).map_err(|source| CoreError::ChunkDecode {
                index: chunk.index,
                source,
            })?
        } else {
            payload
        };

        let actual = ContentHash::hash(&data);
        if actual != chunk.hash {
            return Err(CoreError::Integrity {
                index: chunk.index,
                expected: chunk.hash.to_hex(),
                actual: actual.to_hex(),
            });
        }

        debug!(index = chunk.index, size = data.len(), "chunk verified");
        Ok(data)
    }
}
