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

//! File and chunk metadata, and the durable store that holds them
//!
//! A file's chunks form a doubly-indexed sequence: each [`ChunkMetadata`]
//! carries its position, its neighbours (`-1` at the endpoints) and the
//! total count, so the chain can be validated before any byte of
//! reassembly work happens.
//!
//! The [`MetadataStore`] is a key/value store over a directory: in-memory
//! maps behind reader/writer locks, persisted as JSON documents with a temp
//! file and atomic rename on every mutation. Absent files mean an empty
//! store on open.

use crate::error::{CoreError, CoreResult};
use crate::hash::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

const FILES_BY_NAME: &str = "files.json";
const FILES_BY_ID: &str = "file_ids.json";
const CHUNK_LISTS: &str = "chunks.json";

/// Index sentinel for the first chunk's `prev` and the last chunk's `next`
pub const LINK_NONE: i64 = -1;

/// One chunk's place in a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// 0-based position in the file
    pub index: u64,
    /// Byte position in the original file (`index * chunk_size`)
    pub offset: u64,
    /// Hash of the chunk's original, pre-codec bytes
    pub hash: ContentHash,
    /// Content-store key of the stored encrypted blob
    pub path: String,
    /// Byte length of the stored encrypted blob
    pub size: u64,
    /// Index of the previous chunk, `-1` for the first
    pub prev_index: i64,
    /// Index of the next chunk, `-1` for the last
    pub next_index: i64,
    /// Chunk count of the whole file, equal across all its chunks
    pub total_chunks: u64,
    /// Id of the file this chunk belongs to
    pub file_id: ContentHash,
    /// Whether compression was applied before encryption
    pub is_compressed: bool,
}

/// File-level metadata, immutable after ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// SHA-256 of the entire original byte stream
    pub file_id: ContentHash,
    /// Filename at ingest
    pub name: String,
    /// Original size in bytes
    pub size: u64,
    /// Ordered chunk hashes
    pub chunk_hashes: Vec<ContentHash>,
    /// Ingest time
    pub created_at: DateTime<Utc>,
}

/// Validate that a chunk list forms the expected doubly-linked sequence
///
/// Checks that `total_chunks` is consistent, the indices are exactly
/// `{0..N−1}`, every chunk belongs to the same file, and the `prev`/`next`
/// links walk the sequence with `-1` sentinels at both ends. An empty list
/// is a valid zero-chunk file.
pub fn validate_chunk_chain(chunks: &[ChunkMetadata]) -> CoreResult<()> {
    if chunks.is_empty() {
        return Ok(());
    }

    let total = chunks.len() as u64;
    let file_id = chunks[0].file_id;

    let mut by_index: Vec<Option<&ChunkMetadata>> = vec![None; chunks.len()];
    for chunk in chunks {
        if chunk.total_chunks != total {
            return Err(CoreError::Chain(format!(
                "chunk {} reports total_chunks {} but the list has {}",
                chunk.index, chunk.total_chunks, total
            )));
        }
        if chunk.file_id != file_id {
            return Err(CoreError::Chain(format!(
                "chunk {} belongs to file {} but the list is for {}",
                chunk.index, chunk.file_id, file_id
            )));
        }
        let slot = usize::try_from(chunk.index)
            .ok()
            .filter(|i| *i < chunks.len())
            .ok_or_else(|| {
                CoreError::Chain(format!("chunk index {} out of range 0..{}", chunk.index, total))
            })?;
        if by_index[slot].is_some() {
            return Err(CoreError::Chain(format!("duplicate chunk index {}", chunk.index)));
        }
        by_index[slot] = Some(chunk);
    }

    for (i, slot) in by_index.iter().enumerate() {
        let chunk = slot.ok_or_else(|| CoreError::Chain(format!("missing chunk index {}", i)))?;

        let expected_prev = if i == 0 { LINK_NONE } else { i as i64 - 1 };
        let expected_next = if i == chunks.len() - 1 {
            LINK_NONE
        } else {
            i as i64 + 1
        };

        if chunk.prev_index != expected_prev {
            return Err(CoreError::Chain(format!(
                "chunk {} has prev_index {}, expected {}",
                i, chunk.prev_index, expected_prev
            )));
        }
        if chunk.next_index != expected_next {
            return Err(CoreError::Chain(format!(
                "chunk {} has next_index {}, expected {}",
                i, chunk.next_index, expected_next
            )));
        }
    }

    Ok(())
}

/// Durable key/value store for file and chunk metadata
///
/// Indexed both by filename and by file id; the per-file chunk lists live
/// under the file id. Every mutation persists the affected document before
/// returning.
#[derive(Debug)]
pub struct MetadataStore {
    dir: PathBuf,
    files_by_name: RwLock<HashMap<String, FileMetadata>>,
    files_by_id: RwLock<HashMap<String, FileMetadata>>,
    chunk_lists: RwLock<HashMap<String, Vec<ChunkMetadata>>>,
}

impl MetadataStore {
    /// Open (or create) a metadata store at `dir`
    pub async fn open(dir: impl AsRef<Path>) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let files_by_name = load_document(&dir.join(FILES_BY_NAME)).await?;
        let files_by_id: HashMap<String, FileMetadata> =
            load_document(&dir.join(FILES_BY_ID)).await?;
        let chunk_lists = load_document(&dir.join(CHUNK_LISTS)).await?;

        info!(
            dir = %dir.display(),
            files = files_by_id.len(),
            "metadata store opened"
        );

        Ok(Self {
            dir,
            files_by_name: RwLock::new(files_by_name),
            files_by_id: RwLock::new(files_by_id),
            chunk_lists: RwLock::new(chunk_lists),
        })
    }

    /// Record file metadata under its name
    pub async fn put_file_metadata(&self, name: &str, metadata: FileMetadata) -> CoreResult<()> {
        {
            let mut map = self.files_by_name.write().await;
            map.insert(name.to_string(), metadata);
        }
        self.persist_map(&self.files_by_name, FILES_BY_NAME).await
    }

    /// Record file metadata under its file id
    pub async fn put_file_metadata_by_id(
        &self,
        file_id: &ContentHash,
        metadata: FileMetadata,
    ) -> CoreResult<()> {
        {
            let mut map = self.files_by_id.write().await;
            map.insert(file_id.to_hex(), metadata);
        }
        self.persist_map(&self.files_by_id, FILES_BY_ID).await
    }

    /// Append one chunk record to its file's list
    pub async fn put_chunk_metadata(&self, chunk: ChunkMetadata) -> CoreResult<()> {
        {
            let mut lists = self.chunk_lists.write().await;
            lists.entry(chunk.file_id.to_hex()).or_default().push(chunk);
        }
        self.persist_map(&self.chunk_lists, CHUNK_LISTS).await
    }

    /// Replace a file's whole chunk list (what the chunker commits)
    pub async fn put_chunk_list(
        &self,
        file_id: &ContentHash,
        chunks: Vec<ChunkMetadata>,
    ) -> CoreResult<()> {
        {
            let mut lists = self.chunk_lists.write().await;
            lists.insert(file_id.to_hex(), chunks);
        }
        self.persist_map(&self.chunk_lists, CHUNK_LISTS).await
    }

    /// Look up file metadata by name
    pub async fn get_file_metadata(&self, name: &str) -> Option<FileMetadata> {
        self.files_by_name.read().await.get(name).cloned()
    }

    /// Look up file metadata by file id
    pub async fn get_file_metadata_by_id(&self, file_id: &ContentHash) -> Option<FileMetadata> {
        self.files_by_id.read().await.get(&file_id.to_hex()).cloned()
    }

    /// A file's chunk list, empty when none is recorded
    pub async fn get_chunks_by_file_id(&self, file_id: &ContentHash) -> Vec<ChunkMetadata> {
        self.chunk_lists
            .read()
            .await
            .get(&file_id.to_hex())
            .cloned()
            .unwrap_or_default()
    }

    /// All recorded files
    pub async fn list_files(&self) -> Vec<FileMetadata> {
        let mut files: Vec<FileMetadata> = self.files_by_id.read().await.values().cloned().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    /// Remove a file's metadata under both keys along with its chunk list
    ///
    /// Returns the removed metadata, or `None` when the id is unknown. The
    /// caller is responsible for releasing the chunks' store references.
    pub async fn remove_file(&self, file_id: &ContentHash) -> CoreResult<Option<FileMetadata>> {
        let removed = {
            let mut by_id = self.files_by_id.write().await;
            by_id.remove(&file_id.to_hex())
        };

        let Some(metadata) = removed else {
            return Ok(None);
        };

        {
            let mut by_name = self.files_by_name.write().await;
            // Only drop the name entry if it still points at this file
            if by_name
                .get(&metadata.name)
                .is_some_and(|m| m.file_id == metadata.file_id)
            {
                by_name.remove(&metadata.name);
            }
        }
        {
            let mut lists = self.chunk_lists.write().await;
            lists.remove(&file_id.to_hex());
        }

        self.persist_map(&self.files_by_id, FILES_BY_ID).await?;
        self.persist_map(&self.files_by_name, FILES_BY_NAME).await?;
        self.persist_map(&self.chunk_lists, CHUNK_LISTS).await?;

        debug!(file_id = %file_id, name = %metadata.name, "file metadata removed");
        Ok(Some(metadata))
    }

    /// Validate a chunk list (see [`validate_chunk_chain`])
    pub fn validate_chunk_chain(&self, chunks: &[ChunkMetadata]) -> CoreResult<()> {
        validate_chunk_chain(chunks)
    }

    // Marshal under the read lock, write outside it.
    async fn persist_map<T: Serialize>(
        &self,
        map: &RwLock<HashMap<String, T>>,
        filename: &str,
    ) -> CoreResult<()> {
        let json = {
            let map = map.read().await;
            serde_json::to_string_pretty(&*map)
                .map_err(|e| CoreError::Io(std::io::Error::other(e)))?
        };
        write_atomic(&self.dir.join(filename), json.as_bytes()).await
    }
}

async fn load_document<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> CoreResult<HashMap<String, T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Io(std::io::Error::other(e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> CoreResult<()> {
    let temp_path = path.with_extension("tmp");
    let _ = tokio::fs::remove_file(&temp_path).await;

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
