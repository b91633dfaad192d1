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

//! File ingestion: split, encode, store, link
//!
//! The chunker reads a file in fixed-size windows on a single reader task
//! and fans the CPU-bound work (hash, compress, encrypt, store) out to a
//! pool of workers over a bounded channel. Window reads stay strictly
//! sequential; chunk processing and storage may complete out of order, and
//! the emitted metadata is sorted by index before the chain is linked and
//! committed.
//!
//! Cancellation is cooperative: the first worker to fail records its error
//! in a latch, the reader stops and closes the channel, and the remaining
//! workers drain without processing.

use crate::error::{CoreError, CoreResult};
use crate::hash::ContentHash;
use crate::metadata::{ChunkMetadata, FileMetadata, MetadataStore, LINK_NONE};
use chrono::Utc;
use shardcast_storage::ChunkStorage;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Chunker tuning
#[derive(Debug, Clone)]
pub struct ChunkerOptions {
    /// Worker divisor: workers = cpu_count / ratio, floor 1
    pub parallelism_ratio: usize,
    /// Attempt compression before encryption
    pub enable_compression: bool,
    /// Minimum window size in bytes before compression is attempted
    pub compression_threshold: usize,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            parallelism_ratio: 2,
            enable_compression: true,
            compression_threshold: 1024,
        }
    }
}

/// Outcome of one ingest run
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// SHA-256 of the whole original file
    pub file_id: ContentHash,
    /// Filename the metadata was recorded under
    pub file_name: String,
    /// Original size in bytes
    pub file_size: u64,
    /// Number of chunks produced
    pub total_chunks: u64,
    /// Window size chosen for this file
    pub chunk_size: u64,
}

/// Window size for a file of the given length
///
/// Larger files get larger windows to bound per-chunk overhead.
pub fn chunk_size_for(file_size: u64) -> u64 {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    match file_size {
        0..=MIB => 256 * KIB,
        s if s <= 10 * MIB => 512 * KIB,
        s if s <= 100 * MIB => MIB,
        s if s <= GIB => 4 * MIB,
        _ => 8 * MIB,
    }
}

/// Splits files into encoded, content-addressed chunks
#[derive(Debug)]
pub struct Chunker {
    store: Arc<dyn ChunkStorage>,
    metadata: Arc<MetadataStore>,
    options: ChunkerOptions,
}

impl Chunker {
    /// Create a chunker over the given store and metadata collaborators
    pub fn new(
        store: Arc<dyn ChunkStorage>,
        metadata: Arc<MetadataStore>,
        options: ChunkerOptions,
    ) -> Self {
        Self {
            store,
            metadata,
            options,
        }
    }

    /// Worker count: `max(1, cpu_count / parallelism_ratio)`
    fn worker_count(&self) -> usize {
        (num_cpus::get() / self.options.parallelism_ratio.max(1)).max(1)
    }

    /// Ingest a file: split into chunks, encode, store and commit metadata
    ///
    /// The file id is computed in a streaming pre-pass; the file is then
    /// re-read window by window. An empty file produces zero chunks but
    /// still records its metadata.
    pub async fn ingest_file(&self, path: impl AsRef<Path>, password: &str) -> CoreResult<IngestReport> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_id = ContentHash::from_file_async(path).await?;
        let file_size = tokio::fs::metadata(path).await?.len();
        let chunk_size = chunk_size_for(file_size);

        let skip_compression = !self.options.enable_compression
            || shardcast_codec::is_compression_skipped(&file_name);
        let workers = self.worker_count();

        info!(
            file = %file_name,
            file_id = %file_id,
            size = file_size,
            chunk_size,
            workers,
            "ingest started"
        );

        let (tx, rx) = async_channel::bounded::<(u64, Vec<u8>)>(2 * workers);
        let results: Arc<Mutex<Vec<ChunkMetadata>>> = Arc::new(Mutex::new(Vec::new()));
        let first_error: Arc<Mutex<Option<CoreError>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let store = Arc::clone(&self.store);
            let results = Arc::clone(&results);
            let first_error = Arc::clone(&first_error);
            let password = password.to_string();
            let threshold = self.options.compression_threshold;

            handles.push(tokio::spawn(async move {
                while let Ok((index, window)) = rx.recv().await {
                    if first_error.lock().await.is_some() {
                        continue; // drain without processing
                    }
                    match process_window(
                        store.as_ref(),
                        &password,
                        skip_compression,
                        threshold,
                        file_id,
                        chunk_size,
                        index,
                        window,
                    )
                    .await
                    {
                        Ok(chunk) => results.lock().await.push(chunk),
                        Err(e) => {
                            let mut latch = first_error.lock().await;
                            if latch.is_none() {
                                warn!(index, error = %e, "chunk worker failed");
                                *latch = Some(e);
                            }
                        }
                    }
                }
            }));
        }
        drop(rx);

        // Sequential window reads in this task; the bounded channel throttles
        // the reader against slow workers.
        let read_result = self
            .read_windows(path, chunk_size, &tx, &first_error)
            .await;
        drop(tx);

        for handle in handles {
            let _ = handle.await;
        }

        if let Some(err) = first_error.lock().await.take() {
            return Err(err);
        }
        read_result?;

        let mut chunks = {
            let mut guard = results.lock().await;
            std::mem::take(&mut *guard)
        };
        chunks.sort_by_key(|c| c.index);

        let total = chunks.len() as u64;
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.prev_index = if i == 0 { LINK_NONE } else { i as i64 - 1 };
            chunk.next_index = if i as u64 == total - 1 {
                LINK_NONE
            } else {
                i as i64 + 1
            };
            chunk.total_chunks = total;
        }

        let file_metadata = FileMetadata {
            file_id,
            name: file_name.clone(),
            size: file_size,
            chunk_hashes: chunks.iter().map(|c| c.hash).collect(),
            created_at: Utc::now(),
        };

        self.metadata
            .put_file_metadata(&file_name, file_metadata.clone())
            .await?;
        self.metadata
            .put_file_metadata_by_id(&file_id, file_metadata)
            .await?;
        self.metadata.put_chunk_list(&file_id, chunks).await?;

        info!(file = %file_name, file_id = %file_id, total_chunks = total, "ingest committed");

        Ok(IngestReport {
            file_id,
            file_name,
            file_size,
            total_chunks: total,
            chunk_size,
        })
    }

    async fn read_windows(
        &self,
        path: &Path,
        chunk_size: u64,
        tx: &async_channel::Sender<(u64, Vec<u8>)>,
        first_error: &Mutex<Option<CoreError>>,
    ) -> CoreResult<()> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut index = 0u64;

        loop {
            if first_error.lock().await.is_some() {
                debug!("reader observed worker error, stopping");
                break;
            }

            let mut window = Vec::with_capacity(chunk_size as usize);
            let mut remaining = chunk_size;
            while remaining > 0 {
                let read = (&mut file)
                    .take(remaining)
                    .read_to_end(&mut window)
                    .await?;
                if read == 0 {
                    break;
                }
                remaining -= read as u64;
            }

            if window.is_empty() {
                break; // EOF
            }

            if tx.send((index, window)).await.is_err() {
                break; // all workers gone
            }
            index += 1;
        }

        Ok(())
    }
}

// Hash, encode and store one window, emitting its preliminary metadata
// (link fields are populated after all workers drain).
#[allow(clippy::too_many_arguments)]
async fn process_window(
    store: &dyn ChunkStorage,
    password: &str,
    skip_compression: bool,
    threshold: usize,
    file_id: ContentHash,
    chunk_size: u64,
    index: u64,
    window: Vec<u8>,
) -> CoreResult<ChunkMetadata> {
    let hash = ContentHash::hash(&window);

    let (payload, is_compressed) = if !skip_compression && window.len() >= threshold {
        match shardcast_codec::compress_if_worthwhile(&window)? {
            Some(compressed) => (compressed, true),
            None => (window, false),
        }
    } else {
        (window, false)
    };

    let envelope = shardcast_codec::encrypt(password, &payload)?;
    let envelope_len = envelope.len() as u64;
    let key = store.put(&envelope).await?;

    debug!(index, hash = %hash, key = %key, compressed = is_compressed, "chunk encoded");

    Ok(ChunkMetadata {
        index,
        offset: index * chunk_size,
        hash,
        path: key,
        size: envelope_len,
        prev_index: LINK_NONE,
        next_index: LINK_NONE,
        total_chunks: 0,
        file_id,
        is_compressed,
    })
}
