use std::num::NonZeroUsize;
use std::pin::pin;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};

use crate::error::{BlobError, BoxError};
use crate::record::{stored_filename, ChunkId, FileId, FileRecord};
use crate::store::ChunkStore;

/// 255 KiB, the GridFS default.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Index of the chunk following `written` chunks; indexes are u32 and never wrap.
fn chunk_index(written: usize) -> Result<u32, BlobError> {
    u32::try_from(written).map_err(|_| BlobError::TooManyChunks)
}

/// An upload whose chunks are still being written. It never reaches the store;
/// only [`OpenUpload::complete`] turns it into a persistable record.
struct OpenUpload {
    id: FileId,
    original_name: String,
    upload_date: DateTime<Utc>,
    chunk_size: usize,
    size: u64,
    chunks: Vec<ChunkId>,
    hasher: Sha256,
}

impl OpenUpload {
    fn new(original_name: &str, chunk_size: usize) -> Self {
        Self {
            id: FileId::generate(),
            original_name: original_name.to_string(),
            upload_date: Utc::now(),
            chunk_size,
            size: 0,
            chunks: Vec::new(),
            hasher: Sha256::new(),
        }
    }

    fn next_chunk_id(&self) -> Result<ChunkId, BlobError> {
        Ok(ChunkId::new(self.id, chunk_index(self.chunks.len())?))
    }

    fn push(&mut self, id: ChunkId, data: &[u8]) {
        self.hasher.update(data);
        self.size += data.len() as u64;
        self.chunks.push(id);
    }

    fn complete(self) -> FileRecord {
        let digest = self.hasher.finalize();
        FileRecord {
            id: self.id,
            filename: stored_filename(&self.upload_date, &self.original_name),
            original_name: self.original_name,
            upload_date: self.upload_date,
            size: self.size,
            chunk_size: self.chunk_size as u64,
            chunks: self.chunks,
            sha256: digest.iter().map(|byte| format!("{:02x}", byte)).collect(),
        }
    }
}

/// Splits a byte stream into fixed-size chunks and stores them in order.
pub struct BlobWriter<'a> {
    store: &'a dyn ChunkStore,
    chunk_size: NonZeroUsize,
}

impl<'a> BlobWriter<'a> {
    pub fn new(store: &'a dyn ChunkStore, chunk_size: NonZeroUsize) -> Self {
        Self { store, chunk_size }
    }

    /// Drains `stream` into the store and persists the file record last.
    ///
    /// If any chunk write fails the record is never written, so the file does
    /// not become visible. Chunks written before the failure stay behind.
    pub async fn write<S, E>(&self, original_name: &str, stream: S) -> Result<FileRecord, BlobError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let mut stream = pin!(stream);
        let chunk_size = self.chunk_size.get();
        let mut upload = OpenUpload::new(original_name, chunk_size);
        let mut buffer = BytesMut::with_capacity(chunk_size);

        while let Some(next) = stream.next().await {
            let mut bytes = next.map_err(|e| BlobError::Stream(e.into()))?;
            while !bytes.is_empty() {
                let take = (chunk_size - buffer.len()).min(bytes.len());
                buffer.extend_from_slice(&bytes.split_to(take));
                if buffer.len() == chunk_size {
                    self.write_chunk(&mut upload, buffer.split().freeze()).await?;
                }
            }
        }
        if !buffer.is_empty() {
            self.write_chunk(&mut upload, buffer.freeze()).await?;
        }
        if upload.chunks.is_empty() {
            return Err(BlobError::EmptyUpload);
        }

        let record = upload.complete();
        self.store.put_record(&record).await.map_err(|e| {
            tracing::error!(id = %record.id, error = %e, "failed to persist file record");
            e
        })?;
        tracing::debug!(id = %record.id, size = record.size, chunks = record.chunk_count(), "file record persisted");
        Ok(record)
    }

    async fn write_chunk(&self, upload: &mut OpenUpload, data: Bytes) -> Result<(), BlobError> {
        let id = upload.next_chunk_id()?;
        upload.push(id, &data);
        self.store.put_chunk(&id, data).await.map_err(|e| {
            tracing::error!(chunk = %id, error = %e, "failed to write chunk");
            e
        })?;
        Ok(())
    }
}
