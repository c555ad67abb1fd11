use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::record::{ChunkId, FileId, FileRecord};
use crate::store::{ChunkStore, StoreResult};

/// A `ChunkStore` held entirely in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    chunks: Arc<DashMap<ChunkId, Bytes>>,
    records: Arc<DashMap<FileId, FileRecord>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put_chunk(&self, id: &ChunkId, data: Bytes) -> StoreResult<()> {
        self.chunks.insert(*id, data);
        Ok(())
    }

    async fn get_chunk(&self, id: &ChunkId) -> StoreResult<Bytes> {
        self.chunks
            .get(id)
            .map(|chunk| chunk.value().clone())
            .ok_or(StoreError::ChunkNotFound(*id))
    }

    async fn put_record(&self, record: &FileRecord) -> StoreResult<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        Ok(self.records.get(id).map(|record| record.value().clone()))
    }
}
