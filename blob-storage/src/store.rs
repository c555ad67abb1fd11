use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::local_store::LocalChunkStore;
use crate::memory_store::MemoryChunkStore;
use crate::record::{ChunkId, FileId, FileRecord};
use crate::rocks_store::RocksChunkStore;
use crate::uri::StoreUri;

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for storing and fetching chunks and file records by their IDs.
///
/// The store imposes no ordering between calls; callers write and read chunks
/// in index order themselves.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Stores a chunk by its id.
    async fn put_chunk(&self, id: &ChunkId, data: Bytes) -> StoreResult<()>;

    /// Retrieves a chunk by its id.
    async fn get_chunk(&self, id: &ChunkId) -> StoreResult<Bytes>;

    /// Persists a complete file record. Once this returns the file is visible.
    async fn put_record(&self, record: &FileRecord) -> StoreResult<()>;

    async fn get_record(&self, id: &FileId) -> StoreResult<Option<FileRecord>>;
}

pub type SharedChunkStore = Arc<dyn ChunkStore>;

#[derive(Debug, Clone)]
pub enum ChunkStores {
    Local(LocalChunkStore),
    Rocks(RocksChunkStore),
    Memory(MemoryChunkStore),
}

impl ChunkStores {
    /// Opens the backend the uri points at, creating it if missing.
    pub async fn open(uri: &StoreUri) -> StoreResult<Self> {
        match uri {
            StoreUri::RocksDb(path) => {
                let path = path.clone();
                let store = tokio::task::spawn_blocking(move || RocksChunkStore::open(path)).await??;
                Ok(ChunkStores::Rocks(store))
            }
            StoreUri::Local(path) => Ok(ChunkStores::Local(LocalChunkStore::open(path.clone()).await?)),
            StoreUri::Memory => Ok(ChunkStores::Memory(MemoryChunkStore::new())),
        }
    }

    pub fn into_shared(self) -> SharedChunkStore {
        match self {
            ChunkStores::Local(a) => Arc::new(a),
            ChunkStores::Rocks(b) => Arc::new(b),
            ChunkStores::Memory(c) => Arc::new(c),
        }
    }
}
