use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use blob_store::{ChunkStores, FileId, FileRecord, SharedChunkStore, StoreError, StoreUri};
use quick_cache::sync::Cache;

use crate::errors::ImageServerErr;

/// Process-wide handle to the chunk store.
///
/// Empty until the store has been opened; services check [`StoreHandle::ready`]
/// before touching storage.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Arc<OnceLock<SharedChunkStore>>,
}

impl StoreHandle {
    /// Installs the opened store. Returns false if one was already installed.
    pub fn install(&self, store: SharedChunkStore) -> bool {
        self.inner.set(store).is_ok()
    }

    pub fn ready(&self) -> Result<SharedChunkStore, ImageServerErr> {
        self.inner.get().cloned().ok_or(ImageServerErr::StoreUnavailable)
    }
}

pub struct AppState {
    pub(crate) store: StoreHandle,
    pub(crate) chunk_size: NonZeroUsize,
    /// Completed records never change, so they can be cached indefinitely.
    pub(crate) records: Cache<FileId, Arc<FileRecord>>,
    pub(crate) public_dir: PathBuf,
}

impl AppState {
    pub fn new(store: StoreHandle, chunk_size: NonZeroUsize, record_cache_size: usize, public_dir: PathBuf) -> Self {
        Self {
            store,
            chunk_size,
            records: Cache::new(record_cache_size.max(1)),
            public_dir,
        }
    }
}

/// Opens the store behind `uri` and installs it into `handle`.
pub async fn connect_store(uri: &StoreUri, handle: &StoreHandle) -> Result<(), StoreError> {
    let store = ChunkStores::open(uri).await?;
    if !handle.install(store.into_shared()) {
        tracing::warn!(?uri, "store already connected, ignoring second connection");
        return Ok(());
    }
    tracing::info!(?uri, "Connected to store");
    Ok(())
}
