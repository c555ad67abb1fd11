use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::record::{ChunkId, FileId, FileRecord};
use crate::store::{ChunkStore, StoreResult};

/// A `ChunkStore` that keeps chunks and records as files in a local directory.
///
/// Layout: `<dir>/chunks/<chunk-id>` and `<dir>/files/<file-id>.json`.
#[derive(Clone, Debug)]
pub struct LocalChunkStore {
    directory: PathBuf,
}

impl LocalChunkStore {
    /// Creates a new `LocalChunkStore` targeting the specified directory.
    /// The directory layout must already exist, see [`LocalChunkStore::open`].
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// Creates the directory layout if needed and returns the store.
    pub async fn open(directory: PathBuf) -> StoreResult<Self> {
        let store = Self::new(directory);
        fs::create_dir_all(store.directory.join("chunks")).await?;
        fs::create_dir_all(store.directory.join("files")).await?;
        Ok(store)
    }

    fn chunk_path(&self, id: &ChunkId) -> PathBuf {
        self.directory.join("chunks").join(id.to_string())
    }

    fn record_path(&self, id: &FileId) -> PathBuf {
        self.directory.join("files").join(format!("{id}.json"))
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn put_chunk(&self, id: &ChunkId, data: Bytes) -> StoreResult<()> {
        // synced before returning so a record written afterwards never outlives its chunks
        let mut file = fs::File::create(self.chunk_path(id)).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn get_chunk(&self, id: &ChunkId) -> StoreResult<Bytes> {
        match fs::read(self.chunk_path(id)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::ChunkNotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_record(&self, record: &FileRecord) -> StoreResult<()> {
        let encoded = serde_json::to_vec(record)?;
        let path = self.record_path(&record.id);
        let tmp_path = path.with_extension("json.tmp");

        // Readers only ever see the renamed file, never a partial write.
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn get_record(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        match fs::read(self.record_path(id)).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
