use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, DB};
use tokio::task;

use crate::error::StoreError;
use crate::record::{ChunkId, FileId, FileRecord};
use crate::store::{ChunkStore, StoreResult};

const CHUNKS_CF: &str = "chunks";
const FILES_CF: &str = "files";

/// A `ChunkStore` backed by a single RocksDB database.
///
/// Chunks live in the `chunks` column family, keyed by file id followed by the
/// big-endian chunk index so a file's chunks sort in order. Records live in
/// `files` as JSON.
#[derive(Debug, Clone)]
pub struct RocksChunkStore {
    db: Arc<DB>,
}

/// Converts a chunk id to its 20 byte key.
fn chunk_key(id: &ChunkId) -> [u8; 20] {
    let mut key = [0u8; 20];
    key[..16].copy_from_slice(id.file_id.as_bytes());
    BigEndian::write_u32(&mut key[16..], id.index);
    key
}

impl RocksChunkStore {
    /// Opens (or creates) the database. Blocks, so call it off the async runtime.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let mut db_opts = Options::default();
        db_opts.create_missing_column_families(true);
        db_opts.create_if_missing(true);

        let chunks = ColumnFamilyDescriptor::new(CHUNKS_CF, Options::default());
        let files = ColumnFamilyDescriptor::new(FILES_CF, Options::default());

        let db = DB::open_cf_descriptors(&db_opts, db_path, vec![chunks, files])?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &'static str) -> StoreResult<&ColumnFamily> {
        self.db.cf_handle(name).ok_or(StoreError::MissingColumnFamily(name))
    }
}

#[async_trait]
impl ChunkStore for RocksChunkStore {
    async fn put_chunk(&self, id: &ChunkId, data: Bytes) -> StoreResult<()> {
        let store = self.clone();
        let key = chunk_key(id);
        task::spawn_blocking(move || -> StoreResult<()> {
            store.db.put_cf(store.cf(CHUNKS_CF)?, key, &data)?;
            Ok(())
        })
        .await?
    }

    async fn get_chunk(&self, id: &ChunkId) -> StoreResult<Bytes> {
        let store = self.clone();
        let id = *id;
        task::spawn_blocking(move || -> StoreResult<Bytes> {
            store
                .db
                .get_cf(store.cf(CHUNKS_CF)?, chunk_key(&id))?
                .map(Bytes::from)
                .ok_or(StoreError::ChunkNotFound(id))
        })
        .await?
    }

    async fn put_record(&self, record: &FileRecord) -> StoreResult<()> {
        let store = self.clone();
        let key = *record.id.as_bytes();
        let encoded = serde_json::to_vec(record)?;
        task::spawn_blocking(move || -> StoreResult<()> {
            store.db.put_cf(store.cf(FILES_CF)?, key, encoded)?;
            // Syncing the WAL here also makes every earlier chunk write durable.
            store.db.flush_wal(true)?;
            Ok(())
        })
        .await?
    }

    async fn get_record(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        let store = self.clone();
        let key = *id.as_bytes();
        task::spawn_blocking(move || -> StoreResult<Option<FileRecord>> {
            match store.db.get_cf(store.cf(FILES_CF)?, key)? {
                Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
                None => Ok(None),
            }
        })
        .await?
    }
}
