use thiserror::Error;

use crate::record::{ChunkId, FileId};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised by a `ChunkStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chunk {0} not found")]
    ChunkNotFound(ChunkId),

    #[error("chunk store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("RocksDB operation failed: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("column family {0} is missing")]
    MissingColumnFamily(&'static str),

    #[error("failed to encode or decode a file record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid store uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// Failures of the blob write and read paths.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("upload contained no bytes")]
    EmptyUpload,

    #[error("file {0} not found")]
    NotFound(FileId),

    #[error("failed to read the upload stream: {0}")]
    Stream(#[source] BoxError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("upload needs more than {max} chunks", max = u64::from(u32::MAX) + 1)]
    TooManyChunks,

    #[error("chunk {chunk} holds {actual} bytes, expected {expected}")]
    Corrupt {
        chunk: ChunkId,
        expected: u64,
        actual: u64,
    },
}
