//! Chunked blob storage: files are split into fixed-size chunks, stored under
//! per-chunk keys and described by a [`FileRecord`] that is written last.

pub mod error;
pub mod local_store;
pub mod memory_store;
pub mod reader;
pub mod record;
pub mod rocks_store;
pub mod store;
pub mod uri;
pub mod writer;

pub use error::{BlobError, StoreError};
pub use reader::BlobReader;
pub use record::{ChunkId, FileId, FileRecord};
pub use store::{ChunkStore, ChunkStores, SharedChunkStore, StoreResult};
pub use uri::StoreUri;
pub use writer::{BlobWriter, DEFAULT_CHUNK_SIZE};
