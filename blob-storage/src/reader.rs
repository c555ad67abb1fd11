use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, Stream};

use crate::error::BlobError;
use crate::record::{FileId, FileRecord};
use crate::store::SharedChunkStore;

/// Reassembles stored files chunk by chunk.
#[derive(Clone)]
pub struct BlobReader {
    store: SharedChunkStore,
}

impl BlobReader {
    pub fn new(store: SharedChunkStore) -> Self {
        Self { store }
    }

    /// Loads the record of a completely written file.
    pub async fn open(&self, id: &FileId) -> Result<FileRecord, BlobError> {
        self.store.get_record(id).await?.ok_or(BlobError::NotFound(*id))
    }

    /// Streams the file's bytes in chunk order, fetching one chunk per poll.
    ///
    /// A failed fetch ends the stream with that error; whatever was already
    /// yielded stays yielded. Dropping the stream stops further fetches.
    pub fn stream(&self, record: Arc<FileRecord>) -> impl Stream<Item = Result<Bytes, BlobError>> + Send + 'static {
        stream::try_unfold((self.store.clone(), record, 0usize), |(store, record, index)| async move {
            let Some(id) = record.chunks.get(index).copied() else {
                return Ok(None);
            };
            let data = store.get_chunk(&id).await?;

            let expected = record.expected_chunk_len(index).unwrap_or_default();
            if data.len() as u64 != expected {
                return Err(BlobError::Corrupt { chunk: id, expected, actual: data.len() as u64 });
            }
            Ok::<_, BlobError>(Some((data, (store, record, index + 1))))
        })
    }
}
