use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a stored file. Generated when an upload is opened.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A chunk is addressed by its owning file and its position in that file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    pub file_id: FileId,
    pub index: u32,
}

impl ChunkId {
    pub fn new(file_id: FileId, index: u32) -> Self {
        Self { file_id, index }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.file_id, self.index)
    }
}

/// Metadata of a completely written file.
///
/// A record is only ever built once all of its chunks were stored, so holding
/// one means every chunk in `chunks` exists. The chunk lengths add up to `size`:
/// every chunk but the last is exactly `chunk_size` bytes long.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    /// `<unix-millis>-<original name>`
    pub filename: String,
    pub original_name: String,
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    pub chunk_size: u64,
    pub chunks: Vec<ChunkId>,
    /// Hex SHA-256 of the whole content.
    pub sha256: String,
}

impl FileRecord {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Length the chunk at `index` must have for the record's sizes to add up.
    pub fn expected_chunk_len(&self, index: usize) -> Option<u64> {
        let count = self.chunks.len();
        if index >= count {
            return None;
        }
        if index + 1 < count {
            return Some(self.chunk_size);
        }
        let full = self.chunk_size.checked_mul(count as u64 - 1)?;
        self.size.checked_sub(full)
    }
}

pub fn stored_filename(upload_date: &DateTime<Utc>, original_name: &str) -> String {
    format!("{}-{}", upload_date.timestamp_millis(), original_name)
}
