use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::http::header;
use actix_web::test::TestRequest;
use actix_web::web::Data;
use async_trait::async_trait;
use blob_store::memory_store::MemoryChunkStore;
use blob_store::{ChunkId, ChunkStore, FileId, FileRecord, SharedChunkStore, StoreResult};
use bytes::Bytes;
use tracing::subscriber::DefaultGuard;

use crate::state::{AppState, StoreHandle};

pub(crate) const BOUNDARY: &str = "image-server-test-boundary";

/// Memory store that counts every call made against it.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryChunkStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkStore for CountingStore {
    async fn put_chunk(&self, id: &ChunkId, data: Bytes) -> StoreResult<()> {
        self.count();
        self.inner.put_chunk(id, data).await
    }

    async fn get_chunk(&self, id: &ChunkId) -> StoreResult<Bytes> {
        self.count();
        self.inner.get_chunk(id).await
    }

    async fn put_record(&self, record: &FileRecord) -> StoreResult<()> {
        self.count();
        self.inner.put_record(record).await
    }

    async fn get_record(&self, id: &FileId) -> StoreResult<Option<FileRecord>> {
        self.count();
        self.inner.get_record(id).await
    }
}

/// App state over `store`, or a not-yet-connected handle when `None`.
pub(crate) fn app_state(store: Option<SharedChunkStore>, chunk_size: usize, public_dir: PathBuf) -> Data<AppState> {
    let handle = StoreHandle::default();
    if let Some(store) = store {
        assert!(handle.install(store));
    }
    let chunk_size = chunk_size.try_into().unwrap();
    Data::new(AppState::new(handle, chunk_size, 16, public_dir))
}

pub(crate) fn memory_state(chunk_size: usize) -> (Arc<CountingStore>, Data<AppState>) {
    let store = Arc::new(CountingStore::default());
    let state = app_state(Some(store.clone()), chunk_size, PathBuf::from("public"));
    (store, state)
}

/// A part of a multipart/form-data body: field name, optional filename, content.
pub(crate) struct Part<'a> {
    pub(crate) name: &'a str,
    pub(crate) filename: Option<&'a str>,
    pub(crate) data: &'a [u8],
}

pub(crate) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!("form-data; name=\"{}\"; filename=\"{filename}\"", part.name),
            None => format!("form-data; name=\"{}\"", part.name),
        };
        body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(crate) fn upload_request(parts: &[Part<'_>]) -> TestRequest {
    TestRequest::post()
        .uri("/upload")
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(multipart_body(parts))
}

/// Collects formatted log output of the current thread while installed.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn install(&self) -> DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
