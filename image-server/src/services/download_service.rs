use std::sync::Arc;

use actix_web::body::SizedStream;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web::Data;
use actix_web::{get, web, HttpRequest, HttpResponse};
use blob_store::{BlobError, BlobReader, FileId, FileRecord};
use futures::{stream, StreamExt, TryStreamExt};

use crate::errors::ImageServerErr;
use crate::services::client_ip;
use crate::state::AppState;

/// Maps the last extension of `original_name` to an image content type.
pub(crate) fn content_type_for(original_name: &str) -> &'static str {
    let Some((_, ext)) = original_name.rsplit_once('.') else {
        return "application/octet-stream";
    };
    match ext.to_ascii_lowercase().as_str() {
        "jpg" => "image/jpg",
        "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

async fn lookup_record(
    shared_state: &AppState,
    reader: &BlobReader,
    id: FileId,
) -> Result<Arc<FileRecord>, ImageServerErr> {
    if let Some(record) = shared_state.records.get(&id) {
        return Ok(record);
    }
    let record = reader
        .open(&id)
        .await
        .map_err(|e| ImageServerErr::from_blob("Error retrieving file", e))?;
    let record = Arc::new(record);
    shared_state.records.insert(id, record.clone());
    Ok(record)
}

#[get("/image/{id}")]
async fn download_image(
    req: HttpRequest,
    id: web::Path<String>,
    shared_state: Data<AppState>,
) -> Result<HttpResponse, ImageServerErr> {
    let ip = client_ip(&req);
    let raw_id = id.into_inner();
    let id: FileId = raw_id.parse().map_err(|_| {
        tracing::warn!(id = %raw_id, ip = %ip, "Invalid file id");
        ImageServerErr::InvalidId(raw_id.clone())
    })?;
    let store = shared_state.store.ready().inspect_err(|_| {
        tracing::warn!(%id, ip = %ip, "Store not ready");
    })?;
    let reader = BlobReader::new(store);

    let record = lookup_record(&shared_state, &reader, id).await.map_err(|err| {
        match err {
            ImageServerErr::NotFound => tracing::warn!(%id, ip = %ip, "File not found"),
            _ => tracing::error!(%id, ip = %ip, error = ?err, "record lookup failed"),
        }
        err
    })?;

    // nothing is sent until the first chunk is in hand, so a failure here is still a 500
    let mut chunks = Box::pin(reader.stream(record.clone()));
    let first = match chunks.next().await {
        Some(Ok(first)) => Some(first),
        Some(Err(e)) => {
            let err = ImageServerErr::from_blob("Error streaming file", e);
            tracing::error!(%id, ip = %ip, error = ?err, "download failed before first chunk");
            return Err(err);
        }
        None => None,
    };

    let total = record.chunk_count();
    let mut sent = 0;
    let body = stream::iter(first.map(Ok::<_, BlobError>))
        .chain(chunks)
        .inspect_ok(move |_| {
            sent += 1;
            if sent == total {
                tracing::info!(%id, ip = %ip, "File streamed");
            }
        })
        .inspect_err(move |e| {
            // the status line is already out, so the body is cut short
            tracing::error!(%id, error = %e, "download aborted mid-stream");
        });

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&record.original_name))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(record.original_name.clone())],
        })
        .body(SizedStream::new(record.size, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::configure;
    use crate::services::test_support::{app_state, memory_state, upload_request, CapturedLogs, CountingStore, Part};
    use actix_web::body::{self, BodySize, MessageBody};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use blob_store::{BlobWriter, ChunkId, ChunkStore};
    use bytes::Bytes;
    use chrono::Utc;
    use futures::stream;
    use std::convert::Infallible;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("cat.png"), "image/png");
        assert_eq!(content_type_for("CAT.PNG"), "image/png");
        assert_eq!(content_type_for("holiday.JPG"), "image/jpg");
        assert_eq!(content_type_for("holiday.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("party.tar.gif"), "image/gif");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
        assert_eq!(content_type_for("png"), "application/octet-stream");
    }

    #[actix_web::test]
    async fn test_download_streams_stored_file() {
        let (store, state) = memory_state(255 * 1024);
        let data: Vec<u8> = (0..600 * 1024).map(|i| (i % 251) as u8).collect();
        let chunk_size = NonZeroUsize::new(255 * 1024).unwrap();
        let record = BlobWriter::new(store.as_ref(), chunk_size)
            .write("cat.png", stream::iter([Ok::<_, Infallible>(Bytes::from(data.clone()))]))
            .await
            .unwrap();
        assert_eq!(record.size, 614400);
        assert_eq!(record.chunk_count(), 3);

        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::get().uri(&format!("/image/{}", record.id)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(resp.headers().get(header::CONTENT_DISPOSITION).unwrap(), "inline; filename=\"cat.png\"");
        assert_eq!(resp.response().body().size(), BodySize::Sized(614400));
        assert_eq!(test::read_body(resp).await, Bytes::from(data));
    }

    #[actix_web::test]
    async fn test_uploaded_file_downloads_from_cache() {
        let (store, state) = memory_state(3);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = upload_request(&[Part { name: "image", filename: Some("dog.gif"), data: b"woof woof" }]).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let calls_after_upload = store.calls();

        let req = test::TestRequest::get().uri(&format!("/image/{}", body["file"]["id"].as_str().unwrap())).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"woof woof"));
        // three chunk reads, no record lookup
        assert_eq!(store.calls(), calls_after_upload + 3);
    }

    #[actix_web::test]
    async fn test_unknown_id_is_not_found() {
        let (store, state) = memory_state(4);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri(&format!("/image/{}", FileId::generate())).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "File not found");
        // only the record lookup, no chunk reads
        assert_eq!(store.calls(), 1);
    }

    #[actix_web::test]
    async fn test_malformed_id_is_bad_request() {
        let (store, state) = memory_state(4);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/image/not-a-uuid").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.calls(), 0);
    }

    #[actix_web::test]
    async fn test_download_before_store_is_ready() {
        let state = app_state(None, 4, PathBuf::from("public"));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri(&format!("/image/{}", FileId::generate())).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    /// Stores a two-chunk `cat.png` record with only the chunks in `stored`.
    async fn partial_upload(store: &CountingStore, stored: &[u32]) -> FileId {
        let id = FileId::generate();
        for &index in stored {
            store.put_chunk(&ChunkId::new(id, index), Bytes::from_static(b"abcd")).await.unwrap();
        }
        store
            .put_record(&FileRecord {
                id,
                filename: "1-cat.png".to_string(),
                original_name: "cat.png".to_string(),
                upload_date: Utc::now(),
                size: 8,
                chunk_size: 4,
                chunks: vec![ChunkId::new(id, 0), ChunkId::new(id, 1)],
                sha256: String::new(),
            })
            .await
            .unwrap();
        id
    }

    #[actix_web::test]
    async fn test_missing_chunk_truncates_body() {
        let (store, state) = memory_state(4);
        let id = partial_upload(&store, &[0]).await;

        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::get().uri(&format!("/image/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body::to_bytes(resp.into_body()).await.is_err());
    }

    #[actix_web::test]
    async fn test_missing_first_chunk_is_server_error() {
        let (store, state) = memory_state(4);
        let id = partial_upload(&store, &[1]).await;

        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::get().uri(&format!("/image/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Error streaming file");
    }

    #[actix_web::test]
    async fn test_download_outcomes_are_logged() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let (store, state) = memory_state(4);
        let id = partial_upload(&store, &[0, 1]).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/image/{id}")).to_request()).await;
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"abcdabcd"));
        let missing = FileId::generate();
        test::call_service(&app, test::TestRequest::get().uri(&format!("/image/{missing}")).to_request()).await;

        let output = logs.contents();
        assert!(output.contains("File streamed"));
        assert!(output.contains(&id.to_string()));
        assert!(output.contains("File not found"));
        assert!(output.contains(&missing.to_string()));

        let not_ready = test::init_service(
            App::new().app_data(app_state(None, 4, PathBuf::from("public"))).configure(configure),
        )
        .await;
        test::call_service(&not_ready, test::TestRequest::get().uri(&format!("/image/{id}")).to_request()).await;
        assert!(logs.contents().contains("Store not ready"));
    }
}
