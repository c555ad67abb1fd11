use std::io;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::web::Data;
use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse};
use blob_store::{BlobWriter, FileId, FileRecord};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;

use crate::errors::ImageServerErr;
use crate::services::{client_ip, APP_TYPE_JSON};
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "image";

#[derive(Serialize)]
struct UploadResponse<'a> {
    message: &'static str,
    file: UploadedFile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile<'a> {
    filename: &'a str,
    original_name: &'a str,
    upload_date: DateTime<Utc>,
    size: u64,
    id: FileId,
}

impl<'a> From<&'a FileRecord> for UploadedFile<'a> {
    fn from(record: &'a FileRecord) -> Self {
        Self {
            filename: &record.filename,
            original_name: &record.original_name,
            upload_date: record.upload_date,
            size: record.size,
            id: record.id,
        }
    }
}

fn is_form_data(req: &HttpRequest) -> bool {
    match req.mime_type() {
        Ok(Some(content_type)) => content_type.type_() == mime::MULTIPART && content_type.subtype() == mime::FORM_DATA,
        _ => false,
    }
}

#[post("/upload")]
async fn upload_image(
    req: HttpRequest,
    payload: web::Payload,
    shared_state: Data<AppState>,
) -> Result<HttpResponse, ImageServerErr> {
    let ip = client_ip(&req);
    if !is_form_data(&req) {
        tracing::warn!(ip = %ip, "No file uploaded");
        return Err(ImageServerErr::NoFileProvided);
    }
    let mut multipart = Multipart::new(req.headers(), payload);

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| ImageServerErr::MalformedUpload(e.to_string()))?;
        let filename = match (field.name(), field.content_disposition().and_then(|cd| cd.get_filename())) {
            (Some(FILE_FIELD), Some(filename)) if !filename.is_empty() => Some(filename.to_string()),
            _ => None,
        };
        let Some(original_name) = filename else {
            // not the file; drain it so the next part can be read
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ImageServerErr::MalformedUpload(e.to_string()))?;
            }
            continue;
        };

        let store = shared_state.store.ready().inspect_err(|_| {
            tracing::warn!(filename = %original_name, ip = %ip, "Store not ready");
        })?;
        let bytes = field.map_err(|e| io::Error::other(e.to_string()));
        let record = BlobWriter::new(store.as_ref(), shared_state.chunk_size)
            .write(&original_name, bytes)
            .await
            .map_err(|e| {
                let err = ImageServerErr::from_blob("Error uploading file", e);
                tracing::error!(filename = %original_name, ip = %ip, error = ?err, "upload failed");
                err
            })?;

        tracing::info!(id = %record.id, filename = %record.filename, size = record.size, ip = %ip, "File uploaded");
        let response = HttpResponse::Ok().content_type(APP_TYPE_JSON).json(UploadResponse {
            message: "Image uploaded successfully",
            file: UploadedFile::from(&record),
        });
        shared_state.records.insert(record.id, Arc::new(record));
        return Ok(response);
    }

    tracing::warn!(ip = %ip, "No file uploaded");
    Err(ImageServerErr::NoFileProvided)
}
