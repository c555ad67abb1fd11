use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use blob_store::BlobError;
use serde::Serialize;
use thiserror::Error;


#[derive(Debug, Error)]
pub enum ImageServerErr {
    #[error("No file uploaded")]
    NoFileProvided,

    #[error("Invalid file id")]
    InvalidId(String),

    #[error("File not found")]
    NotFound,

    #[error("Store not ready")]
    StoreUnavailable,

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("Uploaded file is too large")]
    TooLarge,

    #[error("Malformed upload")]
    MalformedUpload(String),

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: BlobError,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ImageServerErr {
    /// Maps a blob failure to its user-facing error. `context` names the
    /// operation for storage failures.
    pub fn from_blob(context: &'static str, err: BlobError) -> Self {
        match err {
            BlobError::EmptyUpload => ImageServerErr::EmptyUpload,
            BlobError::NotFound(_) => ImageServerErr::NotFound,
            BlobError::TooManyChunks => ImageServerErr::TooLarge,
            BlobError::Stream(e) => ImageServerErr::MalformedUpload(e.to_string()),
            source => ImageServerErr::Storage { context, source },
        }
    }

    fn cause(&self) -> Option<String> {
        match self {
            ImageServerErr::InvalidId(id) => Some(format!("{id:?} is not a file id")),
            ImageServerErr::MalformedUpload(cause) => Some(cause.clone()),
            ImageServerErr::Storage { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

impl ResponseError for ImageServerErr {
    fn status_code(&self) -> StatusCode {
        match self {
            ImageServerErr::NoFileProvided
            | ImageServerErr::InvalidId(_)
            | ImageServerErr::EmptyUpload
            | ImageServerErr::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            ImageServerErr::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ImageServerErr::NotFound => StatusCode::NOT_FOUND,
            ImageServerErr::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ImageServerErr::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
            error: self.cause(),
        })
    }
}
