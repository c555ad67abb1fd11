use std::io::ErrorKind;

use actix_web::web::Data;
use actix_web::{get, HttpRequest, HttpResponse};

use crate::services::client_ip;
use crate::state::AppState;

#[get("/")]
async fn index(req: HttpRequest, shared_state: Data<AppState>) -> actix_web::Result<HttpResponse> {
    tracing::info!(ip = %client_ip(&req), "GET / accessed");
    let path = shared_state.public_dir.join("index.html");
    match tokio::fs::read(&path).await {
        Ok(page) => Ok(HttpResponse::Ok().content_type(mime::TEXT_HTML_UTF_8).body(page)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HttpResponse::NotFound().finish()),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read index page");
            Err(actix_web::error::ErrorInternalServerError("Could not read index page"))
        }
    }
}
