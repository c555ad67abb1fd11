use actix_web::{web, HttpRequest};

pub mod download_service;
pub mod index_service;
pub mod upload_service;

#[cfg(test)]
pub(crate) mod test_support;

pub const APP_TYPE_JSON: &str = "application/json";

/// Client address for log events, honouring `Forwarded`/`X-Forwarded-For`.
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    req.connection_info().realip_remote_addr().unwrap_or("unknown").to_string()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_service::upload_image)
        .service(download_service::download_image)
        .service(index_service::index);
}
