mod errors;
mod logging;
mod params;
mod rate_limit;
mod services;
mod state;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use dotenv::dotenv;

use crate::params::Args;
use crate::rate_limit::{limit_requests, purge_periodically, RateLimiter};
use crate::state::{connect_store, AppState, StoreHandle};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    logging::init_logging(&args.log_file)?;

    let store = StoreHandle::default();
    let uri = args.store_uri.clone();
    let handle = store.clone();
    // start listening right away; requests get 503 until the store is installed
    actix_web::rt::spawn(async move {
        if let Err(e) = connect_store(&uri, &handle).await {
            tracing::error!(?uri, error = %e, "could not open store");
            process::exit(1);
        }
    });

    let limiter = Arc::new(RateLimiter::new(
        Duration::from_millis(args.rate_limit_window_ms),
        args.rate_limit_max,
    ));
    actix_web::rt::spawn(purge_periodically(limiter.clone()));
    let limiter = web::Data::from(limiter);

    let shared_state = web::Data::new(AppState::new(
        store,
        args.chunk_size,
        args.record_cache_size,
        args.public_dir.clone(),
    ));

    tracing::info!(bind = %args.bind_addr, port = args.port, "Server running");
    HttpServer::new(move || {
        App::new()
            .app_data(shared_state.clone())
            .app_data(limiter.clone())
            .wrap(from_fn(limit_requests))
            .configure(services::configure)
    })
    .bind((args.bind_addr.as_str(), args.port))?
    .run()
    .await
}
