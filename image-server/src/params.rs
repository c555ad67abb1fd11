use std::num::NonZeroUsize;
use std::path::PathBuf;

use blob_store::StoreUri;
use clap::Parser;

/// Every flag falls back to an environment variable (a `.env` file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(name = "image-server", about = "Upload images over HTTP into a chunked blob store")]
pub struct Args {
    /// `rocksdb://<path>`, `file://<dir>`, `memory:` or a bare RocksDB path
    #[clap(long, env = "STORE_URI", default_value = "rocksdb:///var/lib/image-store/uploads")]
    pub(crate) store_uri: StoreUri,
    #[clap(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub(crate) bind_addr: String,
    #[clap(long, env = "PORT", default_value_t = 3000)]
    pub(crate) port: u16,
    /// Bytes per stored chunk, 255 KiB by default
    #[clap(long, env = "CHUNK_SIZE", default_value = "261120")]
    pub(crate) chunk_size: NonZeroUsize,
    #[clap(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 60_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) rate_limit_window_ms: u64,
    /// Requests allowed per client address and window
    #[clap(long, env = "RATE_LIMIT_MAX", default_value_t = 100)]
    pub(crate) rate_limit_max: u32,
    #[clap(long, env = "PUBLIC_DIR", default_value = "public")]
    pub(crate) public_dir: PathBuf,
    #[clap(long, env = "LOG_FILE", default_value = "logs/app.log")]
    pub(crate) log_file: PathBuf,
    #[clap(long, env = "RECORD_CACHE_SIZE", default_value_t = 10_000)]
    pub(crate) record_cache_size: usize,
}
