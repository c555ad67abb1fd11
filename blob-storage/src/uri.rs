use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::StoreError;

/// Where the chunk store lives, parsed from a connection string.
///
/// `rocksdb:///abs/path`, `rocksdb://rel/path`, `file:///abs/dir` and `memory:`
/// are understood; a bare path is taken as a RocksDB path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUri {
    RocksDb(PathBuf),
    Local(PathBuf),
    Memory,
}

fn invalid(uri: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidUri { uri: uri.to_string(), reason: reason.into() }
}

/// Host and path together; `scheme://data/x` names the relative path `data/x`.
fn url_path(uri: &str, url: &Url) -> Result<PathBuf, StoreError> {
    let path = match url.host_str() {
        Some(host) if !host.is_empty() => format!("{host}{}", url.path()),
        _ => url.path().to_string(),
    };
    if path.is_empty() {
        return Err(invalid(uri, "missing path"));
    }
    Ok(PathBuf::from(path))
}

impl FromStr for StoreUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Url::parse(s) {
            Ok(url) => match url.scheme() {
                "rocksdb" => Ok(StoreUri::RocksDb(url_path(s, &url)?)),
                "file" => Ok(StoreUri::Local(url_path(s, &url)?)),
                "memory" => Ok(StoreUri::Memory),
                other => Err(invalid(s, format!("unsupported scheme {other}"))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) if !s.is_empty() => Ok(StoreUri::RocksDb(PathBuf::from(s))),
            Err(e) => Err(invalid(s, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_uris() {
        assert_eq!(
            "rocksdb:///var/lib/image-store".parse::<StoreUri>().unwrap(),
            StoreUri::RocksDb(PathBuf::from("/var/lib/image-store"))
        );
        assert_eq!(
            "rocksdb://data/uploads".parse::<StoreUri>().unwrap(),
            StoreUri::RocksDb(PathBuf::from("data/uploads"))
        );
        assert_eq!(
            "file:///tmp/chunks".parse::<StoreUri>().unwrap(),
            StoreUri::Local(PathBuf::from("/tmp/chunks"))
        );
        assert_eq!("memory:".parse::<StoreUri>().unwrap(), StoreUri::Memory);
        assert_eq!(
            "uploads.db".parse::<StoreUri>().unwrap(),
            StoreUri::RocksDb(PathBuf::from("uploads.db"))
        );
    }

    #[test]
    fn test_reject_bad_store_uris() {
        assert!(matches!("mongodb://localhost/uploads".parse::<StoreUri>(), Err(StoreError::InvalidUri { .. })));
        assert!("rocksdb:".parse::<StoreUri>().is_err());
        assert!("".parse::<StoreUri>().is_err());
    }
}
