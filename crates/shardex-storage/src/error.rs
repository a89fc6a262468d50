use std::path::PathBuf;

/// Errors produced while persisting shards.
///
/// Reading never produces these: an unreadable shard is a cache miss.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("shard payload for {path} is too large: {len} bytes (limit {limit} bytes)")]
    PayloadTooLarge {
        path: PathBuf,
        len: usize,
        limit: usize,
    },
}
