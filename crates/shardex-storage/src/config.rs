use crate::error::StorageError;
use shardex_core::AbsPathBuf;
use std::path::PathBuf;

/// Configuration for locating shard directories.
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    /// Project roots; each gets its own `.cache/shardex/index` directory.
    pub project_roots: Vec<AbsPathBuf>,
    /// Override the global cache directory used for files outside every
    /// project root.
    pub cache_root_override: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory holding shards for files outside every project root.
    pub fn fallback_shard_dir(&self) -> Result<PathBuf, StorageError> {
        let base = match &self.cache_root_override {
            Some(root) => root.clone(),
            None => default_cache_root()?,
        };
        Ok(base.join("index"))
    }
}

pub(crate) fn default_cache_root() -> Result<PathBuf, StorageError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(StorageError::MissingHomeDir)?;

    Ok(home.join(".shardex").join("cache"))
}
