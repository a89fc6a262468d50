use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use shardex_core::AbsPathBuf;

use crate::config::StorageConfig;
use crate::disk::DiskShardStorage;
use crate::error::StorageError;
use crate::shard::IndexShard;

/// A backend that can read and write shards.
pub trait ShardStorage: Send + Sync {
    /// Load the shard persisted for `source_file`.
    ///
    /// Returns `None` when no shard exists or it cannot be read; implementations
    /// must not panic on missing or corrupt data.
    fn load_shard(&self, source_file: &AbsPathBuf) -> Option<IndexShard>;

    fn store_shard(&self, source_file: &AbsPathBuf, shard: &IndexShard)
        -> Result<(), StorageError>;
}

/// Picks the [`ShardStorage`] responsible for a file.
///
/// Called once per distinct file during a load, so implementations should be
/// cheap to call repeatedly.
pub trait ShardStorageFactory {
    fn storage_for(&self, file: &AbsPathBuf) -> Arc<dyn ShardStorage>;
}

/// A single storage serving every file.
impl<T: ShardStorage + 'static> ShardStorageFactory for Arc<T> {
    fn storage_for(&self, _file: &AbsPathBuf) -> Arc<dyn ShardStorage> {
        self.clone()
    }
}

/// Routes each file to the [`DiskShardStorage`] of the deepest project root
/// containing it, or to a shared fallback directory.
#[derive(Debug)]
pub struct DiskStorageFactory {
    /// Sorted deepest first.
    roots: Vec<AbsPathBuf>,
    fallback: Arc<DiskShardStorage>,
    storages: Mutex<HashMap<AbsPathBuf, Arc<DiskShardStorage>>>,
}

impl DiskStorageFactory {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let fallback_dir = config.fallback_shard_dir()?;
        Ok(Self::with_fallback_dir(
            config.project_roots.iter().cloned(),
            fallback_dir,
        ))
    }

    pub fn with_fallback_dir(
        roots: impl IntoIterator<Item = AbsPathBuf>,
        fallback_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut roots: Vec<_> = roots.into_iter().collect();
        roots.sort_by(|a, b| {
            let depth = |root: &AbsPathBuf| root.as_path().components().count();
            depth(b).cmp(&depth(a)).then_with(|| a.cmp(b))
        });
        roots.dedup();
        Self {
            roots,
            fallback: Arc::new(DiskShardStorage::in_dir(fallback_dir)),
            storages: Mutex::new(HashMap::new()),
        }
    }

    /// The project root owning `file`, if any.
    pub fn project_root_for(&self, file: &AbsPathBuf) -> Option<&AbsPathBuf> {
        self.roots.iter().find(|root| file.starts_with(root))
    }

    pub fn disk_storage_for(&self, file: &AbsPathBuf) -> Arc<DiskShardStorage> {
        let Some(root) = self.project_root_for(file) else {
            return self.fallback.clone();
        };

        let mut storages = self.storages.lock();
        storages
            .entry(root.clone())
            .or_insert_with(|| {
                tracing::debug!(
                    target: "shardex.storage",
                    root = %root,
                    "opening project shard storage"
                );
                Arc::new(DiskShardStorage::for_project(root))
            })
            .clone()
    }
}

impl ShardStorageFactory for DiskStorageFactory {
    fn storage_for(&self, file: &AbsPathBuf) -> Arc<dyn ShardStorage> {
        self.disk_storage_for(file)
    }
}
