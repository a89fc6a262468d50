use std::collections::HashMap;

use parking_lot::Mutex;
use shardex_core::AbsPathBuf;

use crate::error::StorageError;
use crate::factory::ShardStorage;
use crate::shard::IndexShard;

/// A [`ShardStorage`] kept entirely in memory.
///
/// Every `load_shard` call is counted per path, which makes it convenient for
/// asserting how often a consumer hits storage.
#[derive(Debug, Default)]
pub struct MemoryShardStorage {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    shards: HashMap<AbsPathBuf, IndexShard>,
    loads: HashMap<AbsPathBuf, usize>,
}

impl MemoryShardStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source_file: AbsPathBuf, shard: IndexShard) {
        self.inner.lock().shards.insert(source_file, shard);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `load_shard` calls made for `source_file`, hits and misses alike.
    pub fn load_count(&self, source_file: &AbsPathBuf) -> usize {
        self.inner
            .lock()
            .loads
            .get(source_file)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.inner.lock().loads.values().sum()
    }

    pub fn reset_load_counts(&self) {
        self.inner.lock().loads.clear();
    }
}

impl ShardStorage for MemoryShardStorage {
    fn load_shard(&self, source_file: &AbsPathBuf) -> Option<IndexShard> {
        let mut inner = self.inner.lock();
        *inner.loads.entry(source_file.clone()).or_default() += 1;
        inner.shards.get(source_file).cloned()
    }

    fn store_shard(
        &self,
        source_file: &AbsPathBuf,
        shard: &IndexShard,
    ) -> Result<(), StorageError> {
        self.insert(source_file.clone(), shard.clone());
        Ok(())
    }
}
