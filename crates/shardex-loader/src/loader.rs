use std::collections::{HashSet, VecDeque};

use shardex_core::{AbsPathBuf, SourceResolver, UriResolver};
use shardex_storage::ShardStorageFactory;

use crate::cache::{PathId, ShardCache, Visit};
use crate::observer::{LoadObserver, LoadStats, TracingObserver};
use crate::shard::LoadedShard;

/// Load the shards of `entry_files` and of everything they depend on.
///
/// Entry files are walked in order; a file reachable from several entry files
/// is attributed to the last of them. Missing or unreadable shards show up as
/// tombstones in the result rather than as errors.
pub fn load_index_shards(
    entry_files: &[AbsPathBuf],
    factory: &dyn ShardStorageFactory,
) -> Vec<LoadedShard> {
    let mut loader = ShardLoader::new(factory);
    for entry_file in entry_files {
        loader.load(entry_file);
    }
    loader.finish()
}

/// Incrementally loads the shards reachable from a sequence of entry files.
///
/// One loader serves a single batch: call [`ShardLoader::load`] once per entry
/// file, then [`ShardLoader::finish`] to collect the shards.
pub struct ShardLoader<'a> {
    cache: ShardCache<'a>,
    /// Indexed by [`PathId`]: the entry file that last visited each path.
    owners: Vec<Option<PathId>>,
    observer: Box<dyn LoadObserver + 'a>,
    entry_files: usize,
    fresh_loads: usize,
    cache_hits: usize,
}

impl<'a> ShardLoader<'a> {
    /// A loader resolving `file:` identifiers and logging through `tracing`.
    pub fn new(factory: &'a dyn ShardStorageFactory) -> Self {
        Self {
            cache: ShardCache::new(factory, Box::new(UriResolver::default())),
            owners: Vec::new(),
            observer: Box::new(TracingObserver),
            entry_files: 0,
            fresh_loads: 0,
            cache_hits: 0,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl SourceResolver + 'a) -> Self {
        self.cache.set_resolver(Box::new(resolver));
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl LoadObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Walk the include graph of `entry_file`, loading every shard not seen
    /// before in this batch.
    ///
    /// Files already loaded by an earlier call are claimed for `entry_file` but
    /// their dependencies are not walked again.
    pub fn load(&mut self, entry_file: &AbsPathBuf) {
        self.entry_files += 1;
        let entry = self.cache.intern(entry_file.clone());

        let mut queued: HashSet<PathId> = HashSet::from([entry]);
        let mut to_visit: VecDeque<PathId> = VecDeque::from([entry]);

        while let Some(source) = to_visit.pop_front() {
            let visit = self.cache.lookup_or_load(source, &mut *self.observer);
            self.set_owner(source, entry);

            let Visit::Fresh { edges } = visit else {
                self.cache_hits += 1;
                continue;
            };
            self.fresh_loads += 1;
            for edge in edges {
                if queued.insert(edge) {
                    to_visit.push_back(edge);
                }
            }
        }
    }

    fn set_owner(&mut self, path: PathId, entry: PathId) {
        let index = path.index();
        if self.owners.len() <= index {
            self.owners.resize(index + 1, None);
        }
        self.owners[index] = Some(entry);
    }

    pub fn stats(&self) -> LoadStats {
        LoadStats {
            entry_files: self.entry_files,
            fresh_loads: self.fresh_loads,
            cache_hits: self.cache_hits,
            tombstones: self
                .cache
                .entries()
                .filter(|entry| entry.is_tombstone())
                .count(),
            skipped_references: self.cache.skipped_references(),
        }
    }

    /// Consume the loader and return one [`LoadedShard`] per visited file, in
    /// discovery order.
    ///
    /// # Panics
    ///
    /// If a loaded file was never claimed by an entry file. Every visit records
    /// an owner, so this indicates a bug in the loader itself.
    pub fn finish(mut self) -> Vec<LoadedShard> {
        let stats = self.stats();
        self.observer.finished(&stats);

        let owners = std::mem::take(&mut self.owners);
        let (paths, entries) = self.cache.into_parts();

        let mut result = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let Some(entry) = entry else {
                continue;
            };
            let absolute_path = paths[index].clone();
            let Some(owner) = owners.get(index).copied().flatten() else {
                panic!("no entry file registered for shard {absolute_path}");
            };
            result.push(LoadedShard {
                absolute_path,
                state: entry.state,
                count_references: entry.count_references,
                had_errors: entry.had_errors,
                dependencies: entry.dependencies,
                dependent_tu: paths[owner.index()].clone(),
            });
        }
        result
    }
}
