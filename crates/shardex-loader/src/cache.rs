use indexmap::IndexSet;
use shardex_core::{AbsPathBuf, SourceResolver};
use shardex_storage::{ShardStorageFactory, SourceFlags};

use crate::observer::LoadObserver;
use crate::shard::{ShardState, TombstoneReason};

/// Index of an interned path in a [`ShardCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PathId(u32);

impl PathId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub(crate) state: ShardState,
    pub(crate) count_references: bool,
    pub(crate) had_errors: bool,
    pub(crate) dependencies: usize,
}

impl CacheEntry {
    fn tombstone(reason: TombstoneReason) -> Self {
        Self {
            state: ShardState::Tombstone(reason),
            count_references: false,
            had_errors: false,
            dependencies: 0,
        }
    }

    pub(crate) fn is_tombstone(&self) -> bool {
        matches!(self.state, ShardState::Tombstone(_))
    }
}

/// Result of visiting a path.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Visit {
    /// Already loaded earlier in this run; edges are not recomputed.
    Cached,
    /// Loaded just now (possibly into a tombstone).
    Fresh { edges: Vec<PathId> },
}

/// Memoizes one shard per path for the duration of a loader run.
///
/// The cache is the only owner of path data: every path ever discovered is
/// interned once and referred to by [`PathId`] everywhere else.
pub(crate) struct ShardCache<'a> {
    paths: IndexSet<AbsPathBuf>,
    /// Parallel to `paths`; `None` until the path is visited.
    entries: Vec<Option<CacheEntry>>,
    factory: &'a dyn ShardStorageFactory,
    resolver: Box<dyn SourceResolver + 'a>,
    skipped_references: usize,
}

impl<'a> ShardCache<'a> {
    pub(crate) fn new(
        factory: &'a dyn ShardStorageFactory,
        resolver: Box<dyn SourceResolver + 'a>,
    ) -> Self {
        Self {
            paths: IndexSet::new(),
            entries: Vec::new(),
            factory,
            resolver,
            skipped_references: 0,
        }
    }

    pub(crate) fn set_resolver(&mut self, resolver: Box<dyn SourceResolver + 'a>) {
        self.resolver = resolver;
    }

    pub(crate) fn intern(&mut self, path: AbsPathBuf) -> PathId {
        let (index, inserted) = self.paths.insert_full(path);
        if inserted {
            self.entries.push(None);
        }
        let Ok(raw) = u32::try_from(index) else {
            panic!("shard cache cannot intern more than {} paths", u32::MAX);
        };
        PathId(raw)
    }

    pub(crate) fn path(&self, id: PathId) -> &AbsPathBuf {
        &self.paths[id.index()]
    }

    pub(crate) fn skipped_references(&self) -> usize {
        self.skipped_references
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().flatten()
    }

    /// Return the cached entry for `id`, or load it from storage.
    ///
    /// A path is loaded at most once: failed loads leave a tombstone that later
    /// visits hit like any other entry.
    pub(crate) fn lookup_or_load(&mut self, id: PathId, observer: &mut dyn LoadObserver) -> Visit {
        if self.entries[id.index()].is_some() {
            return Visit::Cached;
        }

        let loaded = load_entry(
            self.factory,
            &*self.resolver,
            &self.paths[id.index()],
            observer,
        );
        self.skipped_references += loaded.skipped_references;
        self.entries[id.index()] = Some(loaded.entry);

        let edges = loaded
            .edges
            .into_iter()
            .map(|edge| self.intern(edge))
            .collect();
        Visit::Fresh { edges }
    }

    pub(crate) fn into_parts(self) -> (Vec<AbsPathBuf>, Vec<Option<CacheEntry>>) {
        (self.paths.into_iter().collect(), self.entries)
    }
}

struct LoadedEntry {
    entry: CacheEntry,
    edges: Vec<AbsPathBuf>,
    skipped_references: usize,
}

fn load_entry(
    factory: &dyn ShardStorageFactory,
    resolver: &dyn SourceResolver,
    path: &AbsPathBuf,
    observer: &mut dyn LoadObserver,
) -> LoadedEntry {
    let storage = factory.storage_for(path);
    let Some(shard) = storage.load_shard(path) else {
        return tombstone(path, observer, TombstoneReason::NotFound, 0);
    };
    let Some(sources) = shard.sources.as_ref() else {
        return tombstone(path, observer, TombstoneReason::MissingIncludeGraph, 0);
    };

    let mut edges = Vec::new();
    let mut own_node = None;
    let mut skipped_references = 0;
    for (identifier, node) in sources {
        let resolved = match resolver.resolve_source(identifier, path) {
            Ok(resolved) => resolved,
            Err(err) => {
                skipped_references += 1;
                observer.reference_skipped(path, identifier, &err);
                continue;
            }
        };
        // The shard's own source carries its metadata; everything else is a
        // dependency.
        if resolved == *path {
            own_node = Some((node.digest, node.flags));
        } else {
            edges.push(resolved);
        }
    }

    let Some((digest, flags)) = own_node else {
        return tombstone(
            path,
            observer,
            TombstoneReason::MissingSelfEntry,
            skipped_references,
        );
    };
    if digest.is_zero() {
        return tombstone(
            path,
            observer,
            TombstoneReason::EmptyDigest,
            skipped_references,
        );
    }

    observer.shard_loaded(path, edges.len());
    LoadedEntry {
        entry: CacheEntry {
            state: ShardState::Loaded { shard, digest },
            count_references: flags.contains(SourceFlags::IS_TU),
            had_errors: flags.contains(SourceFlags::HAD_ERRORS),
            dependencies: edges.len(),
        },
        edges,
        skipped_references,
    }
}

fn tombstone(
    path: &AbsPathBuf,
    observer: &mut dyn LoadObserver,
    reason: TombstoneReason,
    skipped_references: usize,
) -> LoadedEntry {
    observer.shard_load_failed(path, reason);
    LoadedEntry {
        entry: CacheEntry::tombstone(reason),
        edges: Vec::new(),
        skipped_references,
    }
}
