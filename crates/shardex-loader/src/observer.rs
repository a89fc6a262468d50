use serde::Serialize;
use shardex_core::{AbsPathBuf, UriError};

use crate::shard::TombstoneReason;

/// Counters describing one loader run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub entry_files: usize,
    /// Files whose shard was requested from storage.
    pub fresh_loads: usize,
    /// Visits served from the loader's cache.
    pub cache_hits: usize,
    pub tombstones: usize,
    /// Shard references that could not be resolved to a path.
    pub skipped_references: usize,
}

/// Receives the loader's diagnostics.
///
/// Every method has a no-op default so implementations only pick what they
/// care about.
pub trait LoadObserver {
    fn shard_loaded(&mut self, _path: &AbsPathBuf, _edges: usize) {}

    fn shard_load_failed(&mut self, _path: &AbsPathBuf, _reason: TombstoneReason) {}

    fn reference_skipped(&mut self, _shard: &AbsPathBuf, _identifier: &str, _error: &UriError) {}

    fn finished(&mut self, _stats: &LoadStats) {}
}

impl<T: LoadObserver + ?Sized> LoadObserver for &mut T {
    fn shard_loaded(&mut self, path: &AbsPathBuf, edges: usize) {
        (**self).shard_loaded(path, edges);
    }

    fn shard_load_failed(&mut self, path: &AbsPathBuf, reason: TombstoneReason) {
        (**self).shard_load_failed(path, reason);
    }

    fn reference_skipped(&mut self, shard: &AbsPathBuf, identifier: &str, error: &UriError) {
        (**self).reference_skipped(shard, identifier, error);
    }

    fn finished(&mut self, stats: &LoadStats) {
        (**self).finished(stats);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl LoadObserver for NullObserver {}

/// Forwards diagnostics to `tracing` under the `shardex.loader` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn shard_loaded(&mut self, path: &AbsPathBuf, edges: usize) {
        tracing::trace!(target: "shardex.loader", path = %path, edges, "loaded shard");
    }

    fn shard_load_failed(&mut self, path: &AbsPathBuf, reason: TombstoneReason) {
        tracing::debug!(
            target: "shardex.loader",
            path = %path,
            reason = %reason,
            "failed to load shard"
        );
    }

    fn reference_skipped(&mut self, shard: &AbsPathBuf, identifier: &str, error: &UriError) {
        tracing::debug!(
            target: "shardex.loader",
            shard = %shard,
            identifier,
            error = %error,
            "skipping unresolvable shard reference"
        );
    }

    fn finished(&mut self, stats: &LoadStats) {
        tracing::debug!(
            target: "shardex.loader",
            entry_files = stats.entry_files,
            fresh_loads = stats.fresh_loads,
            cache_hits = stats.cache_hits,
            tombstones = stats.tombstones,
            skipped_references = stats.skipped_references,
            "finished loading shards"
        );
    }
}

/// A diagnostic captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Loaded {
        path: AbsPathBuf,
        edges: usize,
    },
    Failed {
        path: AbsPathBuf,
        reason: TombstoneReason,
    },
    ReferenceSkipped {
        shard: AbsPathBuf,
        identifier: String,
        error: UriError,
    },
    Finished(LoadStats),
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<LoadEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&AbsPathBuf, TombstoneReason)> {
        self.events.iter().filter_map(|event| match event {
            LoadEvent::Failed { path, reason } => Some((path, *reason)),
            _ => None,
        })
    }

    pub fn skipped_references(&self) -> impl Iterator<Item = (&AbsPathBuf, &str)> {
        self.events.iter().filter_map(|event| match event {
            LoadEvent::ReferenceSkipped {
                shard, identifier, ..
            } => Some((shard, identifier.as_str())),
            _ => None,
        })
    }
}

impl LoadObserver for RecordingObserver {
    fn shard_loaded(&mut self, path: &AbsPathBuf, edges: usize) {
        self.events.push(LoadEvent::Loaded {
            path: path.clone(),
            edges,
        });
    }

    fn shard_load_failed(&mut self, path: &AbsPathBuf, reason: TombstoneReason) {
        self.events.push(LoadEvent::Failed {
            path: path.clone(),
            reason,
        });
    }

    fn reference_skipped(&mut self, shard: &AbsPathBuf, identifier: &str, error: &UriError) {
        self.events.push(LoadEvent::ReferenceSkipped {
            shard: shard.clone(),
            identifier: identifier.to_string(),
            error: error.clone(),
        });
    }

    fn finished(&mut self, stats: &LoadStats) {
        self.events.push(LoadEvent::Finished(*stats));
    }
}
