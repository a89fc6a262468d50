use std::fmt;

use serde::Serialize;
use shardex_core::{AbsPathBuf, FileDigest};
use shardex_storage::IndexShard;

/// Why a file ended up without a usable shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TombstoneReason {
    /// Storage has no readable shard for the file.
    NotFound,
    /// The shard predates include graph recording.
    MissingIncludeGraph,
    /// None of the shard's sources resolves to the file itself.
    MissingSelfEntry,
    /// The shard's own source entry carries the all-zero digest.
    EmptyDigest,
}

impl fmt::Display for TombstoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TombstoneReason::NotFound => "no shard found",
            TombstoneReason::MissingIncludeGraph => "shard has no include graph",
            TombstoneReason::MissingSelfEntry => "shard has no entry for its own source",
            TombstoneReason::EmptyDigest => "shard digest is empty",
        })
    }
}

/// The outcome of loading one file's shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardState {
    Loaded {
        shard: IndexShard,
        /// Never [`FileDigest::ZERO`].
        digest: FileDigest,
    },
    /// Loading failed. The file still occupies its slot so it is not retried.
    Tombstone(TombstoneReason),
}

/// A shard (or the record of a failed load) for one file reachable from an
/// entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedShard {
    pub absolute_path: AbsPathBuf,
    pub state: ShardState,
    /// The file was indexed as the main file of a translation unit.
    pub count_references: bool,
    pub had_errors: bool,
    /// Resolved references to other files. Identifiers that failed to resolve
    /// and the shard's own source are not counted. Zero for tombstones.
    pub dependencies: usize,
    /// The entry file this shard is attributed to.
    pub dependent_tu: AbsPathBuf,
}

impl LoadedShard {
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ShardState::Loaded { .. })
    }

    pub fn shard(&self) -> Option<&IndexShard> {
        match &self.state {
            ShardState::Loaded { shard, .. } => Some(shard),
            ShardState::Tombstone(_) => None,
        }
    }

    pub fn digest(&self) -> Option<FileDigest> {
        match &self.state {
            ShardState::Loaded { digest, .. } => Some(*digest),
            ShardState::Tombstone(_) => None,
        }
    }

    pub fn tombstone_reason(&self) -> Option<TombstoneReason> {
        match &self.state {
            ShardState::Loaded { .. } => None,
            ShardState::Tombstone(reason) => Some(*reason),
        }
    }

    pub fn into_shard(self) -> Option<IndexShard> {
        match self.state {
            ShardState::Loaded { shard, .. } => Some(shard),
            ShardState::Tombstone(_) => None,
        }
    }
}
