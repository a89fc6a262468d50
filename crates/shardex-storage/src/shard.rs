use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use shardex_core::FileDigest;

/// Per-source flags recorded in an include graph node.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFlags(u8);

impl SourceFlags {
    pub const NONE: SourceFlags = SourceFlags(0);
    /// The source was the main file of a translation unit.
    pub const IS_TU: SourceFlags = SourceFlags(1 << 0);
    /// Compiling the translation unit reported errors.
    pub const HAD_ERRORS: SourceFlags = SourceFlags(1 << 1);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: SourceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: SourceFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for SourceFlags {
    type Output = SourceFlags;

    fn bitor(self, rhs: SourceFlags) -> SourceFlags {
        SourceFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SourceFlags {
    fn bitor_assign(&mut self, rhs: SourceFlags) {
        self.insert(rhs);
    }
}

impl fmt::Debug for SourceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::IS_TU) {
            names.push("IS_TU");
        }
        if self.contains(Self::HAD_ERRORS) {
            names.push("HAD_ERRORS");
        }
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

/// One source file referenced while producing a shard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeGraphNode {
    /// Content digest of the source at indexing time.
    pub digest: FileDigest,
    pub flags: SourceFlags,
    /// Identifiers of the sources this one includes directly.
    #[serde(default)]
    pub direct_includes: Vec<String>,
}

impl IncludeGraphNode {
    pub fn new(digest: FileDigest, flags: SourceFlags) -> Self {
        Self {
            digest,
            flags,
            direct_includes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.direct_includes
            .extend(includes.into_iter().map(Into::into));
        self
    }
}

/// Source identifier (a URI string) to node.
pub type IncludeGraph = BTreeMap<String, IncludeGraphNode>;

/// The persisted index fragment for one source file.
///
/// `payload` is the serialized symbol data; storage and loading never look
/// inside it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexShard {
    /// `None` for shards written before the include graph was recorded.
    pub sources: Option<IncludeGraph>,
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl IndexShard {
    /// A shard with an empty include graph.
    pub fn new() -> Self {
        Self {
            sources: Some(IncludeGraph::new()),
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, identifier: impl Into<String>, node: IncludeGraphNode) -> Self {
        self.sources
            .get_or_insert_with(IncludeGraph::new)
            .insert(identifier.into(), node);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}
