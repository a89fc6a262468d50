//! Multi-root loading of persisted index shards.
//!
//! Given the translation-unit entry files of a batch, [`load_index_shards`]
//! walks each entry file's include graph through the shards recorded in shard
//! storage and returns one [`LoadedShard`] per reachable file. Files shared by
//! several entry files are loaded once and attributed to the entry file whose
//! walk visited them last.
//!
//! The walk only expands a file's dependencies the first time the file is
//! loaded. A later entry file that reaches an already loaded file claims it but
//! does not re-walk what lies behind it, so storage is read at most once per
//! file and per batch.

mod cache;
mod loader;
mod observer;
mod shard;

pub use loader::{load_index_shards, ShardLoader};
pub use observer::{
    LoadEvent, LoadObserver, LoadStats, NullObserver, RecordingObserver, TracingObserver,
};
pub use shard::{LoadedShard, ShardState, TombstoneReason};
