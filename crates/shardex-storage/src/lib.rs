//! Persistent storage for per-file index shards.
//!
//! A shard holds the index data produced for one source file plus the include
//! graph of everything that file referenced when it was indexed. The loader in
//! `shardex-loader` only reads shards through the [`ShardStorage`] and
//! [`ShardStorageFactory`] traits; this crate provides the implementations.
//!
//! ## On-disk layout
//!
//! Project-scoped shards live under `<project_root>/.cache/shardex/index/`:
//! - `<file name>.<path hash>.idx`: one [`IndexShard`] per source file, wrapped
//!   in a versioned, self-describing `bincode` envelope
//!
//! Files outside every configured project root share a fallback directory under
//! `<cache_root>/index/` (see [`StorageConfig`]).

mod config;
mod disk;
mod error;
mod factory;
mod memory;
mod shard;
mod util;

pub use config::StorageConfig;
pub use disk::{shard_file_name, DiskShardStorage, SHARD_DIR};
pub use error::StorageError;
pub use factory::{DiskStorageFactory, ShardStorage, ShardStorageFactory};
pub use memory::MemoryShardStorage;
pub use shard::{IncludeGraph, IncludeGraphNode, IndexShard, SourceFlags};
pub use util::{atomic_write, SHARD_PAYLOAD_LIMIT_BYTES};

pub type Result<T> = std::result::Result<T, StorageError>;
