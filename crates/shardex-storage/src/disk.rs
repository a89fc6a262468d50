use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shardex_core::AbsPathBuf;

use crate::error::StorageError;
use crate::factory::ShardStorage;
use crate::shard::IndexShard;
use crate::util::{
    atomic_write, bincode_deserialize, bincode_serialize, read_file_limited,
    SHARD_PAYLOAD_LIMIT_BYTES,
};

const SHARD_FILE_MAGIC: [u8; 8] = *b"SHRDXIDX";
const SHARD_FILE_FORMAT_VERSION: u32 = 1;

/// Shard directory relative to a project root.
pub const SHARD_DIR: &str = ".cache/shardex/index";

#[derive(Debug, Serialize)]
struct ShardFile<'a> {
    magic: [u8; 8],
    format_version: u32,
    /// The source path the shard was written for; guards against hash collisions
    /// in the file name.
    source: &'a str,
    payload: &'a IndexShard,
}

#[derive(Debug, Deserialize)]
struct ShardFileOwned {
    magic: [u8; 8],
    format_version: u32,
    source: String,
    payload: IndexShard,
}

/// File name of the shard persisted for `source_file`.
///
/// The file name keeps the source's own name for debuggability and appends a
/// hash of the full path so equally named files in different directories do
/// not collide.
pub fn shard_file_name(source_file: &AbsPathBuf) -> String {
    let hash = blake3::hash(source_file.as_path().to_string_lossy().as_bytes());
    let name = source_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    format!("{name}.{}.idx", hex::encode(&hash.as_bytes()[..8]))
}

/// Shards stored as individual files in one directory.
#[derive(Clone, Debug)]
pub struct DiskShardStorage {
    shard_dir: PathBuf,
}

impl DiskShardStorage {
    /// Storage for the project rooted at `project_root`.
    pub fn for_project(project_root: &AbsPathBuf) -> Self {
        Self::in_dir(project_root.as_path().join(SHARD_DIR))
    }

    pub fn in_dir(shard_dir: impl Into<PathBuf>) -> Self {
        Self {
            shard_dir: shard_dir.into(),
        }
    }

    pub fn shard_dir(&self) -> &Path {
        &self.shard_dir
    }

    pub fn shard_path(&self, source_file: &AbsPathBuf) -> PathBuf {
        self.shard_dir.join(shard_file_name(source_file))
    }

    /// Decode a shard file without checking which source it belongs to.
    pub fn read_shard_file(path: &Path) -> Option<(String, IndexShard)> {
        let bytes = read_file_limited(path)?;
        let file = decode_shard_file(path, &bytes)?;
        Some((file.source, file.payload))
    }
}

fn decode_shard_file(path: &Path, bytes: &[u8]) -> Option<ShardFileOwned> {
    let file = match bincode_deserialize::<ShardFileOwned>(bytes) {
        Ok(file) => file,
        Err(err) => {
            emit_shard_diagnostic(path, format_args!("failed to decode shard file: {err}"));
            return None;
        }
    };

    if file.magic != SHARD_FILE_MAGIC {
        emit_shard_diagnostic(path, format_args!("not a shard file (bad magic)"));
        return None;
    }

    if file.format_version != SHARD_FILE_FORMAT_VERSION {
        emit_shard_diagnostic(
            path,
            format_args!(
                "unsupported shard format version: expected {SHARD_FILE_FORMAT_VERSION}, found {}",
                file.format_version
            ),
        );
        return None;
    }

    Some(file)
}

impl ShardStorage for DiskShardStorage {
    fn load_shard(&self, source_file: &AbsPathBuf) -> Option<IndexShard> {
        let path = self.shard_path(source_file);
        let bytes = read_file_limited(&path)?;
        let file = decode_shard_file(&path, &bytes)?;

        let expected = source_file.as_path().to_string_lossy();
        if file.source != expected {
            emit_shard_diagnostic(
                &path,
                format_args!(
                    "shard source mismatch: requested {expected}, found {}",
                    file.source
                ),
            );
            return None;
        }

        Some(file.payload)
    }

    fn store_shard(
        &self,
        source_file: &AbsPathBuf,
        shard: &IndexShard,
    ) -> Result<(), StorageError> {
        let path = self.shard_path(source_file);
        let source = source_file.as_path().to_string_lossy();
        let file = ShardFile {
            magic: SHARD_FILE_MAGIC,
            format_version: SHARD_FILE_FORMAT_VERSION,
            source: source.as_ref(),
            payload: shard,
        };
        let bytes = bincode_serialize(&file)?;
        if bytes.len() > SHARD_PAYLOAD_LIMIT_BYTES {
            return Err(StorageError::PayloadTooLarge {
                path,
                len: bytes.len(),
                limit: SHARD_PAYLOAD_LIMIT_BYTES,
            });
        }
        atomic_write(&path, &bytes)?;
        tracing::trace!(
            target: "shardex.storage",
            source = %source_file,
            path = %path.display(),
            bytes = bytes.len(),
            "stored shard"
        );
        Ok(())
    }
}

fn emit_shard_diagnostic(path: &Path, message: std::fmt::Arguments<'_>) {
    tracing::warn!(
        target: "shardex.storage",
        path = %path.display(),
        "shard cache miss: {message}"
    );
}
