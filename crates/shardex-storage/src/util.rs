use crate::error::StorageError;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hard upper bound for any shard file we will attempt to deserialize.
///
/// A corrupted length prefix must degrade to a cache miss, not an enormous
/// allocation.
pub const SHARD_PAYLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

pub(crate) fn bincode_options() -> impl bincode::Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub(crate) fn bincode_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode_options().serialize(value)?)
}

pub(crate) fn bincode_deserialize<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, bincode::Error> {
    bincode_options()
        .with_limit(SHARD_PAYLOAD_LIMIT_BYTES as u64)
        .deserialize(bytes)
}

/// Read `path` if it is a regular file no larger than
/// [`SHARD_PAYLOAD_LIMIT_BYTES`].
///
/// Missing files are silent misses; anything else unexpected is logged.
pub(crate) fn read_file_limited(path: &Path) -> Option<Vec<u8>> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "shardex.storage",
                    path = %path.display(),
                    error = %err,
                    "failed to stat shard file"
                );
            }
            return None;
        }
    };
    if !meta.is_file() {
        tracing::debug!(
            target: "shardex.storage",
            path = %path.display(),
            "shard path is not a regular file"
        );
        return None;
    }
    if meta.len() > SHARD_PAYLOAD_LIMIT_BYTES as u64 {
        tracing::warn!(
            target: "shardex.storage",
            path = %path.display(),
            len = meta.len(),
            limit = SHARD_PAYLOAD_LIMIT_BYTES,
            "shard file too large"
        );
        return None;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "shardex.storage",
                    path = %path.display(),
                    error = %err,
                    "failed to read shard file"
                );
            }
            return None;
        }
    };
    if bytes.len() > SHARD_PAYLOAD_LIMIT_BYTES {
        return None;
    }

    Some(bytes)
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` through a uniquely named temporary file followed by
/// a rename, so readers never observe a partially written shard.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let Some(parent) = path.parent() else {
        return Err(io::Error::other("path has no parent").into());
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let write_result = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = write_result {
        remove_tmp_best_effort(&tmp_path);
        return Err(err.into());
    }

    if let Err(err) = rename_replacing(&tmp_path, path) {
        remove_tmp_best_effort(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

fn rename_replacing(from: &Path, to: &Path) -> io::Result<()> {
    const MAX_RENAME_ATTEMPTS: usize = 1024;
    let mut attempts = 0usize;
    loop {
        match fs::rename(from, to) {
            Ok(()) => return Ok(()),
            Err(err)
                if cfg!(windows) && (err.kind() == io::ErrorKind::AlreadyExists || to.exists()) =>
            {
                // On Windows, `rename` doesn't overwrite.
                match fs::remove_file(to) {
                    Ok(()) => {}
                    Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                    Err(remove_err) => return Err(remove_err),
                }
                attempts += 1;
                if attempts >= MAX_RENAME_ATTEMPTS {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

fn remove_tmp_best_effort(tmp_path: &Path) {
    if let Err(err) = fs::remove_file(tmp_path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(
                target: "shardex.storage",
                path = %tmp_path.display(),
                error = %err,
                "failed to remove temporary shard file"
            );
        }
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}
