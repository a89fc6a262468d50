use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of bytes kept from the content hash.
pub const DIGEST_LEN: usize = 8;

/// A truncated content hash identifying one version of a source file.
///
/// The all-zero value is reserved as the "no digest" sentinel; a persisted shard
/// carrying it is malformed.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileDigest([u8; DIGEST_LEN]);

impl FileDigest {
    pub const ZERO: FileDigest = FileDigest([0; DIGEST_LEN]);

    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Digest of a file's content.
    pub fn of_content(content: &[u8]) -> Self {
        let hash = blake3::hash(content);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..DIGEST_LEN]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; DIGEST_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDigest({})", self.to_hex())
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
