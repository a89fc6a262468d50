//! Core shared types for shardex.
//!
//! This crate is intentionally small: absolute paths, content digests and the
//! URI scheme machinery used to turn identifiers embedded in index shards back
//! into files on disk.

mod digest;
mod path;
mod resolve;
mod uri;

pub use digest::{FileDigest, DIGEST_LEN};
pub use path::{AbsPathBuf, NotAbsolutePath};
pub use resolve::{FileScheme, ProjectScheme, SourceResolver, UriResolver, UriScheme};
pub use uri::{Uri, UriError};

