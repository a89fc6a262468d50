use std::borrow::Borrow;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Returned when a path that must be absolute is not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path is not absolute: {}", .0.display())]
pub struct NotAbsolutePath(pub PathBuf);

/// An absolute, lexically normalized path.
///
/// `.` components are dropped and `..` components are folded into their parent
/// without touching the file system, so two spellings of the same location
/// compare (and hash) equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct AbsPathBuf(PathBuf);

impl AbsPathBuf {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, NotAbsolutePath> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(NotAbsolutePath(path));
        }
        Ok(Self(normalize_lexically(&path)))
    }

    /// Resolve `path` against `base` when it is relative.
    pub fn absolutize(base: &AbsPathBuf, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            Self(normalize_lexically(path))
        } else {
            base.join(path)
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> Self {
        Self(normalize_lexically(&self.0.join(rel)))
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|parent| Self(parent.to_path_buf()))
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.0.file_name()
    }

    /// Whether `self` is `ancestor` or lives underneath it (component-wise).
    pub fn starts_with(&self, ancestor: &AbsPathBuf) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    pub fn display(&self) -> std::path::Display<'_> {
        self.0.display()
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root.
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

impl TryFrom<PathBuf> for AbsPathBuf {
    type Error = NotAbsolutePath;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&Path> for AbsPathBuf {
    type Error = NotAbsolutePath;

    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AbsPathBuf {
    type Error = NotAbsolutePath;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AbsPathBuf> for PathBuf {
    fn from(value: AbsPathBuf) -> Self {
        value.0
    }
}

impl AsRef<Path> for AbsPathBuf {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Borrow<Path> for AbsPathBuf {
    fn borrow(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for AbsPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for AbsPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
