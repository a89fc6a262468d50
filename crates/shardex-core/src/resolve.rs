use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{AbsPathBuf, Uri, UriError};

/// Resolves URIs of a single scheme into absolute paths.
pub trait UriScheme {
    /// Lowercase scheme name this resolver handles (e.g. `"file"`).
    fn name(&self) -> &str;

    /// `hint` is the absolute path of the file the URI was found in.
    fn resolve(&self, uri: &Uri, hint: &AbsPathBuf) -> Result<AbsPathBuf, UriError>;
}

/// Turns an identifier embedded in a shard into an absolute path.
pub trait SourceResolver {
    fn resolve_source(&self, identifier: &str, hint: &AbsPathBuf)
        -> Result<AbsPathBuf, UriError>;
}

impl<T: SourceResolver + ?Sized> SourceResolver for &T {
    fn resolve_source(
        &self,
        identifier: &str,
        hint: &AbsPathBuf,
    ) -> Result<AbsPathBuf, UriError> {
        (**self).resolve_source(identifier, hint)
    }
}

/// `file:` URIs. The body is already absolute, so the hint is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileScheme;

impl UriScheme for FileScheme {
    fn name(&self) -> &str {
        "file"
    }

    fn resolve(&self, uri: &Uri, _hint: &AbsPathBuf) -> Result<AbsPathBuf, UriError> {
        let not_absolute = || UriError::NotAbsolute {
            body: uri.body().to_string(),
        };
        // `url` reads `file:a.h` as `file:///a.h`; a relative body is rejected here instead.
        if !uri.body().starts_with('/') {
            return Err(not_absolute());
        }

        let url = url::Url::parse(&uri.to_string()).map_err(|_| not_absolute())?;
        // An empty or `localhost` authority names this machine. Other hosts are
        // UNC shares on Windows and unreachable elsewhere.
        let path = url.to_file_path().map_err(|()| match url.host_str() {
            Some(host) if !host.is_empty() => UriError::RemoteHost {
                host: host.to_string(),
            },
            _ => not_absolute(),
        })?;
        AbsPathBuf::new(path).map_err(|_| not_absolute())
    }
}

/// `project:` URIs, whose body is relative to the project root containing the
/// file they were found in.
///
/// Shards written this way stay valid when a checkout is moved, which is why
/// resolution needs the hint.
#[derive(Debug, Default, Clone)]
pub struct ProjectScheme {
    roots: Vec<AbsPathBuf>,
}

impl ProjectScheme {
    pub fn new(roots: impl IntoIterator<Item = AbsPathBuf>) -> Self {
        let mut roots: Vec<_> = roots.into_iter().collect();
        // Deepest roots first so nested projects win over their parents.
        roots.sort_by(|a, b| {
            let depth = |root: &AbsPathBuf| root.as_path().components().count();
            depth(b).cmp(&depth(a)).then_with(|| a.cmp(b))
        });
        roots.dedup();
        Self { roots }
    }

    pub fn root_for(&self, path: &AbsPathBuf) -> Option<&AbsPathBuf> {
        self.roots.iter().find(|root| path.starts_with(root))
    }
}

impl UriScheme for ProjectScheme {
    fn name(&self) -> &str {
        "project"
    }

    fn resolve(&self, uri: &Uri, hint: &AbsPathBuf) -> Result<AbsPathBuf, UriError> {
        let root = self.root_for(hint).ok_or_else(|| UriError::NoProjectRoot {
            hint: PathBuf::from(hint.clone()),
        })?;
        Ok(root.join(uri.body().trim_start_matches('/')))
    }
}

/// Registry of [`UriScheme`]s keyed by scheme name.
///
/// The default registry only knows `file:`.
pub struct UriResolver {
    schemes: BTreeMap<String, Box<dyn UriScheme + Send + Sync>>,
}

impl UriResolver {
    pub fn empty() -> Self {
        Self {
            schemes: BTreeMap::new(),
        }
    }

    /// Register `scheme`, replacing any resolver previously registered under
    /// the same name.
    pub fn register(&mut self, scheme: impl UriScheme + Send + Sync + 'static) {
        self.schemes
            .insert(scheme.name().to_ascii_lowercase(), Box::new(scheme));
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl UriScheme + Send + Sync + 'static) -> Self {
        self.register(scheme);
        self
    }

    pub fn resolve(&self, uri: &Uri, hint: &AbsPathBuf) -> Result<AbsPathBuf, UriError> {
        let scheme = self
            .schemes
            .get(uri.scheme())
            .ok_or_else(|| UriError::UnsupportedScheme {
                scheme: uri.scheme().to_string(),
            })?;
        scheme.resolve(uri, hint)
    }

}

impl Default for UriResolver {
    fn default() -> Self {
        Self::empty().with_scheme(FileScheme)
    }
}

impl std::fmt::Debug for UriResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriResolver")
            .field("schemes", &self.schemes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SourceResolver for UriResolver {
    fn resolve_source(
        &self,
        identifier: &str,
        hint: &AbsPathBuf,
    ) -> Result<AbsPathBuf, UriError> {
        let uri = Uri::parse(identifier)?;
        self.resolve(&uri, hint)
    }
}
