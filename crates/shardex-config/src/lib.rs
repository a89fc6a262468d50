//! Configuration for shardex binaries.
//!
//! A workspace is configured through an optional TOML file (`shardex.toml`):
//!
//! ```toml
//! [storage]
//! project_roots = [".", "third_party/llvm"]
//! cache_root = "/var/cache/shardex"
//!
//! [logging]
//! level = "shardex.loader=debug,info"
//! json = false
//! ```
//!
//! Relative paths are resolved against the directory containing the file.

mod logging;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use shardex_core::AbsPathBuf;
use shardex_storage::StorageConfig;

pub use logging::{init_tracing, LoggingConfig};

/// Overrides config discovery with an explicit file path.
pub const SHARDEX_CONFIG_ENV_VAR: &str = "SHARDEX_CONFIG_PATH";

/// Overrides the global cache directory when the config file does not set one.
pub const SHARDEX_CACHE_DIR_ENV_VAR: &str = "SHARDEX_CACHE_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardexConfig {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Roots whose files keep their shards under `<root>/.cache/shardex/index`.
    #[serde(default)]
    pub project_roots: Vec<PathBuf>,

    /// Global cache directory for files outside every project root.
    ///
    /// Defaults to `$SHARDEX_CACHE_DIR`, then `~/.shardex/cache`.
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` quotes the offending source line; keep only the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED_STRING_RE: OnceLock<Option<regex::Regex>> = OnceLock::new();
    static BACKTICKED_RE: OnceLock<Option<regex::Regex>> = OnceLock::new();

    // Escaped quotes (`\"`) must not terminate the match.
    let quoted = QUOTED_STRING_RE.get_or_init(|| regex::Regex::new(r#""(?:\\.|[^"\\])*""#).ok());
    let mut out = match quoted {
        Some(re) => re.replace_all(message, r#""<redacted>""#).into_owned(),
        None => message.to_owned(),
    };

    // `unknown field `x`` and `unknown variant `x`` echo user input; `missing field `x``
    // only names a schema field.
    let backticked = BACKTICKED_RE
        .get_or_init(|| regex::Regex::new(r"(unknown (?:field|variant)) `[^`]*`").ok());
    if let Some(re) = backticked {
        out = re.replace_all(&out, "$1 `<redacted>`").into_owned();
    }
    out
}

impl ShardexConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Project roots made absolute against `base_dir`, deduplicated.
    pub fn project_roots(&self, base_dir: &AbsPathBuf) -> Vec<AbsPathBuf> {
        let mut roots: Vec<AbsPathBuf> = self
            .storage
            .project_roots
            .iter()
            .map(|root| AbsPathBuf::absolutize(base_dir, root))
            .collect();
        roots.sort();
        roots.dedup();
        roots
    }

    /// The storage layout this config describes, with relative paths resolved
    /// against `base_dir`.
    pub fn storage_config(&self, base_dir: &AbsPathBuf) -> StorageConfig {
        let cache_root_override = match &self.storage.cache_root {
            Some(root) => Some(AbsPathBuf::absolutize(base_dir, root).into_path_buf()),
            None => std::env::var_os(SHARDEX_CACHE_DIR_ENV_VAR).map(PathBuf::from),
        };
        StorageConfig {
            project_roots: self.project_roots(base_dir),
            cache_root_override,
        }
    }
}

/// Discover the config file for a workspace root.
///
/// Search order:
/// 1) `SHARDEX_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `shardex.toml` in `workspace_root`
/// 3) `.shardex.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(SHARDEX_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["shardex.toml", ".shardex.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for a workspace root.
///
/// If no config is present, returns [`ShardexConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(ShardexConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((ShardexConfig::default(), None));
    };

    let config = ShardexConfig::load_from_path(&path)?;
    tracing::debug!(target: "shardex.config", path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}
