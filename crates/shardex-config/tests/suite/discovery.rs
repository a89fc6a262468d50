use std::ffi::OsString;
use std::sync::Mutex;

use shardex_config::{
    discover_config_path, load_for_workspace, ConfigError, ShardexConfig,
    SHARDEX_CACHE_DIR_ENV_VAR, SHARDEX_CONFIG_ENV_VAR,
};
use tempfile::tempdir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn discovers_shardex_toml_before_dotfile() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _env = EnvVarGuard::unset(SHARDEX_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let dotfile = dir.path().join(".shardex.toml");
    std::fs::write(&dotfile, "").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(dotfile.canonicalize().unwrap())
    );

    let primary = dir.path().join("shardex.toml");
    std::fs::write(&primary, "").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(primary.canonicalize().unwrap())
    );
}

#[test]
fn env_var_overrides_discovery() {
    let _lock = ENV_LOCK.lock().unwrap();

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("shardex.toml"), "").unwrap();
    let custom = dir.path().join("custom.toml");
    std::fs::write(&custom, "[logging]\nlevel = \"debug\"\n").unwrap();

    let _env = EnvVarGuard::set(
        SHARDEX_CONFIG_ENV_VAR,
        std::path::Path::new("custom.toml"),
    );
    let (config, path) = load_for_workspace(dir.path()).unwrap();

    assert_eq!(path, Some(custom.canonicalize().unwrap()));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn missing_config_yields_defaults() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _env = EnvVarGuard::unset(SHARDEX_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let (config, path) = load_for_workspace(dir.path()).unwrap();

    assert_eq!(path, None);
    assert_eq!(config, ShardexConfig::default());
}

#[test]
fn loads_storage_section() {
    let _lock = ENV_LOCK.lock().unwrap();
    let _env = EnvVarGuard::unset(SHARDEX_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("shardex.toml"),
        "[storage]\nproject_roots = [\".\", \"lib\"]\n\n[logging]\njson = true\n",
    )
    .unwrap();

    let (config, _) = load_for_workspace(dir.path()).unwrap();
    let base = shardex_core::AbsPathBuf::new(dir.path()).unwrap();
    assert_eq!(
        config.project_roots(&base),
        vec![base.clone(), base.join("lib")]
    );
    assert!(config.logging.json);
}

#[test]
fn cache_dir_env_var_applies_without_configured_cache_root() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();
    let cache = dir.path().join("env-cache");
    let _env = EnvVarGuard::set(SHARDEX_CACHE_DIR_ENV_VAR, &cache);
    let base = shardex_core::AbsPathBuf::new(dir.path()).unwrap();

    let config = ShardexConfig::default().storage_config(&base);
    assert_eq!(config.cache_root_override, Some(cache.clone()));
    assert_eq!(config.fallback_shard_dir().unwrap(), cache.join("index"));

    let config = ShardexConfig::load_from_str("[storage]\ncache_root = \"cfg-cache\"\n")
        .unwrap()
        .storage_config(&base);
    assert_eq!(
        config.cache_root_override,
        Some(dir.path().join("cfg-cache"))
    );
}

#[test]
fn unreadable_config_reports_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = ShardexConfig::load_from_path(&missing).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.toml"), "{err}");
}
