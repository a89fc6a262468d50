use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static TRACING_INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// `level` as `EnvFilter` directives. Bare level names are matched
    /// case-insensitively and `warning` is accepted for `warn`.
    pub(crate) fn level_directives(&self) -> String {
        let level = self.level.trim();
        let named = ["trace", "debug", "info", "warn", "error"]
            .into_iter()
            .find(|name| level.eq_ignore_ascii_case(name));
        match named {
            Some(name) => name.to_owned(),
            None if level.eq_ignore_ascii_case("warning") => "warn".to_owned(),
            None if level.is_empty() => Self::default_level(),
            None => level.to_owned(),
        }
    }

    /// The effective filter.
    ///
    /// Non-empty `RUST_LOG` directives are appended to `level`. The first
    /// candidate that parses wins, falling back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = self.level_directives();
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let mut candidates = Vec::with_capacity(3);
        if let Some(from_env) = &from_env {
            candidates.push(format!("{configured},{from_env}"));
            candidates.push(from_env.clone());
        }
        candidates.push(configured);

        candidates
            .into_iter()
            .find_map(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Only the first call has an effect. A subscriber installed by someone else
/// is left alone.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let installed = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(layer)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(
                target: "shardex.config",
                level = %config.level,
                json = config.json,
                "tracing initialized"
            );
        }
    });
}
