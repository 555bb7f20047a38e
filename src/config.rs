//! Project configuration (`.kex.yaml`).
//!
//! ```yaml
//! source: contents            # or a list; `root` is accepted as an alias
//! references:
//!   - ../shared-guidelines
//!   - https://guides.example.com/kex/
//! remoteToken: secret         # KEX_REMOTE_TOKEN overrides this
//! logging:
//!   file: .kex/kex.log
//!   level: info
//! ```
//!
//! A missing file yields the defaults (a single `contents` source).

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `remoteToken`.
pub const REMOTE_TOKEN_ENV: &str = "KEX_REMOTE_TOKEN";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".kex.yaml";

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Local roots of the project's own guidelines.
    #[serde(
        rename = "source",
        alias = "root",
        default = "default_sources",
        deserialize_with = "one_or_many"
    )]
    pub sources: Vec<String>,
    /// Additional local or remote roots.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub remote_token: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Also write logs to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            references: Vec::new(),
            remote_token: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["contents".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl Config {
    /// The bearer token for remote sources: `KEX_REMOTE_TOKEN` when set,
    /// otherwise `remoteToken`.
    pub fn effective_remote_token(&self) -> Option<String> {
        resolve_token(std::env::var(REMOTE_TOKEN_ENV).ok(), self.remote_token.clone())
    }
}

fn resolve_token(env: Option<String>, configured: Option<String>) -> Option<String> {
    env.filter(|t| !t.is_empty())
        .or_else(|| configured.filter(|t| !t.is_empty()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config =
        serde_yaml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.sources.iter().any(|s| s.trim().is_empty()) {
        anyhow::bail!("source entries must not be empty");
    }
    Ok(config)
}

/// Load the configuration at `path`, falling back to defaults when the
/// file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}
