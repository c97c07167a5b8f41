//! Configuration loading and credential resolution
//!
//! Two concerns live here:
//! - **Bootstrap TOML** (`hwlit.toml`): optional defaults for paths, model,
//!   worker count and logging. A missing file is not an error.
//! - **API credentials**: resolved once at startup, environment first, then
//!   the key file. The resolved [`Credentials`] value is handed to the LLM
//!   client explicitly; the process environment is never modified.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable holding the LLM API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the bootstrap file location
pub const CONFIG_PATH_ENV: &str = "HWLIT_CONFIG";

/// Key names recognized inside a JSON key file, in priority order
const KEY_FILE_FIELDS: [&str; 3] = ["OPENAI_API_KEY", "api_key", "key"];

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding the collection files
    pub data_dir: PathBuf,
    /// Fallback key file (JSON or plain text)
    pub api_key_file: PathBuf,
    /// Chat model used for classification and tagging
    pub model: String,
    /// Concurrent LLM requests
    pub jobs: usize,
    /// Per-query cap on harvested results
    pub max_results: usize,
    /// Base delay of the linear retry schedule
    pub retry_backoff_secs: u64,
    /// Chat-completions endpoint root (OpenAI-compatible)
    pub openai_base_url: String,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("_data"),
            api_key_file: PathBuf::from("secrets/api_key.json"),
            model: "gpt-4o".to_string(),
            jobs: 20,
            max_results: 2000,
            retry_backoff_secs: 5,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "hwlit_curator=info,hwlit_common=info".to_string(),
        }
    }
}

/// Locate the bootstrap file
///
/// Priority: explicit path → `HWLIT_CONFIG` → `<config dir>/hwlit/hwlit.toml`.
/// Returns `None` when no candidate is known.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("hwlit").join("hwlit.toml"))
}

/// Where the bootstrap configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No candidate path was known
    Defaults,
    /// A candidate path was known but no file exists there
    Missing { path: PathBuf, explicit: bool },
    File(PathBuf),
}

/// Bootstrap configuration together with its origin
///
/// Loading happens before logging is initialized (the log filter is part of
/// the configuration), so the origin is reported afterwards through
/// [`LoadedConfig::log_source`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::Defaults => debug!("No configuration file location, using defaults"),
            ConfigSource::Missing { path, explicit: true } => {
                warn!(path = %path.display(), "Config file not found, using defaults")
            }
            ConfigSource::Missing { path, explicit: false } => {
                debug!(path = %path.display(), "No config file, using defaults")
            }
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded configuration"),
        }
    }
}

/// Load the bootstrap TOML
///
/// A missing file yields defaults. A file that exists but does not parse is
/// a hard error.
pub fn load_toml_config(path: Option<&Path>, explicit: bool) -> Result<LoadedConfig> {
    let Some(path) = path else {
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Defaults,
        });
    };

    if !path.exists() {
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Missing {
                path: path.to_path_buf(),
                explicit,
            },
        });
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path.to_path_buf()),
    })
}

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    KeyFile,
}

/// Resolved LLM API credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    source: CredentialSource,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            source,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the API key from the process environment, then `key_file`
pub fn resolve_credentials(key_file: &Path) -> Result<Credentials> {
    resolve_credentials_from(std::env::var(API_KEY_ENV).ok(), key_file)
}

/// Resolve the API key from an already-read environment value, then `key_file`
///
/// An unreadable key file is reported and skipped; only the absence of any
/// valid key is an error.
pub fn resolve_credentials_from(env_value: Option<String>, key_file: &Path) -> Result<Credentials> {
    if let Some(key) = env_value.filter(|k| is_valid_key(k)) {
        info!("API key loaded from environment variable");
        return Ok(Credentials::new(key, CredentialSource::Environment));
    }

    if key_file.is_file() {
        match std::fs::read_to_string(key_file) {
            Ok(content) => {
                if let Some(key) = parse_key_file(&content) {
                    info!(path = %key_file.display(), "API key loaded from key file");
                    return Ok(Credentials::new(key, CredentialSource::KeyFile));
                }
                warn!(path = %key_file.display(), "Key file contains no usable API key");
            }
            Err(e) => {
                warn!(path = %key_file.display(), error = %e, "Failed to read API key file");
            }
        }
    }

    Err(Error::Config(format!(
        "{} not found in environment or key file (tried {})",
        API_KEY_ENV,
        key_file.display()
    )))
}

/// Extract a key from key-file content
///
/// JSON objects are searched for the recognized field names; a JSON string
/// is used as-is; anything that is not JSON is taken as the trimmed text.
pub fn parse_key_file(content: &str) -> Option<String> {
    let key = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(serde_json::Value::Object(map)) => KEY_FILE_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .find(|k| is_valid_key(k))
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(_) => None,
        Err(_) => Some(content.trim().to_string()),
    }?;

    is_valid_key(&key).then(|| key.trim().to_string())
}
