//! Application configuration for coursegen.
//!
//! User config lives at `~/.coursegen/coursegen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CourseGenError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursegen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursegen";

// ---------------------------------------------------------------------------
// Config structs (matching coursegen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote catalog API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch concurrency and retry policy.
    #[serde(default)]
    pub fetch: FetchPoliciesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Term code to aggregate (e.g. `20253`).
    #[serde(default = "default_term")]
    pub term: String,

    /// Root directory for generated term data.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            term: default_term(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_term() -> String {
    "20253".into()
}
fn default_output_dir() -> String {
    "public/data".into()
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the catalog API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every individual request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Parse the configured base URL.
    pub fn parsed_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            CourseGenError::config(format!("invalid api.base_url '{}': {e}", self.base_url))
        })
    }
}

fn default_base_url() -> String {
    "https://classes.usc.edu".into()
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPoliciesConfig {
    /// Number of (school, program) fetches allowed in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Total attempts per remote unit, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff step; retry `n` waits `n * backoff_step_secs`.
    #[serde(default = "default_backoff_step_secs")]
    pub backoff_step_secs: u64,
}

impl Default for FetchPoliciesConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            backoff_step_secs: default_backoff_step_secs(),
        }
    }
}

fn default_concurrency() -> u32 {
    12
}
fn default_max_attempts() -> u32 {
    4
}
fn default_backoff_step_secs() -> u64 {
    5
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum concurrent program fetches.
    pub concurrency: usize,
    /// Total attempts per unit (1 initial + retries).
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub backoff_step: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.fetch.concurrency.max(1) as usize,
            max_attempts: config.fetch.max_attempts.max(1),
            backoff_step: Duration::from_secs(config.fetch.backoff_step_secs),
            request_timeout: Duration::from_secs(config.api.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursegen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourseGenError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursegen/coursegen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourseGenError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CourseGenError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CourseGenError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CourseGenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourseGenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("classes.usc.edu"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
term = "20261"

[fetch]
concurrency = 16
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.term, "20261");
        assert_eq!(config.defaults.output_dir, "public/data");
        assert_eq!(config.fetch.concurrency, 16);
        assert_eq!(config.fetch.max_attempts, 4);
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.concurrency, 12);
        assert_eq!(fetch.max_attempts, 4);
        assert_eq!(fetch.backoff_step, Duration::from_secs(5));
        assert_eq!(fetch.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let mut app = AppConfig::default();
        app.fetch.concurrency = 0;
        app.fetch.max_attempts = 0;
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.concurrency, 1);
        assert_eq!(fetch.max_attempts, 1);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let mut app = AppConfig::default();
        app.api.base_url = "not a url".into();
        let err = app.api.parsed_base_url().unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }
}
