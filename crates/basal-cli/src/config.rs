//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Settings for natural-language questions.
    pub llm: LlmConfig,
}

/// Ollama connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama server.
    pub endpoint: String,
    /// Model used for both SQL generation and answers.
    pub model: String,
    /// HTTP timeout per request, in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("llm", &self.llm)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("basal.db"),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: basal_llm::DEFAULT_ENDPOINT.to_string(),
            model: basal_llm::DEFAULT_MODEL.to_string(),
            timeout_secs: basal_llm::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl LlmConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(path) = default_config_file() {
            figment = figment.merge(Toml::file(path));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BASAL_*, nested keys split on `__`)
        figment = figment.merge(Env::prefixed("BASAL_").split("__"));

        figment.extract()
    }
}

/// Returns the default config file location, `<config_dir>/basal/config.toml`.
pub fn default_config_file() -> Option<PathBuf> {
    dirs_config_path().map(|dir| dir.join("config.toml"))
}

/// Returns the platform-specific config directory for basal.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("basal"))
}

/// Returns the platform-specific data directory for basal.
///
/// On Linux: `~/.local/share/basal`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("basal"))
}
