//! Configuration loading and typed config structures for the Bermudia
//! service.
//!
//! The canonical configuration lives in `bermudia-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads the file and
//! applies environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use bermudia_players::EconomyConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `bermudia-config.yaml`. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// `PostgreSQL` connection. Without a URL the in-memory store is used.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Store call limits.
    #[serde(default)]
    pub store: StoreConfig,

    /// Economy parameters. Ignored in development mode.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Grading and the correction job.
    #[serde(default)]
    pub grading: GradingConfig,

    /// Notification delivery.
    #[serde(default)]
    pub hub: HubConfig,

    /// Path of the static content file (territories, questions, treasures).
    #[serde(default = "default_content_path")]
    pub content_path: PathBuf,

    /// Token graders must present in `x-grader-token`. Grader routes are
    /// open when unset or blank; the server warns about this at startup.
    #[serde(default)]
    pub grader_token: Option<String>,

    /// Development mode: generous starting keys and a short correction
    /// delay.
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            store: StoreConfig::default(),
            economy: EconomyConfig::default(),
            grading: GradingConfig::default(),
            hub: HubConfig::default(),
            content_path: default_content_path(),
            grader_token: None,
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `database.url`
    /// - `BERMUDIA_PORT` overrides `server.port`
    /// - `BERMUDIA_DEV` (`1` or `true`) overrides `dev_mode`
    /// - `BERMUDIA_GRADER_TOKEN` overrides `grader_token`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override fields with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database.url = Some(val);
        }
        if let Some(port) = std::env::var("BERMUDIA_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("BERMUDIA_DEV") {
            self.dev_mode = matches!(val.as_str(), "1" | "true");
        }
        if let Ok(val) = std::env::var("BERMUDIA_GRADER_TOKEN") {
            self.grader_token = Some(val);
        }
    }

    /// The grader token, ignoring a blank value.
    pub fn grader_token(&self) -> Option<&str> {
        self.grader_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Whether grader routes accept requests without a token.
    pub fn grader_routes_open(&self) -> bool {
        self.grader_token().is_none()
    }

    /// The economy in effect: the development economy in dev mode.
    pub fn effective_economy(&self) -> EconomyConfig {
        if self.dev_mode {
            EconomyConfig::development()
        } else {
            self.economy.clone()
        }
    }

    /// How long a finalized correction waits before the job applies it.
    pub const fn min_correction_delay(&self) -> Duration {
        if self.dev_mode {
            Duration::from_secs(DEV_CORRECTION_DELAY_SECS)
        } else {
            Duration::from_secs(self.grading.min_correction_delay_secs)
        }
    }
}

/// Correction delay used in development mode.
const DEV_CORRECTION_DELAY_SECS: u64 = 10;

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `PostgreSQL` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Store call limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Deadline for every store call, in milliseconds.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl StoreConfig {
    /// The deadline as a [`Duration`].
    pub const fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
        }
    }
}

/// Grading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GradingConfig {
    /// Grade marked submissions (`true`, `false`, `half`, ...) immediately.
    #[serde(default)]
    pub auto_correct: bool,

    /// Seconds a finalized correction waits before it is applied.
    #[serde(default = "default_min_correction_delay_secs")]
    pub min_correction_delay_secs: u64,

    /// Seconds between correction job rounds.
    #[serde(default = "default_correction_job_interval_secs")]
    pub correction_job_interval_secs: u64,

    /// Corrections applied concurrently within a round.
    #[serde(default = "default_correction_workers")]
    pub correction_workers: usize,
}

impl GradingConfig {
    /// The job interval as a [`Duration`].
    pub const fn job_interval(&self) -> Duration {
        Duration::from_secs(self.correction_job_interval_secs)
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            auto_correct: false,
            min_correction_delay_secs: default_min_correction_delay_secs(),
            correction_job_interval_secs: default_correction_job_interval_secs(),
            correction_workers: default_correction_workers(),
        }
    }
}

/// Notification delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Per-send deadline in milliseconds; a slower client is dropped.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl HubConfig {
    /// The send deadline as a [`Duration`].
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_content_path() -> PathBuf {
    PathBuf::from("content/bermudia.yaml")
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_deadline_ms() -> u64 {
    2000
}

const fn default_min_correction_delay_secs() -> u64 {
    180
}

const fn default_correction_job_interval_secs() -> u64 {
    10
}

const fn default_correction_workers() -> usize {
    2
}

const fn default_send_timeout_ms() -> u64 {
    1000
}
