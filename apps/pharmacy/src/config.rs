//! # Application Configuration
//!
//! Where the database lives, how patiently the session bridge waits for
//! profiles, and what gets logged.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     NOVACARE_DB_PATH=/srv/novacare/pharmacy.db                         │
//! │     NOVACARE_PROFILE_RETRY_ATTEMPTS=5                                  │
//! │     NOVACARE_PROFILE_RETRY_DELAY_MS=200                                │
//! │     NOVACARE_LOG=info,novacare=trace                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/novacare-pharmacy/pharmacy.toml (Linux)                  │
//! │     ~/Library/Application Support/com.novacare.pharmacy/pharmacy.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pharmacy.toml
//! [database]
//! path = "/srv/novacare/pharmacy.db"
//! max_connections = 5
//!
//! [session]
//! profile_retry_attempts = 5
//! profile_retry_delay_ms = 200
//! onboarding_retry_attempts = 5
//! onboarding_retry_delay_ms = 250
//!
//! [logging]
//! filter = "info,novacare=debug,sqlx=warn"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use novacare_db::DbConfig;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info,novacare=debug,sqlx=warn";

const CONFIG_FILE_NAME: &str = "pharmacy.toml";
const DATABASE_FILE_NAME: &str = "novacare.db";

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[session]`: bounded retry loops of the session bridge and staff
/// onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Profile fetch attempts after sign-in.
    #[serde(default = "default_profile_retry_attempts")]
    pub profile_retry_attempts: u32,

    #[serde(default = "default_profile_retry_delay_ms")]
    pub profile_retry_delay_ms: u64,

    /// Polls for the trigger-created profile after staff sign-up.
    #[serde(default = "default_onboarding_retry_attempts")]
    pub onboarding_retry_attempts: u32,

    #[serde(default = "default_onboarding_retry_delay_ms")]
    pub onboarding_retry_delay_ms: u64,
}

fn default_profile_retry_attempts() -> u32 {
    5
}
fn default_profile_retry_delay_ms() -> u64 {
    200
}
fn default_onboarding_retry_attempts() -> u32 {
    5
}
fn default_onboarding_retry_delay_ms() -> u64 {
    250
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            profile_retry_attempts: default_profile_retry_attempts(),
            profile_retry_delay_ms: default_profile_retry_delay_ms(),
            onboarding_retry_attempts: default_onboarding_retry_attempts(),
            onboarding_retry_delay_ms: default_onboarding_retry_delay_ms(),
        }
    }
}

impl SessionSettings {
    pub fn profile_retry_delay(&self) -> Duration {
        Duration::from_millis(self.profile_retry_delay_ms)
    }

    pub fn onboarding_retry_delay(&self) -> Duration {
        Duration::from_millis(self.onboarding_retry_delay_ms)
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive. `RUST_LOG` still wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`pharmacy.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading pharmacy config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load pharmacy config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Pharmacy config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.session.profile_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session.profile_retry_attempts must be greater than 0".into(),
            ));
        }

        if self.session.onboarding_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session.onboarding_retry_attempts must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("NOVACARE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(attempts) = std::env::var("NOVACARE_PROFILE_RETRY_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.session.profile_retry_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid NOVACARE_PROFILE_RETRY_ATTEMPTS"),
            }
        }

        if let Ok(delay) = std::env::var("NOVACARE_PROFILE_RETRY_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => self.session.profile_retry_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring invalid NOVACARE_PROFILE_RETRY_DELAY_MS"),
            }
        }

        if let Ok(filter) = std::env::var("NOVACARE_LOG") {
            self.logging.filter = filter;
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "novacare", "pharmacy")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// The configured database file, or `novacare.db` in the platform data
    /// directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().ok_or(ConfigError::NoPath)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join(DATABASE_FILE_NAME))
    }

    /// Pool settings for [`novacare_db::Database::new`].
    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?).max_connections(self.database.max_connections))
    }
}
