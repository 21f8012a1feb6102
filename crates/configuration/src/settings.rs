use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub report: ReportSettings,
}

/// Where the journal lives.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the SQLite file. Created on first use.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, e.g. "info" or "tradelog=debug". `RUST_LOG`
    /// takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Settings for the HTML dashboard and text reports.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    /// Default output file for `dashboard`.
    pub output: PathBuf,
    /// Page title of the dashboard.
    pub title: String,
    /// How many recent trades the dashboard lists.
    pub recent_trades: u32,
}

impl Config {
    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.report.recent_trades == 0 {
            return Err(ConfigError::ValidationError(
                "report.recent_trades must be greater than zero".to_string(),
            ));
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level '{}' is not a valid filter: {}",
                self.logging.level, e
            )));
        }
        Ok(())
    }
}
