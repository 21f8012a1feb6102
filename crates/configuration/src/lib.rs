use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{Config, DatabaseSettings, LoggingSettings, ReportSettings};

/// The file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_NAME: &str = "tradelog";

/// Loads the application configuration.
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. built-in defaults,
/// 2. the file at `path`, or an optional `tradelog.toml` in the working directory,
/// 3. environment variables such as `TRADELOG__DATABASE__PATH`.
///
/// The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("database.path", "data/tradelog.db")?
        .set_default("logging.level", "info")?
        .set_default("report.output", "dashboard.html")?
        .set_default("report.title", "Trading Journal")?
        .set_default("report.recent_trades", 20)?;

    builder = match path {
        // An explicitly named file must exist.
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
    };

    let config = builder
        .add_source(
            config::Environment::with_prefix("TRADELOG")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Config>()?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[database]
path = "/tmp/journal.db"

[report]
title = "My Desk"
"#
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/journal.db"));
        assert_eq!(config.report.title, "My Desk");
        // Untouched keys keep their defaults.
        assert_eq!(config.report.recent_trades, 20);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[report]\nrecent_trades = 0\n").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_unparseable_log_filter() {
        let config = Config {
            database: DatabaseSettings { path: PathBuf::from("x.db") },
            logging: LoggingSettings { level: "tradelog=verbose".to_string(), directory: None },
            report: ReportSettings {
                output: PathBuf::from("out.html"),
                title: "t".to_string(),
                recent_trades: 5,
            },
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }
}
