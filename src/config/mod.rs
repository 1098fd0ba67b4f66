//! Application configuration for the `oml4rs` binary.
//!
//! The session itself only needs a [`SessionArgs`](crate::core::settings::SessionArgs);
//! this module adds an optional TOML file with logger settings and client
//! defaults. The file is located through `OML4RS_CONFIG` and is entirely
//! optional: without it every section falls back to its defaults.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{client::ClientConfig, logger::LoggerConfig};

pub mod client;
pub mod logger;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "OML4RS_CONFIG";

/// Timestamped messages for use before the tracing subscriber exists.
///
/// They go to stderr: in disabled mode stdout carries protocol output.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        $crate::config::print_line("INFO", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        $crate::config::print_line("WARN", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::config::print_line("ERROR", format_args!($($arg)*))
    };
}

#[doc(hidden)]
pub fn print_line(level: &str, message: std::fmt::Arguments<'_>) {
    let styled = match level {
        "ERROR" => console::style(level).red(),
        "WARN" => console::style(level).yellow(),
        _ => console::style(level).green(),
    };
    eprintln!("{}  {} {}", console::style(timestamp()).dim(), styled, message);
}

fn timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .unwrap_or_default()
}

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file named by `OML4RS_CONFIG` does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level configuration file layout.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Defaults for the session; command-line flags override them.
    #[validate(nested)]
    pub client: ClientConfig,
}

impl Config {
    /// Loads the file named by `OML4RS_CONFIG`, or returns defaults when the
    /// variable is unset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the named file is missing, unreadable,
    /// malformed or fails validation.
    pub fn new() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Config::default()),
        }
    }

    fn config_path() -> Option<PathBuf> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from)?;
        print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
        Some(path)
    }

    /// Loads and validates configuration from `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.logger.level, "info");
        assert!(config.client.app_name.is_none());
    }

    #[test]
    fn sections_are_parsed() {
        let config = Config::from_toml(
            r#"
            [logger]
            level = "debug"

            [client]
            app_name = "bench"
            domain = "exp42"
            collect = "tcp:collector:3003"
            "#,
        )
        .unwrap();

        assert_eq!(config.logger.level, "debug");
        assert_eq!(config.client.app_name.as_deref(), Some("bench"));
        assert_eq!(config.client.domain.as_deref(), Some("exp42"));
        assert_eq!(config.client.collect.as_deref(), Some("tcp:collector:3003"));
    }

    #[test]
    fn invalid_level_fails_validation() {
        let err = Config::from_toml("[logger]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml("[logger\nlevel = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nnode = \"n1\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.client.node.as_deref(), Some("n1"));
    }

    #[test]
    fn timestamp_is_utc_with_microseconds() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), "2026-01-01T00:00:00.000000Z".len());
        assert_eq!(&stamp[10..11], "T");
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/oml4rs.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
