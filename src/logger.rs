//! Diagnostics setup for the `oml4rs` binary.
//!
//! `LoggerManager` validates a [`LoggerConfig`] and installs the global
//! `tracing` subscriber: a console layer on stderr and, optionally, a systemd
//! journald layer. Stdout is left alone because disabled-mode sessions print
//! protocol lines there.

use std::io;

use thiserror::Error;
use tracing::instrument;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// Journald socket could not be opened.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to install the global subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),

    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,
}

pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Validates `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Installs the global subscriber. Call once, before the first session.
    ///
    /// A journald failure is tolerated as long as the console layer is on.
    ///
    /// # Errors
    ///
    /// Returns an error if no layer could be built or a subscriber is
    /// already installed.
    #[instrument(skip(self))]
    pub fn init(&self) -> Result<(), LoggerError> {
        let layers = self.build_layers()?;
        tracing_subscriber::registry().with(layers).try_init()?;
        Ok(())
    }

    fn build_layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if self.config.console.enabled {
            layers.push(Self::console_layer(&self.config.console, self.filter()));
        }

        if let Some(journald) = &self.config.journald {
            match Self::journald_layer(journald, self.filter()) {
                Ok(layer) => {
                    layers.push(layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald.identifier
                    );
                }
                Err(e) if self.config.console.enabled => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if layers.is_empty() {
            return Err(LoggerError::NoLayersConfigured);
        }
        Ok(layers)
    }

    fn console_layer(config: &ConsoleConfig, filter: EnvFilter) -> BoxedLayer {
        let base = fmt::layer()
            .with_target(config.show_target)
            .with_ansi(config.ansi_colors)
            .with_writer(io::stderr);

        match config.format {
            LogFormat::Json => base.json().with_filter(filter).boxed(),
            LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
            LogFormat::Compact => base.compact().with_filter(filter).boxed(),
        }
    }

    fn journald_layer(config: &JournaldConfig, filter: EnvFilter) -> Result<BoxedLayer, LoggerError> {
        let layer = tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
        Ok(layer.with_filter(filter).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let config = LoggerConfig {
            level: "chatty".into(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn console_only_builds_one_layer() {
        let manager = LoggerManager::new(LoggerConfig::default()).unwrap();
        assert_eq!(manager.build_layers().unwrap().len(), 1);
    }

    #[test]
    fn no_outputs_is_an_error() {
        let config = LoggerConfig {
            console: ConsoleConfig {
                enabled: false,
                ..Default::default()
            },
            journald: None,
            ..Default::default()
        };
        let manager = LoggerManager::new(config).unwrap();
        assert!(matches!(
            manager.build_layers(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }
}
