//! Structured logging configuration.
//!
//! Initializes a `tracing-subscriber` formatter from [`LoggingConfig`].
//! The `RUST_LOG` environment variable overrides the configured level
//! when set, matching the usual env-filter conventions.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from configuration.
///
/// Returns an error if a log file cannot be opened or a subscriber is
/// already installed.
///
/// # Errors
/// Returns `ProtocolError::ConfigError` on file or subscriber setup
/// failure.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            ProtocolError::ConfigError(
                "log_file_path must be set when log_to_file is enabled".to_string(),
            )
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Arc::new(file))
            .with_ansi(false);
        if config.json_format {
            builder
                .json()
                .try_init()
                .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
        } else {
            builder
                .try_init()
                .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
        }
        return Ok(());
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        builder
            .json()
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    } else {
        builder
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    }
    Ok(())
}
