//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file
//! output. Log lines go to stderr so command output on stdout stays
//! machine-readable.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns error if the filter is invalid, the log file cannot be opened,
/// or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use umacred::config::LoggingConfig;
/// use umacred::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "umacred=debug".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(Arc::new(file));

            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));

            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "umacred=info");
        assert!(!config.json_format);
        assert_eq!(config.file_path, None);
    }

    #[test]
    fn test_init_logging_rejects_unwritable_file() {
        let dir = tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            json_format: false,
            file_path: Some(dir.path().join("missing").join("umacred.log")),
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_init_logging_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("umacred.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            json_format: true,
            file_path: Some(path.clone()),
        };
        // A subscriber may already be installed by another test; the file is
        // opened before installation either way.
        let _ = init_logging(&config);
        assert!(path.exists());
    }
}
