//! Structured logging.
//!
//! Installs a global `tracing` subscriber from the `[logging]` section of
//! [`KilnConfig`](crate::KilnConfig).
//!
//! ```rust,ignore
//! use kiln_app::{telemetry, KilnConfig};
//!
//! let config = KilnConfig::development();
//! telemetry::init_logging(&config.logging)?;
//!
//! tracing::info!(command = "migrate", "running command");
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use crate::config::{LogFormat, LoggingConfig as LogConfig};
use crate::config::ConfigError;
use crate::error::AppResult;

/// Initializes the global logging subscriber.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns `AppError::Config` if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> AppResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_filter(&config.level)?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;
        }
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(level)
        .map_err(|e| ConfigError::LoggingInit(format!("invalid log level `{level}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_noop() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        init_logging(&config).unwrap();
    }

    #[test]
    fn test_invalid_filter() {
        let err = build_filter("kiln=loudest").unwrap_err();
        assert!(matches!(err, ConfigError::LoggingInit(_)));
    }

    #[test]
    fn test_valid_filter() {
        assert!(build_filter("kiln_app=debug,warn").is_ok());
    }
}
