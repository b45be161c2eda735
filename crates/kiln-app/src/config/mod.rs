//! Typed application configuration.
//!
//! [`KilnConfig`] is the base configuration an [`Application`](crate::Application)
//! is constructed with. It can be built in code, or loaded in layers with
//! [`ConfigLoader`]: defaults, then a TOML or JSON file, then environment
//! variable overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "orders"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [commands]
//! default_command = "routes"
//!
//! [testing]
//! dispatch_timeout_ms = 5000
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY`, for example
//! `KILN__LOGGING__LEVEL=debug` or `KILN__TESTING__DISPATCH_TIMEOUT_MS=250`.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Complete application configuration.
///
/// # Example
///
/// ```
/// use kiln_app::KilnConfig;
///
/// let config = KilnConfig::default();
/// assert_eq!(config.app.name, "kiln");
/// assert_eq!(config.commands.default_command, "routes");
/// assert!(config.dispatch_timeout().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Application identity.
    #[serde(default)]
    pub app: AppConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Administrative command settings.
    #[serde(default)]
    pub commands: CommandConfig,

    /// Settings consumed by test harnesses.
    #[serde(default)]
    pub testing: TestingConfig,
}

impl KilnConfig {
    /// Preset used by test harnesses: quiet, human-readable logging.
    #[must_use]
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.logging.level = "warn".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Preset for local development.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Returns the configured dispatch timeout, if any.
    #[must_use]
    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.testing.dispatch_timeout_ms.map(Duration::from_millis)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `app.name` is empty
    /// - `logging.level` is not a valid filter directive
    /// - `commands.default_command` is empty
    /// - `testing.dispatch_timeout_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.name", "must not be empty"));
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("invalid filter `{}`: {e}", self.logging.level),
            ));
        }

        if self.commands.default_command.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "commands.default_command",
                "must not be empty",
            ));
        }

        if self.testing.dispatch_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "testing.dispatch_timeout_ms",
                "must be greater than zero; omit it to disable the timeout",
            ));
        }

        Ok(())
    }
}

/// Application identity section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used in log output.
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

fn default_app_name() -> String {
    "kiln".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether to install a subscriber at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info" or "kiln_app=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Administrative command section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Command run when the argument vector names none.
    #[serde(default = "default_command")]
    pub default_command: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            default_command: default_command(),
        }
    }
}

fn default_command() -> String {
    "routes".to_string()
}

/// Test harness section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TestingConfig {
    /// Upper bound for a single in-process dispatch, in milliseconds.
    /// Unset means dispatch waits for as long as the responder takes.
    #[serde(default)]
    pub dispatch_timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        KilnConfig::default().validate().unwrap();
        KilnConfig::testing().validate().unwrap();
        KilnConfig::development().validate().unwrap();
    }

    #[test]
    fn test_testing_preset() {
        let config = KilnConfig::testing();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = KilnConfig::default();
        config.testing.dispatch_timeout_ms = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dispatch_timeout_ms"));
    }

    #[test]
    fn test_dispatch_timeout() {
        let mut config = KilnConfig::default();
        config.testing.dispatch_timeout_ms = Some(1500);
        assert_eq!(config.dispatch_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut config = KilnConfig::default();
        config.app.name = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<KilnConfig, _> = toml::from_str("[app]\nnmae = \"typo\"\n");
        assert!(result.is_err());
    }
}
