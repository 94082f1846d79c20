//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing` / `tracing-subscriber` stack for the observatory
//! core, supporting:
//! - Pretty, compact, and JSON output formats
//! - Module-level filtering via `EnvFilter` (honors `RUST_LOG`)
//! - Redaction helpers for sensitive values (tokens, passwords, emails)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_level(LogLevel::Debug);
//!
//! init_logging(config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Sensitive values
//!
//! Bearer tokens, credentials, and state nonces must never reach the log
//! stream. Domain types carry redacting `Debug` impls; for ad-hoc fields use
//! [`redact_if_sensitive`].

use crate::error::{Error, Result};
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Minimum log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level for the observatory crates
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_auth=debug,bridge_desktop=trace").
    /// Overrides `level` when set.
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the logging system.
///
/// This should be called once during application startup. Subsequent calls
/// return an error.
///
/// # Errors
///
/// Returns an error if logging is already initialized or the filter string
/// is invalid.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.display_target),
            )
            .try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(format = ?config.format, "Logging initialized");
    Ok(())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    // An explicit filter string wins, then RUST_LOG, then the configured
    // level for our crates with noisy dependencies capped at warn.
    let filter_string = if let Some(custom) = &config.filter {
        custom.clone()
    } else if let Ok(env) = std::env::var("RUST_LOG") {
        env
    } else {
        let level = config.level.as_str();
        format!(
            "core_runtime={},core_auth={},core_service={},bridge_desktop={},\
             hyper=warn,reqwest=warn,sqlx=warn",
            level, level, level, level
        )
    };

    EnvFilter::try_new(&filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", filter_string, e)))
}

/// Redact a field value when its name marks it as sensitive.
///
/// Token-like and password-like fields are fully redacted; email-like fields
/// keep their first character so operators can still correlate accounts.
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase();

    let fully_redacted = ["token", "secret", "password", "pass", "nonce", "state", "code"];
    if fully_redacted.iter().any(|marker| name.contains(marker)) {
        return "[REDACTED]".to_string();
    }

    if name.contains("email") {
        let mut chars = value.chars();
        return match chars.next() {
            Some(first) => format!("{}[REDACTED]", first),
            None => "[REDACTED]".to_string(),
        };
    }

    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.filter.is_none());
        assert!(config.display_target);
    }

    #[test]
    fn test_config_chaining() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Warn)
            .with_filter("core_auth=trace")
            .with_target(false);

        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.filter, Some("core_auth=trace".to_string()));
        assert!(!config.display_target);
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let config = LoggingConfig::default().with_filter("core_auth=debug=extra");
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_redaction_full() {
        assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("user_pass", "hunter2"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("client_secret", "s3cr3t"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("oauth_state", "xyz"), "[REDACTED]");
    }

    #[test]
    fn test_redaction_email_keeps_first_char() {
        let redacted = redact_if_sensitive("user_email", "user@example.com");
        assert!(redacted.starts_with('u'));
        assert!(redacted.contains("[REDACTED]"));
        assert!(!redacted.contains("example.com"));
    }

    #[test]
    fn test_redaction_passthrough() {
        assert_eq!(redact_if_sensitive("service", "mastodon"), "mastodon");
        assert_eq!(redact_if_sensitive("status_kind", "authorized"), "authorized");
    }
}
