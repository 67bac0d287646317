//! `[logging]` section and tracing subscriber setup.
//!
//! Management passes run on named scheduler threads (`limits`,
//! `dispatcher`, `manager-N`), so both output formats carry thread names.

use serde::Deserialize;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, EnvFilter};

/// Subscriber output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `limitkeeper::application=debug`.
    /// `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Parse the configured directive without installing anything.
    pub fn directive(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::try_new(&self.level)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| self.directive())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber. Keeps one installed earlier, as test
    /// binaries do.
    pub fn init(&self) {
        let builder = fmt()
            .with_env_filter(self.filter())
            .with_thread_names(true);
        let installed = match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_directives_are_accepted() {
        let config = LoggingConfig {
            level: "warn,limitkeeper::application=debug".to_string(),
            format: LogFormat::Json,
        };
        assert!(config.directive().is_ok());
    }

    #[test]
    fn malformed_level_is_reported() {
        let config = LoggingConfig {
            level: "limitkeeper=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.directive().is_err());
    }
}
