//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; every section is optional.
//!
//! # Example
//!
//! ```no_run
//! use limitkeeper::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::frequency::FrequencyConfig;
use super::funds::{FundsConfig, ReplicationConfig};
use super::limits::LimitsConfig;
use super::logging::LoggingConfig;
use super::scheduler::SchedulerConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Limit allocation and balancing thresholds.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Hourly order budget.
    #[serde(default)]
    pub frequency: FrequencyConfig,

    /// Starting account state.
    #[serde(default)]
    pub funds: FundsConfig,

    /// Management service threads.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Replication queues.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Rule commands applied at startup, e.g. `event 29001 amountLimit=50`.
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.limit_tolerance < Decimal::ZERO {
            return Err(invalid("limit_tolerance", "must be 0 or greater"));
        }
        if limits.deadband_absolute < Decimal::ZERO {
            return Err(invalid("deadband_absolute", "must be 0 or greater"));
        }
        if limits.deadband_relative < Decimal::ZERO || limits.deadband_relative >= Decimal::ONE {
            return Err(invalid("deadband_relative", "must be between 0 and 1"));
        }
        if limits.max_distribution_passes == 0 {
            return Err(invalid("max_distribution_passes", "must be greater than 0"));
        }
        if limits.two_way_odds_tolerance <= Decimal::ZERO {
            return Err(invalid("two_way_odds_tolerance", "must be greater than 0"));
        }
        if limits.hard_to_reach_multiple <= Decimal::ZERO {
            return Err(invalid("hard_to_reach_multiple", "must be greater than 0"));
        }
        if limits.min_order_size < Decimal::ZERO {
            return Err(invalid("min_order_size", "must be 0 or greater"));
        }

        let frequency = &self.frequency;
        if frequency.orders_per_hour == 0 {
            return Err(invalid("orders_per_hour", "must be greater than 0"));
        }
        if frequency.min_period_secs == 0 {
            return Err(invalid("min_period_secs", "must be greater than 0"));
        }
        if frequency.max_period_secs < frequency.min_period_secs {
            return Err(invalid("max_period_secs", "must be >= min_period_secs"));
        }

        if self.funds.currency_rate <= Decimal::ZERO {
            return Err(invalid("currency_rate", "must be greater than 0"));
        }
        if self.funds.minimum_reserve < Decimal::ZERO {
            return Err(invalid("minimum_reserve", "must be 0 or greater"));
        }

        let scheduler = &self.scheduler;
        if scheduler.workers == 0 {
            return Err(invalid("workers", "must be greater than 0"));
        }
        if scheduler.limits_period_secs == 0 || scheduler.dispatch_interval_ms == 0 {
            return Err(invalid("scheduler", "periods must be greater than 0"));
        }
        if scheduler.job_queue_capacity == 0 {
            return Err(invalid("job_queue_capacity", "must be greater than 0"));
        }
        if self.replication.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be greater than 0"));
        }
        if let Err(e) = self.logging.directive() {
            return Err(invalid("level", &e.to_string()));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}
