//! Order-rate governor configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::settings::FrequencySettings;

const fn default_orders_per_hour() -> u32 {
    1000
}

const fn default_min_period_secs() -> u64 {
    1
}

const fn default_max_period_secs() -> u64 {
    600
}

/// Hourly order budget and management period bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct FrequencyConfig {
    /// Orders allowed per wall-clock hour. Defaults to 1000.
    #[serde(default = "default_orders_per_hour")]
    pub orders_per_hour: u32,

    /// Shortest delay between passes over one market. Defaults to 1s.
    #[serde(default = "default_min_period_secs")]
    pub min_period_secs: u64,

    /// Longest delay between passes over one market. Defaults to 600s.
    #[serde(default = "default_max_period_secs")]
    pub max_period_secs: u64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            orders_per_hour: default_orders_per_hour(),
            min_period_secs: default_min_period_secs(),
            max_period_secs: default_max_period_secs(),
        }
    }
}

impl From<FrequencyConfig> for FrequencySettings {
    fn from(config: FrequencyConfig) -> Self {
        Self {
            orders_per_hour: config.orders_per_hour,
            min_period: Duration::from_secs(config.min_period_secs),
            max_period: Duration::from_secs(config.max_period_secs),
        }
    }
}
