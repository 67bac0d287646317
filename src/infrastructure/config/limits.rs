//! Limit engine configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::application::settings::LimitSettings;

/// Thresholds for limit allocation and exposure balancing.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Cap breach tolerated before corrective orders (default: 0.1).
    #[serde(default = "default_limit_tolerance")]
    pub limit_tolerance: Decimal,
    /// Absolute dead-band for calculated-limit increases (default: 2).
    #[serde(default = "default_deadband_absolute")]
    pub deadband_absolute: Decimal,
    /// Relative dead-band for calculated-limit increases (default: 0.02).
    #[serde(default = "default_deadband_relative")]
    pub deadband_relative: Decimal,
    /// Maximum redistribution passes (default: 100).
    #[serde(default = "default_max_distribution_passes")]
    pub max_distribution_passes: usize,
    /// Two-way odds tolerance (default: 0.01).
    #[serde(default = "default_two_way_odds_tolerance")]
    pub two_way_odds_tolerance: Decimal,
    /// Queue-ahead multiple that marks an order hard to reach (default: 2).
    #[serde(default = "default_hard_to_reach_multiple")]
    pub hard_to_reach_multiple: Decimal,
    /// Maximum age of a calculated limit in seconds (default: 300).
    #[serde(default = "default_calculated_limit_max_age_secs")]
    pub calculated_limit_max_age_secs: u64,
    /// Window before market start in which exposure is removed (default: 3600).
    #[serde(default = "default_remove_exposure_before_start_secs")]
    pub remove_exposure_before_start_secs: u64,
    /// Exchange minimum stake in base currency (default: 2).
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
}

fn default_limit_tolerance() -> Decimal {
    dec!(0.1)
}

fn default_deadband_absolute() -> Decimal {
    dec!(2)
}

fn default_deadband_relative() -> Decimal {
    dec!(0.02)
}

const fn default_max_distribution_passes() -> usize {
    100
}

fn default_two_way_odds_tolerance() -> Decimal {
    dec!(0.01)
}

fn default_hard_to_reach_multiple() -> Decimal {
    dec!(2)
}

const fn default_calculated_limit_max_age_secs() -> u64 {
    300
}

const fn default_remove_exposure_before_start_secs() -> u64 {
    3600
}

fn default_min_order_size() -> Decimal {
    dec!(2)
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            limit_tolerance: default_limit_tolerance(),
            deadband_absolute: default_deadband_absolute(),
            deadband_relative: default_deadband_relative(),
            max_distribution_passes: default_max_distribution_passes(),
            two_way_odds_tolerance: default_two_way_odds_tolerance(),
            hard_to_reach_multiple: default_hard_to_reach_multiple(),
            calculated_limit_max_age_secs: default_calculated_limit_max_age_secs(),
            remove_exposure_before_start_secs: default_remove_exposure_before_start_secs(),
            min_order_size: default_min_order_size(),
        }
    }
}

impl From<LimitsConfig> for LimitSettings {
    fn from(config: LimitsConfig) -> Self {
        Self {
            limit_tolerance: config.limit_tolerance,
            deadband_absolute: config.deadband_absolute,
            deadband_relative: config.deadband_relative,
            max_distribution_passes: config.max_distribution_passes,
            two_way_odds_tolerance: config.two_way_odds_tolerance,
            hard_to_reach_multiple: config.hard_to_reach_multiple,
            calculated_limit_max_age: Duration::from_secs(config.calculated_limit_max_age_secs),
            remove_exposure_before_start: Duration::from_secs(
                config.remove_exposure_before_start_secs,
            ),
            min_order_size: config.min_order_size,
        }
    }
}
