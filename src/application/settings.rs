//! Runtime tuning of the limit engine.
//!
//! These thresholds were tuned empirically; they are configurable rather than
//! load-bearing.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Largest amount limit accepted for an event, market or runner side.
pub const MAX_AMOUNT_LIMIT: Decimal = dec!(1000000000000);

/// Thresholds used by limit allocation and exposure balancing.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitSettings {
    /// Exposure may exceed a cap by this much before corrective action.
    pub limit_tolerance: Decimal,
    /// Calculated-limit increases smaller than this are ignored.
    pub deadband_absolute: Decimal,
    /// Calculated-limit increases smaller than this fraction are ignored.
    pub deadband_relative: Decimal,
    /// Upper bound on redistribution passes in proportional allocation.
    pub max_distribution_passes: usize,
    /// Allowed deviation of `1/a + 1/b` from 1 for two-way odds.
    pub two_way_odds_tolerance: Decimal,
    /// Unmatched orders with more than this multiple of their size queued
    /// ahead are cancelled.
    pub hard_to_reach_multiple: Decimal,
    /// Calculated limits older than this are not used to grow exposure.
    pub calculated_limit_max_age: Duration,
    /// Markets starting within this window only have exposure removed.
    pub remove_exposure_before_start: Duration,
    /// Exchange minimum stake in base currency.
    pub min_order_size: Decimal,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            limit_tolerance: dec!(0.1),
            deadband_absolute: dec!(2),
            deadband_relative: dec!(0.02),
            max_distribution_passes: 100,
            two_way_odds_tolerance: dec!(0.01),
            hard_to_reach_multiple: dec!(2),
            calculated_limit_max_age: Duration::from_secs(300),
            remove_exposure_before_start: Duration::from_secs(3600),
            min_order_size: dec!(2),
        }
    }
}

/// Hourly order budget and the bounds of the management period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySettings {
    pub orders_per_hour: u32,
    pub min_period: Duration,
    pub max_period: Duration,
}

impl Default for FrequencySettings {
    fn default() -> Self {
        Self {
            orders_per_hour: 1000,
            min_period: Duration::from_secs(1),
            max_period: Duration::from_secs(600),
        }
    }
}

/// Thread layout of the management service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Worker threads running management passes.
    pub workers: usize,
    /// Period of the full limit recalculation.
    pub limits_period: Duration,
    /// How often the dispatcher looks for due markets.
    pub dispatch_interval: Duration,
    /// Capacity of the job queue between dispatcher and workers.
    pub job_queue_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            limits_period: Duration::from_secs(60),
            dispatch_interval: Duration::from_millis(200),
            job_queue_capacity: 1024,
        }
    }
}
