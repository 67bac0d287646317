//! Management service thread configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::settings::SchedulerSettings;

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

const fn default_limits_period_secs() -> u64 {
    60
}

const fn default_dispatch_interval_ms() -> u64 {
    200
}

const fn default_job_queue_capacity() -> usize {
    1024
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Worker threads running management passes. Defaults to the CPU count.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Period of the full limit recalculation. Defaults to 60s.
    #[serde(default = "default_limits_period_secs")]
    pub limits_period_secs: u64,

    /// Dispatcher tick. Defaults to 200ms.
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Bounded job queue capacity. Defaults to 1024.
    #[serde(default = "default_job_queue_capacity")]
    pub job_queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            limits_period_secs: default_limits_period_secs(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
            job_queue_capacity: default_job_queue_capacity(),
        }
    }
}

impl From<SchedulerConfig> for SchedulerSettings {
    fn from(config: SchedulerConfig) -> Self {
        Self {
            workers: config.workers,
            limits_period: Duration::from_secs(config.limits_period_secs),
            dispatch_interval: Duration::from_millis(config.dispatch_interval_ms),
            job_queue_capacity: config.job_queue_capacity,
        }
    }
}
