//! Collaborators of a management pass, bundled for tests.

use chrono::{DateTime, TimeZone, Utc};

use super::executor::RecordingExecutor;
use crate::adapter::outbound::MemoryMarketCache;
use crate::application::{BetFrequencyLimit, FrequencySettings, LimitSettings, ManageContext};

/// Owns everything a [`ManageContext`] borrows.
pub struct Harness {
    pub cache: MemoryMarketCache,
    pub executor: RecordingExecutor,
    pub frequency: BetFrequencyLimit,
    pub settings: LimitSettings,
    pub now: DateTime<Utc>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            cache: MemoryMarketCache::new(),
            executor: RecordingExecutor::new(),
            frequency: BetFrequencyLimit::new(FrequencySettings::default()),
            settings: LimitSettings::default(),
            now: fixed_now(),
        }
    }

    pub fn with_executor(mut self, executor: RecordingExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn ctx(&self) -> ManageContext<'_> {
        ManageContext {
            cache: &self.cache,
            executor: &self.executor,
            frequency: &self.frequency,
            settings: &self.settings,
            min_order_size: self.settings.min_order_size,
            now: self.now,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed clock used by tests: 2024-05-01 12:00:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
