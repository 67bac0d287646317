//! Hourly order-rate governor.
//!
//! The exchange caps the number of orders per hour. Instead of rejecting
//! orders once the cap is near, the governor stretches the delay between
//! management passes: markets holding a small share of the budget are
//! visited less often, and every market slows down when the hourly quota is
//! being consumed faster than the hour is elapsing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::settings::FrequencySettings;

const MILLIS_PER_HOUR: i64 = 3_600_000;

#[derive(Debug, Default)]
struct Counter {
    /// Wall-clock hour (hours since the epoch) the count belongs to.
    hour: i64,
    orders: u32,
    last_order: Option<DateTime<Utc>>,
}

impl Counter {
    /// Reset the count when `now` is in a later hour.
    fn roll(&mut self, now: DateTime<Utc>) {
        let hour = hour_index(now);
        if hour > self.hour {
            if self.orders > 0 {
                debug!(previous = self.orders, "Hourly order counter reset");
            }
            self.hour = hour;
            self.orders = 0;
        }
    }
}

/// Order-rate governor shared by every market.
pub struct BetFrequencyLimit {
    settings: FrequencySettings,
    counter: Mutex<Counter>,
}

impl BetFrequencyLimit {
    #[must_use]
    pub fn new(settings: FrequencySettings) -> Self {
        Self {
            settings,
            counter: Mutex::new(Counter::default()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &FrequencySettings {
        &self.settings
    }

    /// Count one submitted order.
    pub fn record_order(&self) -> bool {
        self.record_order_at(Utc::now())
    }

    /// Count one submitted order at `now`. A timestamp older than the last
    /// recorded order is logged and discarded.
    pub fn record_order_at(&self, now: DateTime<Utc>) -> bool {
        let mut counter = self.counter.lock();
        if let Some(last) = counter.last_order {
            if now < last {
                warn!(%now, %last, "Order timestamp went backwards, discarding");
                return false;
            }
        }
        counter.roll(now);
        counter.orders += 1;
        counter.last_order = Some(now);
        if counter.orders == self.settings.orders_per_hour {
            warn!(orders = counter.orders, "Hourly order budget exhausted");
        }
        true
    }

    /// Orders counted in the hour containing `now`.
    #[must_use]
    pub fn orders_this_hour_at(&self, now: DateTime<Utc>) -> u32 {
        let mut counter = self.counter.lock();
        counter.roll(now);
        counter.orders
    }

    /// Delay before a market holding `market_limit` of `total_limit` should
    /// be managed again.
    #[must_use]
    pub fn manage_market_period(&self, market_limit: Decimal, total_limit: Decimal) -> Duration {
        self.manage_market_period_at(market_limit, total_limit, Utc::now())
    }

    /// [`Self::manage_market_period`] against an explicit clock.
    #[must_use]
    pub fn manage_market_period_at(
        &self,
        market_limit: Decimal,
        total_limit: Decimal,
        now: DateTime<Utc>,
    ) -> Duration {
        let min = self.settings.min_period.as_secs_f64();
        let max = self.settings.max_period.as_secs_f64();

        if market_limit <= Decimal::ZERO || total_limit <= Decimal::ZERO {
            return self.settings.max_period;
        }
        let share = (market_limit / total_limit)
            .min(Decimal::ONE)
            .to_f64()
            .unwrap_or(1.0);
        if share <= 0.0 {
            return self.settings.max_period;
        }

        let orders = self.orders_this_hour_at(now);
        let usage = f64::from(orders) / f64::from(self.settings.orders_per_hour.max(1));
        if usage >= 1.0 {
            return self.settings.max_period;
        }

        // at least one second into the hour, so the pace stays finite
        let elapsed = (now.timestamp_millis().rem_euclid(MILLIS_PER_HOUR) as f64)
            .max(1000.0)
            / MILLIS_PER_HOUR as f64;
        let pace = usage / elapsed;
        let factor = pace.max(1.0) / (1.0 - usage);

        let period = (min / share * factor).clamp(min, max);
        Duration::from_secs_f64(period)
    }
}

fn hour_index(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().div_euclid(MILLIS_PER_HOUR)
}
