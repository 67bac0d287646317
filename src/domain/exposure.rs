//! Runner and market exposure.
//!
//! Exposure is the amount lost if a given outcome occurs:
//! - **back exposure** of a runner is lost when the runner loses (back
//!   stakes), netted against the stakes collected from matched lays
//! - **lay exposure** is lost when the runner wins (lay liabilities), netted
//!   against the profit of matched backs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::orders::CurrentOrder;
use super::side::Side;

/// Exposure snapshot of one runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerExposure {
    back_matched_stake: Decimal,
    back_matched_profit: Decimal,
    lay_matched_stake: Decimal,
    lay_matched_liability: Decimal,
    back_unmatched_stake: Decimal,
    lay_unmatched_liability: Decimal,
    back_in_flight_stake: Decimal,
    lay_in_flight_liability: Decimal,
}

impl RunnerExposure {
    /// Build an exposure snapshot from the runner's current orders.
    #[must_use]
    pub fn from_orders(orders: &[CurrentOrder]) -> Self {
        let mut exposure = Self::default();
        for order in orders {
            exposure.add_matched(order.side, order.matched_price(), order.size_matched);
            exposure.add_unmatched(order.side, order.price, order.size_remaining);
        }
        exposure
    }

    pub fn add_matched(&mut self, side: Side, price: Decimal, size: Decimal) {
        let payout = size * (price - Decimal::ONE);
        match side {
            Side::Back => {
                self.back_matched_stake += size;
                self.back_matched_profit += payout;
            }
            Side::Lay => {
                self.lay_matched_stake += size;
                self.lay_matched_liability += payout;
            }
        }
    }

    pub fn add_unmatched(&mut self, side: Side, price: Decimal, size: Decimal) {
        match side {
            Side::Back => self.back_unmatched_stake += size,
            Side::Lay => self.lay_unmatched_liability += size * (price - Decimal::ONE),
        }
    }

    /// Drop unmatched exposure whose cancel has been issued.
    pub fn remove_unmatched(&mut self, side: Side, price: Decimal, size: Decimal) {
        match side {
            Side::Back => {
                self.back_unmatched_stake = (self.back_unmatched_stake - size).max(Decimal::ZERO);
            }
            Side::Lay => {
                let liability = size * (price - Decimal::ONE);
                self.lay_unmatched_liability = (self.lay_unmatched_liability - liability).max(Decimal::ZERO);
            }
        }
    }

    /// Fold an order that was submitted but is not yet visible in the stream.
    pub fn add_in_flight(&mut self, side: Side, price: Decimal, size: Decimal) {
        match side {
            Side::Back => self.back_in_flight_stake += size,
            Side::Lay => self.lay_in_flight_liability += size * (price - Decimal::ONE),
        }
    }

    /// Matched exposure on `side`, never negative.
    #[must_use]
    pub fn matched(&self, side: Side) -> Decimal {
        let raw = match side {
            Side::Back => self.back_matched_stake - self.lay_matched_stake,
            Side::Lay => self.lay_matched_liability - self.back_matched_profit,
        };
        raw.max(Decimal::ZERO)
    }

    /// Matched + unmatched + in-flight exposure on `side`, never negative.
    #[must_use]
    pub fn total(&self, side: Side) -> Decimal {
        self.raw_total(side).max(Decimal::ZERO)
    }

    /// Total exposure before flooring; negative when the opposite side's
    /// matched position more than covers this one.
    #[must_use]
    pub fn raw_total(&self, side: Side) -> Decimal {
        match side {
            Side::Back => {
                self.back_matched_stake + self.back_unmatched_stake + self.back_in_flight_stake
                    - self.lay_matched_stake
            }
            Side::Lay => {
                self.lay_matched_liability
                    + self.lay_unmatched_liability
                    + self.lay_in_flight_liability
                    - self.back_matched_profit
            }
        }
    }

    /// Unmatched exposure on `side` that can still be cancelled.
    #[must_use]
    pub fn unmatched(&self, side: Side) -> Decimal {
        match side {
            Side::Back => self.back_unmatched_stake,
            Side::Lay => self.lay_unmatched_liability,
        }
    }

    /// Net result of the matched position if the runner wins.
    #[must_use]
    pub fn outcome_if_wins(&self) -> Decimal {
        self.back_matched_profit - self.lay_matched_liability
    }

    /// Net result of the matched position if the runner loses.
    #[must_use]
    pub fn outcome_if_loses(&self) -> Decimal {
        self.lay_matched_stake - self.back_matched_stake
    }
}

/// Worst-outcome exposure of a single-winner market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketExposure {
    pub matched: Decimal,
    pub total: Decimal,
}

impl MarketExposure {
    /// Maximum over runners of (runner lay exposure + every other runner's
    /// back exposure).
    #[must_use]
    pub fn from_runners<'a>(runners: impl IntoIterator<Item = &'a RunnerExposure>) -> Self {
        let runners: Vec<&RunnerExposure> = runners.into_iter().collect();
        let back_matched: Decimal = runners.iter().map(|r| r.matched(Side::Back)).sum();
        let back_total: Decimal = runners.iter().map(|r| r.total(Side::Back)).sum();

        runners.iter().fold(Self::default(), |acc, runner| {
            let matched = runner.matched(Side::Lay) + back_matched - runner.matched(Side::Back);
            let total = runner.total(Side::Lay) + back_total - runner.total(Side::Back);
            Self {
                matched: acc.matched.max(matched),
                total: acc.total.max(total),
            }
        })
    }
}
