//! Live market book types supplied by the streaming cache.
//!
//! An exchange runner book has two ladders:
//! - **available to back**: prices a backer can take now (resting lay
//!   offers), sorted by price descending (best first)
//! - **available to lay**: prices a layer can take now (resting back
//!   offers), sorted by price ascending (best first)
//!
//! # Examples
//!
//! ```
//! use limitkeeper::domain::{PriceLevel, RunnerBook, RunnerId};
//! use rust_decimal_macros::dec;
//!
//! let book = RunnerBook::new(
//!     RunnerId::selection(1),
//!     vec![PriceLevel::new(dec!(2.0), dec!(50))],
//!     vec![PriceLevel::new(dec!(2.04), dec!(80))],
//! );
//!
//! assert_eq!(book.best_available_to_back().unwrap().price(), dec!(2.0));
//! assert_eq!(book.best_available_to_lay().unwrap().price(), dec!(2.04));
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{EventId, MarketId, RunnerId};

/// A single price level on a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    price: Decimal,
    size: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub const fn size(&self) -> Decimal {
        self.size
    }
}

/// Ladders for a single runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerBook {
    runner_id: RunnerId,
    available_to_back: Vec<PriceLevel>,
    available_to_lay: Vec<PriceLevel>,
}

impl RunnerBook {
    /// Creates a runner book.
    ///
    /// `available_to_back` should be sorted descending, `available_to_lay`
    /// ascending.
    #[must_use]
    pub const fn new(
        runner_id: RunnerId,
        available_to_back: Vec<PriceLevel>,
        available_to_lay: Vec<PriceLevel>,
    ) -> Self {
        Self {
            runner_id,
            available_to_back,
            available_to_lay,
        }
    }

    #[must_use]
    pub const fn runner_id(&self) -> RunnerId {
        self.runner_id
    }

    #[must_use]
    pub fn available_to_back(&self) -> &[PriceLevel] {
        &self.available_to_back
    }

    #[must_use]
    pub fn available_to_lay(&self) -> &[PriceLevel] {
        &self.available_to_lay
    }

    /// Highest price a backer can take right now.
    #[must_use]
    pub fn best_available_to_back(&self) -> Option<&PriceLevel> {
        self.available_to_back.first()
    }

    /// Lowest price a layer can take right now.
    #[must_use]
    pub fn best_available_to_lay(&self) -> Option<&PriceLevel> {
        self.available_to_lay.first()
    }

    /// Resting back liquidity queued at prices a layer prefers over `price`.
    ///
    /// A back order resting at `price` only fills after all of it is taken.
    #[must_use]
    pub fn back_liquidity_ahead_of(&self, price: Decimal) -> Decimal {
        self.available_to_lay
            .iter()
            .filter(|level| level.price < price)
            .map(PriceLevel::size)
            .sum()
    }

    /// Resting lay liquidity queued at prices a backer prefers over `price`.
    #[must_use]
    pub fn lay_liability_ahead_of(&self, price: Decimal) -> Decimal {
        self.available_to_back
            .iter()
            .filter(|level| level.price > price)
            .map(PriceLevel::size)
            .sum()
    }
}

/// Trading status of a market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    #[default]
    Open,
    Suspended,
    Closed,
}

/// Live snapshot of a market's prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBook {
    market_id: MarketId,
    event_id: Option<EventId>,
    status: MarketStatus,
    in_play: bool,
    start_time: Option<DateTime<Utc>>,
    runners: HashMap<RunnerId, RunnerBook>,
}

impl MarketBook {
    /// Creates an open, pre-play market book without runners.
    #[must_use]
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            event_id: None,
            status: MarketStatus::Open,
            in_play: false,
            start_time: None,
            runners: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: MarketStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_in_play(mut self, in_play: bool) -> Self {
        self.in_play = in_play;
        self
    }

    #[must_use]
    pub const fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: RunnerBook) -> Self {
        self.runners.insert(runner.runner_id(), runner);
        self
    }

    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub const fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> MarketStatus {
        self.status
    }

    #[must_use]
    pub const fn is_in_play(&self) -> bool {
        self.in_play
    }

    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    #[must_use]
    pub fn runner(&self, runner_id: &RunnerId) -> Option<&RunnerBook> {
        self.runners.get(runner_id)
    }

    pub fn runners(&self) -> impl Iterator<Item = &RunnerBook> {
        self.runners.values()
    }
}
