//! Full replicated state sent to a newly registered queue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, MarketId, RunnerId};

/// Account funds as replicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsState {
    pub reserve: Decimal,
    pub available_funds: Decimal,
    pub exposure: Decimal,
    pub currency_rate: Decimal,
}

/// Rules of one runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerState {
    pub runner_id: RunnerId,
    pub min_back_odds: Option<Decimal>,
    pub max_lay_odds: Option<Decimal>,
    pub back_amount_limit: Decimal,
    pub lay_amount_limit: Decimal,
}

impl RunnerState {
    #[must_use]
    pub const fn new(runner_id: RunnerId) -> Self {
        Self {
            runner_id,
            min_back_odds: None,
            max_lay_odds: None,
            back_amount_limit: Decimal::ZERO,
            lay_amount_limit: Decimal::ZERO,
        }
    }
}

/// Rules and calculated limit of one market. Runners are sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub market_id: MarketId,
    pub event_id: Option<EventId>,
    pub amount_limit: Option<Decimal>,
    pub calculated_limit: Decimal,
    pub calculated_limit_stamp: Option<DateTime<Utc>>,
    pub runners: Vec<RunnerState>,
}

impl MarketState {
    #[must_use]
    pub const fn new(market_id: MarketId, event_id: Option<EventId>) -> Self {
        Self {
            market_id,
            event_id,
            amount_limit: None,
            calculated_limit: Decimal::ZERO,
            calculated_limit_stamp: None,
            runners: Vec::new(),
        }
    }
}

/// Rules of one event. Member market ids are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventState {
    pub event_id: EventId,
    pub amount_limit: Option<Decimal>,
    pub market_ids: Vec<MarketId>,
}

/// Complete replicated state, with events and markets sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub funds: FundsState,
    pub events: Vec<EventState>,
    pub markets: Vec<MarketState>,
}
