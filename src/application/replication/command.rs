//! Replication command records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::snapshot::RegistrySnapshot;
use crate::domain::{EventId, MarketId, RunnerId};

/// One runner rule field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RunnerRule {
    MinBackOdds(Decimal),
    MaxLayOdds(Decimal),
    BackAmountLimit(Decimal),
    LayAmountLimit(Decimal),
}

/// A committed mutation, carrying owned copies of its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ReplicationCommand {
    /// Full state; always the first record a queue receives.
    Snapshot(Box<RegistrySnapshot>),

    SetReserve(Decimal),
    SetAvailableFunds(Decimal),
    SetExposure(Decimal),
    SetCurrencyRate(Decimal),

    AddEvent {
        event_id: EventId,
    },
    RemoveEvent {
        event_id: EventId,
    },
    SetEventAmountLimit {
        event_id: EventId,
        limit: Option<Decimal>,
    },
    LinkMarket {
        event_id: EventId,
        market_id: MarketId,
    },
    UnlinkMarket {
        event_id: EventId,
        market_id: MarketId,
    },

    AddMarket {
        market_id: MarketId,
        event_id: Option<EventId>,
    },
    RemoveMarket {
        market_id: MarketId,
    },
    SetMarketAmountLimit {
        market_id: MarketId,
        limit: Option<Decimal>,
    },
    SetCalculatedLimit {
        market_id: MarketId,
        limit: Decimal,
        stamp: DateTime<Utc>,
    },

    AddRunner {
        market_id: MarketId,
        runner_id: RunnerId,
    },
    SetRunnerRule {
        market_id: MarketId,
        runner_id: RunnerId,
        rule: RunnerRule,
    },
}

impl ReplicationCommand {
    /// Stable name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::SetReserve(_) => "set_reserve",
            Self::SetAvailableFunds(_) => "set_available_funds",
            Self::SetExposure(_) => "set_exposure",
            Self::SetCurrencyRate(_) => "set_currency_rate",
            Self::AddEvent { .. } => "add_event",
            Self::RemoveEvent { .. } => "remove_event",
            Self::SetEventAmountLimit { .. } => "set_event_amount_limit",
            Self::LinkMarket { .. } => "link_market",
            Self::UnlinkMarket { .. } => "unlink_market",
            Self::AddMarket { .. } => "add_market",
            Self::RemoveMarket { .. } => "remove_market",
            Self::SetMarketAmountLimit { .. } => "set_market_amount_limit",
            Self::SetCalculatedLimit { .. } => "set_calculated_limit",
            Self::AddRunner { .. } => "add_runner",
            Self::SetRunnerRule { .. } => "set_runner_rule",
        }
    }
}

/// A command stamped with its position in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationRecord {
    /// Snapshots carry the sequence of the last command they include.
    pub sequence: u64,
    pub command: ReplicationCommand,
}
