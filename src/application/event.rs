//! Grouping of markets under a sporting event.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::allocation::{distribute, Share};
use super::replication::{EventState, ReplicationCommand};
use super::settings::MAX_AMOUNT_LIMIT;
use crate::domain::{EventId, MarketId};

/// An event and the ids of its member markets.
///
/// Members are resolved through the registry at use time; the event keeps
/// no references into it.
#[derive(Debug, Clone)]
pub struct ManagedEvent {
    event_id: EventId,
    amount_limit: Option<Decimal>,
    market_ids: BTreeSet<MarketId>,
}

impl ManagedEvent {
    #[must_use]
    pub const fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            amount_limit: None,
            market_ids: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn event_id(&self) -> &EventId {
        &self.event_id
    }

    #[must_use]
    pub const fn amount_limit(&self) -> Option<Decimal> {
        self.amount_limit
    }

    pub fn market_ids(&self) -> impl Iterator<Item = &MarketId> {
        self.market_ids.iter()
    }

    #[must_use]
    pub fn contains(&self, market_id: &MarketId) -> bool {
        self.market_ids.contains(market_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.market_ids.is_empty()
    }

    /// Set or clear the override. Returns the command to publish on change.
    pub fn set_amount_limit(&mut self, limit: Option<Decimal>) -> Option<ReplicationCommand> {
        let limit = limit.map(|limit| limit.max(Decimal::ZERO));
        if limit.is_some_and(|limit| limit > MAX_AMOUNT_LIMIT) {
            warn!(event_id = %self.event_id, limit = ?limit, "Rejecting event limit above the largest amount");
            return None;
        }
        if self.amount_limit == limit {
            return None;
        }
        self.amount_limit = limit;
        debug!(event_id = %self.event_id, limit = ?limit, "Event amount limit set");
        Some(ReplicationCommand::SetEventAmountLimit {
            event_id: self.event_id.clone(),
            limit,
        })
    }

    pub fn add_market(&mut self, market_id: MarketId) -> Option<ReplicationCommand> {
        if !self.market_ids.insert(market_id.clone()) {
            return None;
        }
        Some(ReplicationCommand::LinkMarket {
            event_id: self.event_id.clone(),
            market_id,
        })
    }

    pub fn remove_market(&mut self, market_id: &MarketId) -> Option<ReplicationCommand> {
        if !self.market_ids.remove(market_id) {
            return None;
        }
        Some(ReplicationCommand::UnlinkMarket {
            event_id: self.event_id.clone(),
            market_id: market_id.clone(),
        })
    }

    /// Budget this event may hand out: its override, else the members'
    /// combined capacity. Never more than the members can absorb nor more
    /// than `account_limit`.
    #[must_use]
    pub fn budget(&self, member_capacity: Decimal, account_limit: Decimal) -> Decimal {
        self.amount_limit
            .unwrap_or(member_capacity)
            .min(member_capacity)
            .min(account_limit)
            .max(Decimal::ZERO)
    }

    /// Split `budget` equally across members, each capped at its capacity.
    #[must_use]
    pub fn distribute(
        &self,
        budget: Decimal,
        capacities: &[(MarketId, Decimal)],
        max_passes: usize,
    ) -> Vec<(MarketId, Decimal)> {
        let shares: Vec<Share> = capacities
            .iter()
            .map(|(_, capacity)| Share::equal(*capacity))
            .collect();
        capacities
            .iter()
            .map(|(market_id, _)| market_id.clone())
            .zip(distribute(budget, &shares, max_passes))
            .collect()
    }

    /// Replicated form of the event.
    #[must_use]
    pub fn state(&self) -> EventState {
        EventState {
            event_id: self.event_id.clone(),
            amount_limit: self.amount_limit,
            market_ids: self.market_ids.iter().cloned().collect(),
        }
    }
}
