//! Live order state supplied by the streaming cache.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{BetId, MarketId, RunnerId};
use super::side::Side;

/// An order as last reported by the exchange stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentOrder {
    pub bet_id: BetId,
    pub side: Side,
    /// Requested price.
    pub price: Decimal,
    /// Portion already matched.
    pub size_matched: Decimal,
    /// Portion still resting in the book.
    pub size_remaining: Decimal,
    /// Average matched price, when it differs from the requested one.
    pub average_price_matched: Option<Decimal>,
}

impl CurrentOrder {
    #[must_use]
    pub fn new(bet_id: impl Into<BetId>, side: Side, price: Decimal) -> Self {
        Self {
            bet_id: bet_id.into(),
            side,
            price,
            size_matched: Decimal::ZERO,
            size_remaining: Decimal::ZERO,
            average_price_matched: None,
        }
    }

    #[must_use]
    pub const fn with_matched(mut self, size: Decimal) -> Self {
        self.size_matched = size;
        self
    }

    #[must_use]
    pub const fn with_remaining(mut self, size: Decimal) -> Self {
        self.size_remaining = size;
        self
    }

    /// Price the matched portion was filled at.
    #[must_use]
    pub fn matched_price(&self) -> Decimal {
        self.average_price_matched.unwrap_or(self.price)
    }

    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        self.size_remaining > Decimal::ZERO
    }
}

/// Snapshot of all of the account's orders on one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketOrders {
    market_id: Option<MarketId>,
    runners: HashMap<RunnerId, Vec<CurrentOrder>>,
}

impl MarketOrders {
    #[must_use]
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id: Some(market_id),
            runners: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_order(mut self, runner_id: RunnerId, order: CurrentOrder) -> Self {
        self.push(runner_id, order);
        self
    }

    pub fn push(&mut self, runner_id: RunnerId, order: CurrentOrder) {
        self.runners.entry(runner_id).or_default().push(order);
    }

    #[must_use]
    pub fn market_id(&self) -> Option<&MarketId> {
        self.market_id.as_ref()
    }

    /// Orders on one runner; empty when the runner has none.
    #[must_use]
    pub fn orders(&self, runner_id: &RunnerId) -> &[CurrentOrder] {
        self.runners.get(runner_id).map_or(&[], Vec::as_slice)
    }

    pub fn orders_mut(&mut self, runner_id: &RunnerId) -> Option<&mut Vec<CurrentOrder>> {
        self.runners.get_mut(runner_id)
    }

    /// Look up one order by bet id.
    pub fn order_mut(&mut self, runner_id: &RunnerId, bet_id: &BetId) -> Option<&mut CurrentOrder> {
        self.runners
            .get_mut(runner_id)?
            .iter_mut()
            .find(|order| &order.bet_id == bet_id)
    }

    /// Whether any runner still has an unmatched order.
    #[must_use]
    pub fn has_unmatched(&self) -> bool {
        self.runners
            .values()
            .flatten()
            .any(CurrentOrder::is_unmatched)
    }
}
