//! Thread-safe in-memory market cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{BetId, CurrentOrder, MarketBook, MarketId, MarketOrders, RunnerId};
use crate::port::MarketCache;

/// Live cache of market books and account orders.
///
/// Readers get `Arc` snapshots; writers replace or copy-on-write the stored
/// snapshot, so a management pass keeps a consistent view for its duration.
#[derive(Default)]
pub struct MemoryMarketCache {
    markets: RwLock<HashMap<MarketId, Arc<MarketBook>>>,
    orders: RwLock<HashMap<MarketId, Arc<MarketOrders>>>,
}

impl MemoryMarketCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the book of a market.
    pub fn update_market(&self, book: MarketBook) {
        let market_id = book.market_id().clone();
        self.markets.write().insert(market_id, Arc::new(book));
    }

    /// Replace the order state of a market.
    pub fn update_orders(&self, market_id: MarketId, orders: MarketOrders) {
        self.orders.write().insert(market_id, Arc::new(orders));
    }

    /// Drop a market and its orders.
    pub fn remove_market(&self, market_id: &MarketId) -> bool {
        let book = self.markets.write().remove(market_id).is_some();
        let orders = self.orders.write().remove(market_id).is_some();
        book || orders
    }

    /// Append one order to a market's order state.
    pub fn push_order(&self, market_id: &MarketId, runner_id: RunnerId, order: CurrentOrder) {
        let mut orders = self.orders.write();
        let entry = orders
            .entry(market_id.clone())
            .or_insert_with(|| Arc::new(MarketOrders::new(market_id.clone())));
        Arc::make_mut(entry).push(runner_id, order);
    }

    /// Apply `update` to one resting order; `false` when the order is unknown.
    pub fn modify_order(
        &self,
        market_id: &MarketId,
        runner_id: &RunnerId,
        bet_id: &BetId,
        update: impl FnOnce(&mut CurrentOrder),
    ) -> bool {
        let mut orders = self.orders.write();
        let Some(entry) = orders.get_mut(market_id) else {
            return false;
        };
        match Arc::make_mut(entry).order_mut(runner_id, bet_id) {
            Some(order) => {
                update(order);
                true
            }
            None => {
                debug!(%market_id, %bet_id, "Order not in cache");
                false
            }
        }
    }

    /// Match part of a resting order.
    pub fn fill(&self, market_id: &MarketId, runner_id: &RunnerId, bet_id: &BetId, size: Decimal) -> bool {
        self.modify_order(market_id, runner_id, bet_id, |order| {
            let size = size.min(order.size_remaining);
            order.size_remaining -= size;
            order.size_matched += size;
        })
    }

    #[must_use]
    pub fn market_ids(&self) -> Vec<MarketId> {
        self.markets.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MarketCache for MemoryMarketCache {
    fn market(&self, market_id: &MarketId) -> Option<Arc<MarketBook>> {
        self.markets.read().get(market_id).cloned()
    }

    fn orders(&self, market_id: &MarketId) -> Option<Arc<MarketOrders>> {
        self.orders.read().get(market_id).cloned()
    }
}
