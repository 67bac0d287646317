//! Paper-trading order executor.
//!
//! Orders never leave the process. A placed order is held in flight until
//! [`PaperExecutor::settle`] rests it in the [`MemoryMarketCache`], which
//! mimics the delay between submission and the order stream reporting it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use super::memory::MemoryMarketCache;
use crate::domain::{BetId, CurrentOrder, MarketId, RunnerExposure, RunnerId, Side};
use crate::port::{CancelRequest, OrderExecutor};

#[derive(Debug, Clone)]
struct InFlight {
    runner_id: RunnerId,
    order: CurrentOrder,
}

/// Executor that simulates order submission against the memory cache.
pub struct PaperExecutor {
    cache: Arc<MemoryMarketCache>,
    in_flight: Mutex<HashMap<MarketId, Vec<InFlight>>>,
}

impl PaperExecutor {
    #[must_use]
    pub fn new(cache: Arc<MemoryMarketCache>) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Rest every in-flight order in the cache. Returns how many were moved.
    pub fn settle(&self) -> usize {
        let drained: Vec<(MarketId, Vec<InFlight>)> = self.in_flight.lock().drain().collect();
        let mut settled = 0;
        for (market_id, orders) in drained {
            for InFlight { runner_id, order } in orders {
                self.cache.push_order(&market_id, runner_id, order);
                settled += 1;
            }
        }
        if settled > 0 {
            debug!(settled, "Paper orders rested");
        }
        settled
    }

    /// Number of orders not yet rested.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().values().map(Vec::len).sum()
    }
}

impl OrderExecutor for PaperExecutor {
    fn place_order(
        &self,
        market_id: &MarketId,
        runner_id: &RunnerId,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Decimal {
        if size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let bet_id = BetId::new(Uuid::new_v4().to_string());
        info!(%market_id, runner = %runner_id, %side, %price, %size, %bet_id, "Paper order placed");

        let order = CurrentOrder::new(bet_id, side, price).with_remaining(size);
        self.in_flight
            .lock()
            .entry(market_id.clone())
            .or_default()
            .push(InFlight {
                runner_id: *runner_id,
                order,
            });
        size
    }

    fn cancel_order(&self, request: &CancelRequest) -> bool {
        let reduce = |order: &mut CurrentOrder| {
            let size = request
                .size_reduction
                .map_or(order.size_remaining, |r| r.min(order.size_remaining));
            order.size_remaining -= size;
        };

        {
            let mut in_flight = self.in_flight.lock();
            if let Some(entry) = in_flight
                .get_mut(&request.market_id)
                .and_then(|orders| orders.iter_mut().find(|o| o.order.bet_id == request.bet_id))
            {
                reduce(&mut entry.order);
                debug!(bet_id = %request.bet_id, "Paper in-flight order cancelled");
                return true;
            }
        }

        let cancelled = self
            .cache
            .modify_order(&request.market_id, &request.runner_id, &request.bet_id, reduce);
        if cancelled {
            debug!(
                bet_id = %request.bet_id,
                reduction = ?request.size_reduction,
                "Paper order cancelled"
            );
        }
        cancelled
    }

    fn fold_in_flight(&self, market_id: &MarketId, runner_id: &RunnerId, exposure: &mut RunnerExposure) {
        let in_flight = self.in_flight.lock();
        let Some(orders) = in_flight.get(market_id) else {
            return;
        };
        for entry in orders.iter().filter(|o| &o.runner_id == runner_id) {
            exposure.add_in_flight(entry.order.side, entry.order.price, entry.order.size_remaining);
        }
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MarketCache;
    use rust_decimal_macros::dec;

    fn executor() -> (Arc<MemoryMarketCache>, PaperExecutor) {
        let cache = Arc::new(MemoryMarketCache::new());
        let executor = PaperExecutor::new(cache.clone());
        (cache, executor)
    }

    #[test]
    fn placed_orders_are_in_flight_until_settled() {
        let (cache, executor) = executor();
        let market_id = MarketId::from("1.3");
        let runner = RunnerId::selection(7);

        let size = executor.place_order(&market_id, &runner, Side::Back, dec!(2.5), dec!(10));
        assert_eq!(size, dec!(10));

        let mut exposure = RunnerExposure::default();
        executor.fold_in_flight(&market_id, &runner, &mut exposure);
        assert_eq!(exposure.total(Side::Back), dec!(10));
        assert!(cache.orders(&market_id).is_none());

        assert_eq!(executor.settle(), 1);
        assert_eq!(executor.in_flight_count(), 0);
        let orders = cache.orders(&market_id).unwrap();
        assert_eq!(orders.orders(&runner)[0].size_remaining, dec!(10));
    }

    #[test]
    fn cancel_reduces_resting_order() {
        let (cache, executor) = executor();
        let market_id = MarketId::from("1.3");
        let runner = RunnerId::selection(7);
        executor.place_order(&market_id, &runner, Side::Lay, dec!(3), dec!(10));
        executor.settle();

        let bet_id = cache.orders(&market_id).unwrap().orders(&runner)[0].bet_id.clone();
        let request = CancelRequest {
            market_id: market_id.clone(),
            runner_id: runner,
            side: Side::Lay,
            price: dec!(3),
            size: dec!(10),
            bet_id,
            size_reduction: Some(dec!(4)),
        };
        assert!(executor.cancel_order(&request));
        assert_eq!(
            cache.orders(&market_id).unwrap().orders(&runner)[0].size_remaining,
            dec!(6)
        );
    }

    #[test]
    fn cancel_unknown_bet_fails() {
        let (_, executor) = executor();
        let request = CancelRequest {
            market_id: MarketId::from("1.3"),
            runner_id: RunnerId::selection(1),
            side: Side::Back,
            price: dec!(2),
            size: dec!(2),
            bet_id: BetId::from("missing"),
            size_reduction: None,
        };
        assert!(!executor.cancel_order(&request));
    }
}
