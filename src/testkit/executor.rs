//! Order executor that records requests.

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{MarketId, RunnerExposure, RunnerId, Side};
use crate::port::{CancelRequest, OrderExecutor};

/// A place request seen by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub market_id: MarketId,
    pub runner_id: RunnerId,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// Accepts every request and keeps a log of them.
#[derive(Default)]
pub struct RecordingExecutor {
    placed: Mutex<Vec<PlacedOrder>>,
    cancels: Mutex<Vec<CancelRequest>>,
    in_flight: Mutex<HashMap<(MarketId, RunnerId), Vec<(Side, Decimal, Decimal)>>>,
    reject: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor that records requests but reports every one as failed.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    /// Pretend an order is in flight for `runner_id`.
    pub fn with_in_flight(
        self,
        market_id: &str,
        runner_id: RunnerId,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        self.in_flight
            .lock()
            .entry((MarketId::from(market_id), runner_id))
            .or_default()
            .push((side, price, size));
        self
    }

    pub fn placed(&self) -> Vec<PlacedOrder> {
        self.placed.lock().clone()
    }

    pub fn cancels(&self) -> Vec<CancelRequest> {
        self.cancels.lock().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.placed.lock().clear();
        self.cancels.lock().clear();
    }
}

impl OrderExecutor for RecordingExecutor {
    fn place_order(
        &self,
        market_id: &MarketId,
        runner_id: &RunnerId,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Decimal {
        self.placed.lock().push(PlacedOrder {
            market_id: market_id.clone(),
            runner_id: *runner_id,
            side,
            price,
            size,
        });
        if self.reject {
            Decimal::ZERO
        } else {
            size
        }
    }

    fn cancel_order(&self, request: &CancelRequest) -> bool {
        self.cancels.lock().push(request.clone());
        !self.reject
    }

    fn fold_in_flight(&self, market_id: &MarketId, runner_id: &RunnerId, exposure: &mut RunnerExposure) {
        if let Some(orders) = self.in_flight.lock().get(&(market_id.clone(), *runner_id)) {
            for (side, price, size) in orders {
                exposure.add_in_flight(*side, *price, *size);
            }
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
