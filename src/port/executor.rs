//! Order execution port.

use rust_decimal::Decimal;

use crate::domain::{BetId, MarketId, RunnerExposure, RunnerId, Side};

/// A request to cancel all or part of a resting order.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelRequest {
    pub market_id: MarketId,
    pub runner_id: RunnerId,
    pub side: Side,
    pub price: Decimal,
    /// Remaining size of the order when the cancel was decided.
    pub size: Decimal,
    pub bet_id: BetId,
    /// Amount to cancel; `None` cancels the whole remainder.
    pub size_reduction: Option<Decimal>,
}

/// Executor for submitting orders to the exchange.
///
/// Submission is fire-and-forget from the engine's point of view: failures
/// are reported as a zero size / `false` and the next management cycle
/// decides again. Retry policy belongs to the implementation.
pub trait OrderExecutor: Send + Sync {
    /// Submit a limit order; returns the size actually submitted.
    fn place_order(
        &self,
        market_id: &MarketId,
        runner_id: &RunnerId,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Decimal;

    /// Submit a cancel; returns whether it was accepted.
    fn cancel_order(&self, request: &CancelRequest) -> bool;

    /// Fold orders submitted but not yet visible in the order stream into
    /// `exposure`.
    fn fold_in_flight(
        &self,
        market_id: &MarketId,
        runner_id: &RunnerId,
        exposure: &mut RunnerExposure,
    );

    /// Executor name for logging.
    fn name(&self) -> &'static str;
}
