//! Builders for domain primitives used across tests.
//!
//! Prices and sizes are given as `(price, size)` pairs so tests read like a
//! ladder.

use rust_decimal::Decimal;

use crate::domain::{CurrentOrder, MarketBook, MarketId, PriceLevel, RunnerBook, RunnerId, Side};

/// Create a [`MarketId`] from a string.
pub fn market_id(id: &str) -> MarketId {
    MarketId::from(id)
}

/// Runner id without handicap.
pub fn runner(selection_id: u64) -> RunnerId {
    RunnerId::selection(selection_id)
}

fn levels(ladder: &[(Decimal, Decimal)]) -> Vec<PriceLevel> {
    ladder
        .iter()
        .map(|(price, size)| PriceLevel::new(*price, *size))
        .collect()
}

/// Runner book from best-first ladders.
pub fn runner_book(
    selection_id: u64,
    available_to_back: &[(Decimal, Decimal)],
    available_to_lay: &[(Decimal, Decimal)],
) -> RunnerBook {
    RunnerBook::new(
        runner(selection_id),
        levels(available_to_back),
        levels(available_to_lay),
    )
}

/// Open pre-play market with the given runner books.
pub fn open_market(id: &str, runners: impl IntoIterator<Item = RunnerBook>) -> MarketBook {
    runners
        .into_iter()
        .fold(MarketBook::new(market_id(id)), MarketBook::with_runner)
}

/// Unmatched back order.
pub fn resting_back(bet_id: &str, price: Decimal, size: Decimal) -> CurrentOrder {
    CurrentOrder::new(bet_id, Side::Back, price).with_remaining(size)
}

/// Unmatched lay order.
pub fn resting_lay(bet_id: &str, price: Decimal, size: Decimal) -> CurrentOrder {
    CurrentOrder::new(bet_id, Side::Lay, price).with_remaining(size)
}

/// Fully matched order.
pub fn matched(bet_id: &str, side: Side, price: Decimal, size: Decimal) -> CurrentOrder {
    CurrentOrder::new(bet_id, side, price).with_matched(size)
}
