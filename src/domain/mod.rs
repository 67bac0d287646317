//! Exchange-agnostic domain types.

mod book;
mod exposure;
mod ids;
mod orders;
mod side;

pub mod odds;

pub use book::{MarketBook, MarketStatus, PriceLevel, RunnerBook};
pub use exposure::{MarketExposure, RunnerExposure};
pub use ids::{BetId, EventId, MarketId, RunnerId, RunnerIdParseError};
pub use orders::{CurrentOrder, MarketOrders};
pub use side::Side;
