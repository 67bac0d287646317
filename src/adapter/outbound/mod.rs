//! Outbound adapters (driven side).
//!
//! - [`MemoryMarketCache`] - in-memory live cache fed by a stream handler
//! - [`PaperExecutor`] - paper-trading executor resting orders in that cache

mod memory;
mod paper;

pub use memory::MemoryMarketCache;
pub use paper::PaperExecutor;
