//! Limitkeeper - exposure and limit management for betting-exchange trading.
//!
//! The crate keeps a registry of events, markets and runners with their
//! risk rules, divides the account's funds into per-market limits, and runs
//! periodic management passes that place and cancel orders so each runner's
//! exposure tracks its share.
//!
//! # Architecture
//!
//! - [`domain`] - prices, orders, exposure and odds-ladder arithmetic
//! - [`port`] - the market cache and order executor traits
//! - [`application`] - registry, management passes, scheduling, replication
//! - [`adapter`] - in-memory cache and paper executor
//! - [`infrastructure`] - configuration and logging
//! - [`error`] - error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use limitkeeper::adapter::outbound::{MemoryMarketCache, PaperExecutor};
//! use limitkeeper::application::{
//!     BetFrequencyLimit, ExistingFunds, FrequencySettings, LimitSettings, Replicator, RulesManager,
//! };
//! use rust_decimal_macros::dec;
//!
//! let cache = Arc::new(MemoryMarketCache::new());
//! let executor = Arc::new(PaperExecutor::new(Arc::clone(&cache)));
//! let funds = Arc::new(ExistingFunds::new(Arc::new(Replicator::new()), dec!(0), dec!(1)));
//! funds.update_account(dec!(1000), dec!(0));
//!
//! let rules = RulesManager::new(
//!     LimitSettings::default(),
//!     funds,
//!     Arc::new(BetFrequencyLimit::new(FrequencySettings::default())),
//!     cache,
//!     executor,
//! );
//! rules.execute_command("runner 1.234 47972 minBackOdds=2.5 backLimit=40");
//! rules.calculate_market_limits();
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
