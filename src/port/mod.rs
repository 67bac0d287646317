//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams through which the limit engine reaches the
//! collaborators it does not own: the live market/order cache maintained by
//! the streaming layer, and the order-execution transport.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                                                       ▼
//! ┌──────────────┐                                   ┌───────────────┐
//! │ Market cache │                                   │ Order executor│
//! │   adapter    │                                   │    adapter    │
//! └──────────────┘                                   └───────────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`MarketCache`] - Live prices and order state, read-mostly
//! - [`OrderExecutor`] - Place/cancel submission and in-flight tracking

mod cache;
mod executor;

pub use cache::MarketCache;
pub use executor::{CancelRequest, OrderExecutor};
