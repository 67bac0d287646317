//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`executor`] - `RecordingExecutor`, an [`OrderExecutor`](crate::port::OrderExecutor)
//!   that records every place and cancel instead of submitting it.
//! - [`domain`] - Builders for books, orders and ids.
//! - [`harness`] - Bundles the collaborators of a management pass.

pub mod domain;
pub mod executor;
pub mod harness;
