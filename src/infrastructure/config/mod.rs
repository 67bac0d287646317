//! Infrastructure configuration modules.

pub mod frequency;
pub mod funds;
pub mod limits;
pub mod logging;
pub mod scheduler;
pub mod settings;
