//! Application services (use cases).
//!
//! The registry, the per-market management passes and the threads that
//! schedule them. Everything here talks to the outside world only through
//! the ports in [`crate::port`].

pub mod allocation;
pub mod event;
pub mod frequency;
pub mod funds;
pub mod market;
pub mod replication;
pub mod rules;
pub mod runner;
pub mod scheduler;
pub mod settings;

pub use allocation::{distribute, Share};
pub use event::ManagedEvent;
pub use frequency::BetFrequencyLimit;
pub use funds::ExistingFunds;
pub use market::{ManagedMarket, PassOutcome};
pub use replication::{ReplicaStore, ReplicationCommand, ReplicationRecord, Replicator};
pub use rules::{RuleCommand, RulesManager};
pub use runner::{ManageContext, ManagedRunner, RunnerRules};
pub use scheduler::{ManagementService, Shutdown};
pub use settings::{FrequencySettings, LimitSettings, SchedulerSettings, MAX_AMOUNT_LIMIT};
