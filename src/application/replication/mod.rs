//! Replication of committed rule mutations into other processes.
//!
//! Modelled as an ordered log of immutable, tagged records:
//!
//! - [`Replicator`] - serialises commits and fans records out to queues
//! - [`ReplicationCommand`] / [`ReplicationRecord`] - the log entries
//! - [`RegistrySnapshot`] - full state handed to a new queue
//! - [`ReplicaStore`] - rebuilds state from a queue on the subscriber side

mod command;
mod hub;
mod replica;
mod snapshot;

pub use command::{ReplicationCommand, ReplicationRecord, RunnerRule};
pub use hub::{ReplicationTx, Replicator};
pub use replica::ReplicaStore;
pub use snapshot::{EventState, FundsState, MarketState, RegistrySnapshot, RunnerState};
