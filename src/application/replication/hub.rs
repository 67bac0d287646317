//! Fan-out of committed commands to registered queues.
//!
//! Every mutation commits while holding a [`ReplicationTx`], so the order in
//! which records reach a queue is the order in which mutations were applied.
//! Registration goes through the same guard: a new queue gets a snapshot
//! taken at a point where no mutation is half-published.

use crossbeam::channel::{Sender, TrySendError};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::command::{ReplicationCommand, ReplicationRecord};
use super::snapshot::RegistrySnapshot;

#[derive(Default)]
struct Hub {
    sequence: u64,
    queues: Vec<Sender<ReplicationRecord>>,
}

/// Broadcast list of replication queues.
#[derive(Default)]
pub struct Replicator {
    hub: Mutex<Hub>,
}

impl Replicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a commit. Hold the returned guard across the mutation and the
    /// [`ReplicationTx::publish`] calls describing it.
    pub fn begin(&self) -> ReplicationTx<'_> {
        ReplicationTx {
            hub: self.hub.lock(),
        }
    }

    /// Number of live queues.
    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.hub.lock().queues.len()
    }

    /// Sequence number of the last published command.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.hub.lock().sequence
    }
}

/// Exclusive commit guard over the broadcast list.
pub struct ReplicationTx<'a> {
    hub: MutexGuard<'a, Hub>,
}

impl ReplicationTx<'_> {
    /// Append a command to the log and deliver it to every queue.
    ///
    /// Queues that are full or disconnected are dropped; their subscriber
    /// must re-register to receive a fresh snapshot.
    pub fn publish(&mut self, command: ReplicationCommand) {
        self.hub.sequence += 1;
        let record = ReplicationRecord {
            sequence: self.hub.sequence,
            command,
        };
        if self.hub.queues.is_empty() {
            return;
        }

        debug!(
            sequence = record.sequence,
            kind = record.command.kind(),
            queues = self.hub.queues.len(),
            "Publishing replication command"
        );
        self.hub.queues.retain(|queue| match queue.try_send(record.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(sequence = record.sequence, "Replication queue full, dropping subscriber");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Replication queue disconnected");
                false
            }
        });
    }

    /// Register a queue: deliver `snapshot` first, then every later command.
    ///
    /// Returns `false` when the snapshot could not be delivered.
    pub fn register(&mut self, queue: Sender<ReplicationRecord>, snapshot: RegistrySnapshot) -> bool {
        let record = ReplicationRecord {
            sequence: self.hub.sequence,
            command: ReplicationCommand::Snapshot(Box::new(snapshot)),
        };
        if let Err(e) = queue.try_send(record) {
            warn!(error = %e, "Failed to deliver replication snapshot");
            return false;
        }
        self.hub.queues.push(queue);
        debug!(queues = self.hub.queues.len(), "Replication queue registered");
        true
    }

    /// Remove a previously registered queue.
    pub fn deregister(&mut self, queue: &Sender<ReplicationRecord>) -> bool {
        let before = self.hub.queues.len();
        self.hub.queues.retain(|q| !q.same_channel(queue));
        before != self.hub.queues.len()
    }
}
