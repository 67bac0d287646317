//! Subscriber side of replication.

use std::collections::{BTreeMap, BTreeSet};

use crossbeam::channel::Receiver;
use tracing::{debug, error, warn};

use super::command::{ReplicationCommand, ReplicationRecord, RunnerRule};
use super::snapshot::{EventState, FundsState, MarketState, RegistrySnapshot, RunnerState};
use crate::domain::{EventId, MarketId, RunnerId};

/// Mirror of the registry rebuilt from a replication queue.
#[derive(Debug, Default)]
pub struct ReplicaStore {
    funds: FundsState,
    events: BTreeMap<EventId, EventMirror>,
    markets: BTreeMap<MarketId, MarketMirror>,
    /// Sequence of the last applied record; `None` until the snapshot arrives.
    sequence: Option<u64>,
    out_of_sync: bool,
}

#[derive(Debug)]
struct EventMirror {
    amount_limit: Option<rust_decimal::Decimal>,
    market_ids: BTreeSet<MarketId>,
}

#[derive(Debug)]
struct MarketMirror {
    state: MarketState,
    runners: BTreeMap<RunnerId, RunnerState>,
}

impl ReplicaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every record currently waiting in `queue`; returns how many
    /// were applied.
    pub fn drain(&mut self, queue: &Receiver<ReplicationRecord>) -> usize {
        queue
            .try_iter()
            .map(|record| self.apply(record))
            .filter(|applied| *applied)
            .count()
    }

    /// Apply one record. Records out of sequence are logged and ignored.
    pub fn apply(&mut self, record: ReplicationRecord) -> bool {
        if let ReplicationCommand::Snapshot(snapshot) = record.command {
            self.load(*snapshot);
            self.sequence = Some(record.sequence);
            self.out_of_sync = false;
            return true;
        }

        let Some(last) = self.sequence else {
            warn!(sequence = record.sequence, "Command before snapshot, ignoring");
            return false;
        };
        if record.sequence <= last {
            debug!(sequence = record.sequence, last, "Duplicate replication command");
            return false;
        }
        if record.sequence != last + 1 {
            error!(
                sequence = record.sequence,
                expected = last + 1,
                "Replication gap, replica needs a fresh snapshot"
            );
            self.out_of_sync = true;
            return false;
        }

        self.sequence = Some(record.sequence);
        self.apply_command(record.command);
        true
    }

    /// Whether a gap was detected since the last snapshot.
    #[must_use]
    pub const fn is_out_of_sync(&self) -> bool {
        self.out_of_sync
    }

    #[must_use]
    pub const fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    #[must_use]
    pub const fn funds(&self) -> &FundsState {
        &self.funds
    }

    /// Current mirrored state in snapshot form.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            funds: self.funds,
            events: self
                .events
                .iter()
                .map(|(event_id, event)| EventState {
                    event_id: event_id.clone(),
                    amount_limit: event.amount_limit,
                    market_ids: event.market_ids.iter().cloned().collect(),
                })
                .collect(),
            markets: self
                .markets
                .values()
                .map(|market| MarketState {
                    runners: market.runners.values().cloned().collect(),
                    ..market.state.clone()
                })
                .collect(),
        }
    }

    fn load(&mut self, snapshot: RegistrySnapshot) {
        self.funds = snapshot.funds;
        self.events = snapshot
            .events
            .into_iter()
            .map(|event| {
                let mirror = EventMirror {
                    amount_limit: event.amount_limit,
                    market_ids: event.market_ids.into_iter().collect(),
                };
                (event.event_id, mirror)
            })
            .collect();
        self.markets = snapshot
            .markets
            .into_iter()
            .map(|mut state| {
                let runners = std::mem::take(&mut state.runners)
                    .into_iter()
                    .map(|runner| (runner.runner_id, runner))
                    .collect();
                (state.market_id.clone(), MarketMirror { state, runners })
            })
            .collect();
    }

    fn apply_command(&mut self, command: ReplicationCommand) {
        match command {
            ReplicationCommand::Snapshot(_) => {}
            ReplicationCommand::SetReserve(value) => self.funds.reserve = value,
            ReplicationCommand::SetAvailableFunds(value) => self.funds.available_funds = value,
            ReplicationCommand::SetExposure(value) => self.funds.exposure = value,
            ReplicationCommand::SetCurrencyRate(value) => self.funds.currency_rate = value,
            ReplicationCommand::AddEvent { event_id } => {
                self.events.entry(event_id).or_insert_with(|| EventMirror {
                    amount_limit: None,
                    market_ids: BTreeSet::new(),
                });
            }
            ReplicationCommand::RemoveEvent { event_id } => {
                self.events.remove(&event_id);
            }
            ReplicationCommand::SetEventAmountLimit { event_id, limit } => {
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.amount_limit = limit;
                }
            }
            ReplicationCommand::LinkMarket {
                event_id,
                market_id,
            } => {
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.market_ids.insert(market_id.clone());
                }
                if let Some(market) = self.markets.get_mut(&market_id) {
                    market.state.event_id = Some(event_id);
                }
            }
            ReplicationCommand::UnlinkMarket {
                event_id,
                market_id,
            } => {
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.market_ids.remove(&market_id);
                }
                if let Some(market) = self.markets.get_mut(&market_id) {
                    if market.state.event_id.as_ref() == Some(&event_id) {
                        market.state.event_id = None;
                    }
                }
            }
            ReplicationCommand::AddMarket {
                market_id,
                event_id,
            } => {
                self.markets
                    .entry(market_id.clone())
                    .or_insert_with(|| MarketMirror {
                        state: MarketState::new(market_id, event_id),
                        runners: BTreeMap::new(),
                    });
            }
            ReplicationCommand::RemoveMarket { market_id } => {
                self.markets.remove(&market_id);
            }
            ReplicationCommand::SetMarketAmountLimit { market_id, limit } => {
                if let Some(market) = self.markets.get_mut(&market_id) {
                    market.state.amount_limit = limit;
                }
            }
            ReplicationCommand::SetCalculatedLimit {
                market_id,
                limit,
                stamp,
            } => {
                if let Some(market) = self.markets.get_mut(&market_id) {
                    market.state.calculated_limit = limit;
                    market.state.calculated_limit_stamp = Some(stamp);
                }
            }
            ReplicationCommand::AddRunner {
                market_id,
                runner_id,
            } => {
                if let Some(market) = self.markets.get_mut(&market_id) {
                    market
                        .runners
                        .entry(runner_id)
                        .or_insert_with(|| RunnerState::new(runner_id));
                }
            }
            ReplicationCommand::SetRunnerRule {
                market_id,
                runner_id,
                rule,
            } => {
                let Some(runner) = self
                    .markets
                    .get_mut(&market_id)
                    .and_then(|market| market.runners.get_mut(&runner_id))
                else {
                    warn!(%market_id, %runner_id, "Rule for unknown replicated runner");
                    return;
                };
                match rule {
                    RunnerRule::MinBackOdds(odds) => runner.min_back_odds = Some(odds),
                    RunnerRule::MaxLayOdds(odds) => runner.max_lay_odds = Some(odds),
                    RunnerRule::BackAmountLimit(limit) => runner.back_amount_limit = limit,
                    RunnerRule::LayAmountLimit(limit) => runner.lay_amount_limit = limit,
                }
            }
        }
    }
}
