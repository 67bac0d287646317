//! Root registry of managed events and markets.
//!
//! [`RulesManager`] owns the only permanent event and market maps; events
//! reference their markets by id and markets reference their event by id.
//! Every rule mutation commits under the replication guard, so subscribers
//! see commands in commit order.
//!
//! Lock order: replication guard, then the event map, then the market map,
//! then a single market, then funds or the rate governor. Management passes
//! never take the replication guard.

mod command;

pub use command::RuleCommand;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::allocation::{distribute, saturating_sum, Share};
use super::event::ManagedEvent;
use super::frequency::BetFrequencyLimit;
use super::funds::ExistingFunds;
use super::market::{ManagedMarket, PassOutcome};
use super::replication::{
    EventState, RegistrySnapshot, ReplicationCommand, ReplicationRecord, ReplicationTx, Replicator,
};
use super::runner::{ManageContext, RunnerRules};
use super::settings::LimitSettings;
use crate::domain::{EventId, MarketId, RunnerId};
use crate::error::RegistryError;
use crate::port::{MarketCache, OrderExecutor};

/// A registered market and its pass guard.
struct MarketHandle {
    market: Mutex<ManagedMarket>,
    in_progress: AtomicBool,
}

impl MarketHandle {
    fn new(market: ManagedMarket) -> Self {
        Self {
            market: Mutex::new(market),
            in_progress: AtomicBool::new(false),
        }
    }
}

/// Marks a market as being managed; cleared on drop.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

enum Unit {
    Market(MarketId),
    Event(EventId),
}

/// Registry of events and markets, and the entry point for rule changes.
pub struct RulesManager {
    settings: Arc<LimitSettings>,
    funds: Arc<ExistingFunds>,
    frequency: Arc<BetFrequencyLimit>,
    replicator: Arc<Replicator>,
    cache: Arc<dyn MarketCache>,
    executor: Arc<dyn OrderExecutor>,
    events: RwLock<BTreeMap<EventId, ManagedEvent>>,
    markets: RwLock<BTreeMap<MarketId, Arc<MarketHandle>>>,
    pending: DashMap<MarketId, DateTime<Utc>>,
    rules_changed: AtomicBool,
    markets_pending: AtomicBool,
}

impl RulesManager {
    /// Create an empty registry. Replication goes through the funds'
    /// replicator so that funds and rule changes share one log.
    #[must_use]
    pub fn new(
        settings: LimitSettings,
        funds: Arc<ExistingFunds>,
        frequency: Arc<BetFrequencyLimit>,
        cache: Arc<dyn MarketCache>,
        executor: Arc<dyn OrderExecutor>,
    ) -> Self {
        let replicator = Arc::clone(funds.replicator());
        Self {
            settings: Arc::new(settings),
            funds,
            frequency,
            replicator,
            cache,
            executor,
            events: RwLock::new(BTreeMap::new()),
            markets: RwLock::new(BTreeMap::new()),
            pending: DashMap::new(),
            rules_changed: AtomicBool::new(false),
            markets_pending: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn funds(&self) -> &Arc<ExistingFunds> {
        &self.funds
    }

    #[must_use]
    pub const fn frequency(&self) -> &Arc<BetFrequencyLimit> {
        &self.frequency
    }

    #[must_use]
    pub fn settings(&self) -> &LimitSettings {
        &self.settings
    }

    // --- events ---

    /// Create an event if missing. Returns whether it was created.
    pub fn add_event(&self, event_id: EventId) -> bool {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let created = Self::ensure_event(&mut tx, &mut events, &event_id);
        if created {
            self.mark_rules_changed();
        }
        created
    }

    /// Set or clear an event's override and redistribute it across the
    /// event's markets straight away.
    pub fn set_event_amount_limit(
        &self,
        event_id: &EventId,
        limit: Option<Decimal>,
    ) -> Result<bool, RegistryError> {
        self.set_event_amount_limit_at(event_id, limit, Utc::now())
    }

    pub fn set_event_amount_limit_at(
        &self,
        event_id: &EventId,
        limit: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<bool, RegistryError> {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| RegistryError::UnknownEvent(event_id.clone()))?;
        let Some(command) = event.set_amount_limit(limit) else {
            return Ok(false);
        };
        tx.publish(command);
        info!(%event_id, limit = ?limit, "Event amount limit set");

        let markets = self.markets.read();
        let capacities = Self::member_capacities(event, &markets);
        let member_capacity = saturating_sum(capacities.iter().map(|(_, capacity)| *capacity));
        let budget = event.budget(member_capacity, self.funds.total_limit());
        let targets = event.distribute(budget, &capacities, self.settings.max_distribution_passes);
        self.apply_limits(&mut tx, &markets, &targets, now);

        self.mark_rules_changed();
        Ok(true)
    }

    /// Remove an event together with its member markets.
    pub fn remove_event(&self, event_id: &EventId) -> bool {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let Some(event) = events.remove(event_id) else {
            return false;
        };
        let mut markets = self.markets.write();
        for market_id in event.market_ids() {
            if markets.remove(market_id).is_some() {
                self.pending.remove(market_id);
                tx.publish(ReplicationCommand::RemoveMarket {
                    market_id: market_id.clone(),
                });
            }
        }
        tx.publish(ReplicationCommand::RemoveEvent {
            event_id: event_id.clone(),
        });
        info!(%event_id, "Event removed");
        self.mark_rules_changed();
        true
    }

    #[must_use]
    pub fn event_ids(&self) -> Vec<EventId> {
        self.events.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn event_state(&self, event_id: &EventId) -> Option<EventState> {
        self.events.read().get(event_id).map(ManagedEvent::state)
    }

    // --- markets ---

    /// Create a market if missing, linking it to `event_id`.
    ///
    /// Returns whether the market was created. Linking an existing market to
    /// a different event than the one it belongs to is an error.
    pub fn add_market(
        &self,
        market_id: MarketId,
        event_id: Option<EventId>,
    ) -> Result<bool, RegistryError> {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let mut markets = self.markets.write();

        if let Some(handle) = markets.get(&market_id) {
            let mut market = handle.market.lock();
            return match (market.event_id().cloned(), event_id) {
                (Some(existing), Some(requested)) if existing != requested => {
                    Err(RegistryError::EventConflict {
                        market_id,
                        existing,
                    })
                }
                (None, Some(requested)) => {
                    Self::link(&mut tx, &mut events, &mut market, requested);
                    self.mark_rules_changed();
                    Ok(false)
                }
                _ => Ok(false),
            };
        }

        let mut market = ManagedMarket::new(market_id.clone(), Arc::clone(&self.settings));
        tx.publish(ReplicationCommand::AddMarket {
            market_id: market_id.clone(),
            event_id: None,
        });
        if let Some(event_id) = event_id {
            Self::link(&mut tx, &mut events, &mut market, event_id);
        }
        info!(%market_id, event_id = ?market.event_id(), "Market added");
        markets.insert(market_id, Arc::new(MarketHandle::new(market)));
        self.mark_rules_changed();
        Ok(true)
    }

    /// Remove a market, unlinking it from its event.
    pub fn remove_market(&self, market_id: &MarketId) -> bool {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let Some(handle) = self.markets.write().remove(market_id) else {
            return false;
        };
        let event_id = handle.market.lock().event_id().cloned();
        if let Some(command) = event_id
            .as_ref()
            .and_then(|event_id| events.get_mut(event_id))
            .and_then(|event| event.remove_market(market_id))
        {
            tx.publish(command);
        }
        tx.publish(ReplicationCommand::RemoveMarket {
            market_id: market_id.clone(),
        });
        self.pending.remove(market_id);
        info!(%market_id, "Market removed");
        self.mark_rules_changed();
        true
    }

    pub fn set_market_amount_limit(
        &self,
        market_id: &MarketId,
        limit: Option<Decimal>,
    ) -> Result<bool, RegistryError> {
        let mut tx = self.replicator.begin();
        let handle = self.handle(market_id)?;
        let Some(command) = handle.market.lock().set_amount_limit(limit) else {
            return Ok(false);
        };
        tx.publish(command);
        self.mark_rules_changed();
        Ok(true)
    }

    /// Create a runner if missing. Returns whether it was created.
    pub fn add_runner(&self, market_id: &MarketId, runner_id: RunnerId) -> Result<bool, RegistryError> {
        let mut tx = self.replicator.begin();
        let handle = self.handle(market_id)?;
        let Some(command) = handle.market.lock().add_runner(runner_id) else {
            return Ok(false);
        };
        tx.publish(command);
        self.mark_for_check(market_id.clone());
        Ok(true)
    }

    /// Apply a partial rule update to a runner, creating the market and the
    /// runner on first reference. Returns whether anything changed.
    pub fn update_runner(&self, market_id: &MarketId, runner_id: RunnerId, rules: &RunnerRules) -> bool {
        let mut tx = self.replicator.begin();
        let handle = self.ensure_market(&mut tx, market_id);
        let commands = handle.market.lock().update_runner(runner_id, rules);
        if commands.is_empty() {
            return false;
        }
        for command in commands {
            tx.publish(command);
        }
        self.mark_for_check(market_id.clone());
        self.mark_rules_changed();
        true
    }

    #[must_use]
    pub fn market_ids(&self) -> Vec<MarketId> {
        self.markets.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn contains_market(&self, market_id: &MarketId) -> bool {
        self.markets.read().contains_key(market_id)
    }

    /// Run `inspect` against a market under its lock.
    pub fn inspect_market<R>(&self, market_id: &MarketId, inspect: impl FnOnce(&ManagedMarket) -> R) -> Option<R> {
        let handle = self.markets.read().get(market_id).cloned()?;
        let market = handle.market.lock();
        Some(inspect(&market))
    }

    // --- commands ---

    /// Parse and apply a textual rule command. Malformed or inapplicable
    /// commands are logged and return `false`.
    pub fn execute_command(&self, text: &str) -> bool {
        let command = match text.parse::<RuleCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!(command = text, error = %e, "Rejected rule command");
                return false;
            }
        };
        debug!(command = text, "Executing rule command");

        let applied = match command {
            RuleCommand::EventLimit {
                event_id,
                amount_limit,
            } => {
                self.add_event(event_id.clone());
                self.set_event_amount_limit(&event_id, amount_limit).map(|_| ())
            }
            RuleCommand::MarketLimit {
                market_id,
                amount_limit,
            } => self
                .add_market(market_id.clone(), None)
                .and_then(|_| self.set_market_amount_limit(&market_id, amount_limit))
                .map(|_| ()),
            RuleCommand::Runner {
                market_id,
                runner_id,
                rules,
            } => {
                self.update_runner(&market_id, runner_id, &rules);
                Ok(())
            }
        };
        match applied {
            Ok(()) => true,
            Err(e) => {
                warn!(command = text, error = %e, "Rule command failed");
                false
            }
        }
    }

    // --- limits ---

    /// Distribute the account budget over events and top-level markets,
    /// then each event's share over its markets.
    pub fn calculate_market_limits(&self) -> usize {
        self.calculate_market_limits_at(Utc::now())
    }

    /// [`Self::calculate_market_limits`] against an explicit clock. Returns
    /// the number of markets whose limit was committed.
    pub fn calculate_market_limits_at(&self, now: DateTime<Utc>) -> usize {
        let mut tx = self.replicator.begin();
        let mut events = self.events.write();
        let markets = self.markets.read();
        Self::repair_links(&mut tx, &mut events, &markets);

        let total = self.funds.total_limit();
        let passes = self.settings.max_distribution_passes;
        let capacities: BTreeMap<MarketId, Decimal> = markets
            .iter()
            .map(|(market_id, handle)| (market_id.clone(), handle.market.lock().capacity()))
            .collect();

        let mut units = Vec::new();
        let mut shares = Vec::new();
        for (market_id, handle) in markets.iter() {
            if handle.market.lock().event_id().is_none() {
                units.push(Unit::Market(market_id.clone()));
                shares.push(Share::equal(capacities[market_id]));
            }
        }
        for event in events.values() {
            let member_capacity = saturating_sum(
                event
                    .market_ids()
                    .filter_map(|market_id| capacities.get(market_id))
                    .copied(),
            );
            units.push(Unit::Event(event.event_id().clone()));
            shares.push(Share::equal(event.budget(member_capacity, total)));
        }

        let mut targets = Vec::with_capacity(markets.len());
        for (unit, amount) in units.into_iter().zip(distribute(total, &shares, passes)) {
            match unit {
                Unit::Market(market_id) => targets.push((market_id, amount)),
                Unit::Event(event_id) => {
                    if let Some(event) = events.get(&event_id) {
                        let members = Self::member_capacities(event, &markets);
                        targets.extend(event.distribute(amount, &members, passes));
                    }
                }
            }
        }

        let committed = self.apply_limits(&mut tx, &markets, &targets, now);
        debug!(%total, markets = targets.len(), committed, "Market limits calculated");
        committed
    }

    /// Re-check delay for a market, from its share of the account budget.
    #[must_use]
    pub fn market_period(&self, market_id: &MarketId) -> Option<Duration> {
        let handle = self.markets.read().get(market_id).cloned()?;
        let limit = handle.market.lock().calculated_limit();
        Some(
            self.frequency
                .manage_market_period(limit, self.funds.total_limit()),
        )
    }

    // --- management passes ---

    /// Run one management pass on a market. Returns `None` when the market
    /// is unknown or a pass is already running on it.
    pub fn manage_market(&self, market_id: &MarketId) -> Option<PassOutcome> {
        self.manage_market_at(market_id, Utc::now())
    }

    pub fn manage_market_at(&self, market_id: &MarketId, now: DateTime<Utc>) -> Option<PassOutcome> {
        let handle = self.markets.read().get(market_id).cloned()?;
        let Some(_guard) = PassGuard::acquire(&handle.in_progress) else {
            debug!(%market_id, "Pass already in progress");
            return None;
        };

        let ctx = ManageContext {
            cache: self.cache.as_ref(),
            executor: self.executor.as_ref(),
            frequency: &self.frequency,
            settings: &self.settings,
            min_order_size: self.funds.min_order_size(self.settings.min_order_size),
            now,
        };
        let outcome = handle.market.lock().manage(&ctx);
        debug!(%market_id, ?outcome, "Management pass finished");
        Some(outcome)
    }

    // --- re-check queue and flags ---

    /// Request a management pass on `market_id` as soon as possible.
    pub fn mark_for_check(&self, market_id: MarketId) {
        self.mark_for_check_at(market_id, Utc::now());
    }

    pub fn mark_for_check_at(&self, market_id: MarketId, now: DateTime<Utc>) {
        self.pending.entry(market_id).or_insert(now);
        self.markets_pending.store(true, Ordering::Release);
    }

    /// Drain the re-check queue, oldest request first.
    pub fn take_pending(&self) -> Vec<MarketId> {
        if !self.markets_pending.swap(false, Ordering::AcqRel) {
            return Vec::new();
        }
        let mut requests: Vec<(MarketId, DateTime<Utc>)> = self
            .pending
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        for (market_id, _) in &requests {
            self.pending.remove(market_id);
        }
        requests.sort_by_key(|(_, requested)| *requested);
        requests.into_iter().map(|(market_id, _)| market_id).collect()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.markets_pending.load(Ordering::Acquire)
    }

    pub fn mark_rules_changed(&self) {
        self.rules_changed.store(true, Ordering::Release);
    }

    /// Read and clear the rules-changed flag.
    pub fn take_rules_changed(&self) -> bool {
        self.rules_changed.swap(false, Ordering::AcqRel)
    }

    // --- replication ---

    /// Create a bounded replication queue and register it.
    pub fn subscribe(&self, capacity: usize) -> Receiver<ReplicationRecord> {
        let (sender, receiver) = bounded(capacity.max(1));
        self.register_queue(sender);
        receiver
    }

    /// Register a queue: it receives a snapshot, then every later command.
    pub fn register_queue(&self, queue: Sender<ReplicationRecord>) -> bool {
        let mut tx = self.replicator.begin();
        let snapshot = self.collect_snapshot();
        tx.register(queue, snapshot)
    }

    pub fn deregister_queue(&self, queue: &Sender<ReplicationRecord>) -> bool {
        self.replicator.begin().deregister(queue)
    }

    /// Full replicated state, consistent with the command log.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let _tx = self.replicator.begin();
        self.collect_snapshot()
    }

    fn collect_snapshot(&self) -> RegistrySnapshot {
        let events = self.events.read();
        let markets = self.markets.read();
        RegistrySnapshot {
            funds: self.funds.state(),
            events: events.values().map(ManagedEvent::state).collect(),
            markets: markets
                .values()
                .map(|handle| handle.market.lock().state())
                .collect(),
        }
    }

    // --- helpers ---

    fn handle(&self, market_id: &MarketId) -> Result<Arc<MarketHandle>, RegistryError> {
        self.markets
            .read()
            .get(market_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMarket(market_id.clone()))
    }

    fn ensure_market(&self, tx: &mut ReplicationTx<'_>, market_id: &MarketId) -> Arc<MarketHandle> {
        let mut markets = self.markets.write();
        let handle = markets.entry(market_id.clone()).or_insert_with(|| {
            tx.publish(ReplicationCommand::AddMarket {
                market_id: market_id.clone(),
                event_id: None,
            });
            info!(%market_id, "Market added");
            Arc::new(MarketHandle::new(ManagedMarket::new(
                market_id.clone(),
                Arc::clone(&self.settings),
            )))
        });
        Arc::clone(handle)
    }

    fn ensure_event(
        tx: &mut ReplicationTx<'_>,
        events: &mut BTreeMap<EventId, ManagedEvent>,
        event_id: &EventId,
    ) -> bool {
        if events.contains_key(event_id) {
            return false;
        }
        events.insert(event_id.clone(), ManagedEvent::new(event_id.clone()));
        tx.publish(ReplicationCommand::AddEvent {
            event_id: event_id.clone(),
        });
        info!(%event_id, "Event added");
        true
    }

    fn link(
        tx: &mut ReplicationTx<'_>,
        events: &mut BTreeMap<EventId, ManagedEvent>,
        market: &mut ManagedMarket,
        event_id: EventId,
    ) {
        Self::ensure_event(tx, events, &event_id);
        if let Some(command) = events
            .get_mut(&event_id)
            .and_then(|event| event.add_market(market.market_id().clone()))
        {
            tx.publish(command);
        }
        market.set_event(Some(event_id));
    }

    /// Make event membership and market links agree again.
    fn repair_links(
        tx: &mut ReplicationTx<'_>,
        events: &mut BTreeMap<EventId, ManagedEvent>,
        markets: &BTreeMap<MarketId, Arc<MarketHandle>>,
    ) {
        for event in events.values_mut() {
            let dangling: Vec<MarketId> = event
                .market_ids()
                .filter(|market_id| {
                    markets.get(*market_id).map_or(true, |handle| {
                        handle.market.lock().event_id() != Some(event.event_id())
                    })
                })
                .cloned()
                .collect();
            for market_id in dangling {
                warn!(event_id = %event.event_id(), %market_id, "Removing dangling event member");
                if let Some(command) = event.remove_market(&market_id) {
                    tx.publish(command);
                }
            }
        }

        for (market_id, handle) in markets {
            let mut market = handle.market.lock();
            let Some(event_id) = market.event_id().cloned() else {
                continue;
            };
            match events.get_mut(&event_id) {
                Some(event) => {
                    if let Some(command) = event.add_market(market_id.clone()) {
                        warn!(%event_id, %market_id, "Relinking market missing from its event");
                        tx.publish(command);
                    }
                }
                None => {
                    warn!(%event_id, %market_id, "Market linked to unknown event, detaching");
                    market.set_event(None);
                    tx.publish(ReplicationCommand::UnlinkMarket {
                        event_id,
                        market_id: market_id.clone(),
                    });
                }
            }
        }
    }

    fn member_capacities(
        event: &ManagedEvent,
        markets: &BTreeMap<MarketId, Arc<MarketHandle>>,
    ) -> Vec<(MarketId, Decimal)> {
        event
            .market_ids()
            .filter_map(|market_id| {
                markets
                    .get(market_id)
                    .map(|handle| (market_id.clone(), handle.market.lock().capacity()))
            })
            .collect()
    }

    /// Commit decreases first so that the budget they free is never handed
    /// out twice, then increases. Markets whose limit moved are queued for a
    /// pass.
    fn apply_limits(
        &self,
        tx: &mut ReplicationTx<'_>,
        markets: &BTreeMap<MarketId, Arc<MarketHandle>>,
        targets: &[(MarketId, Decimal)],
        now: DateTime<Utc>,
    ) -> usize {
        let mut committed = BTreeSet::new();
        for can_increase in [false, true] {
            for (market_id, limit) in targets {
                if can_increase && committed.contains(market_id) {
                    continue;
                }
                let Some(handle) = markets.get(market_id) else {
                    continue;
                };
                let mut market = handle.market.lock();
                let previous = market.calculated_limit();
                let Some(command) = market.set_calculated_limit(*limit, can_increase, now) else {
                    continue;
                };
                if market.calculated_limit() != previous {
                    self.mark_for_check_at(market_id.clone(), now);
                }
                tx.publish(command);
                committed.insert(market_id.clone());
            }
        }
        committed.len()
    }
}
