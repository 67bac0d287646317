//! Background threads driving the registry.
//!
//! - a limits thread recalculates every market's limit periodically, and
//!   straight away after a rule change
//! - a dispatcher decides which markets are due a management pass and hands
//!   them to the worker pool over a bounded queue
//! - workers run the passes; a panic in one pass is logged and the worker
//!   carries on

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use super::rules::RulesManager;
use super::settings::SchedulerSettings;
use crate::domain::MarketId;
use crate::error::Result;

#[derive(Default)]
struct ShutdownState {
    triggered: Mutex<bool>,
    condvar: Condvar,
}

/// Cloneable stop signal that sleeping threads can wait on.
#[derive(Clone, Default)]
pub struct Shutdown {
    state: Arc<ShutdownState>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every waiter. Idempotent.
    pub fn trigger(&self) {
        let mut triggered = self.state.triggered.lock();
        if !*triggered {
            *triggered = true;
            info!("Shutdown requested");
        }
        self.state.condvar.notify_all();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.state.triggered.lock()
    }

    /// Sleep for up to `timeout`. Returns `true` once shutdown is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self.state.triggered.lock();
        while !*triggered {
            if self.state.condvar.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }
}

/// Running management threads.
pub struct ManagementService {
    shutdown: Shutdown,
    threads: Vec<JoinHandle<()>>,
}

impl ManagementService {
    /// Spawn the limits thread, the dispatcher and `settings.workers` workers.
    pub fn start(rules: Arc<RulesManager>, settings: SchedulerSettings, shutdown: Shutdown) -> Result<Self> {
        let workers = settings.workers.max(1);
        let (jobs, queue) = bounded(settings.job_queue_capacity.max(1));
        let mut threads = Vec::with_capacity(workers + 2);

        {
            let rules = Arc::clone(&rules);
            let shutdown = shutdown.clone();
            let settings = settings.clone();
            threads.push(
                thread::Builder::new()
                    .name("limits".into())
                    .spawn(move || run_limits(&rules, &settings, &shutdown))?,
            );
        }
        {
            let rules = Arc::clone(&rules);
            let shutdown = shutdown.clone();
            let interval = settings.dispatch_interval;
            threads.push(
                thread::Builder::new()
                    .name("dispatcher".into())
                    .spawn(move || run_dispatcher(&rules, &jobs, interval, &shutdown))?,
            );
        }
        for index in 0..workers {
            let rules = Arc::clone(&rules);
            let queue = queue.clone();
            threads.push(
                thread::Builder::new()
                    .name(format!("manager-{index}"))
                    .spawn(move || run_worker(&rules, &queue))?,
            );
        }

        info!(workers, limits_period = ?settings.limits_period, "Management service started");
        Ok(Self { shutdown, threads })
    }

    #[must_use]
    pub const fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Trigger shutdown and wait for every thread.
    pub fn stop(self) {
        self.shutdown.trigger();
        self.join();
    }

    /// Wait for every thread; returns once shutdown has been triggered
    /// elsewhere and the threads have drained.
    pub fn join(self) {
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "Management thread panicked");
            }
        }
        info!("Management service stopped");
    }
}

fn run_limits(rules: &RulesManager, settings: &SchedulerSettings, shutdown: &Shutdown) {
    let poll = settings.dispatch_interval.min(settings.limits_period);
    loop {
        rules.take_rules_changed();
        let recalculated = panic::catch_unwind(AssertUnwindSafe(|| rules.calculate_market_limits()));
        if recalculated.is_err() {
            error!("Limit recalculation panicked");
        }

        let deadline = Instant::now() + settings.limits_period;
        loop {
            if shutdown.wait_timeout(poll) {
                return;
            }
            if rules.take_rules_changed() {
                debug!("Rules changed, recalculating limits early");
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
        }
    }
}

fn run_dispatcher(rules: &RulesManager, jobs: &Sender<MarketId>, interval: Duration, shutdown: &Shutdown) {
    let mut due: HashMap<MarketId, Instant> = HashMap::new();

    while !shutdown.wait_timeout(interval) {
        let now = Instant::now();
        let known: HashSet<MarketId> = rules.market_ids().into_iter().collect();
        due.retain(|market_id, _| known.contains(market_id));

        let mut batch = rules.take_pending();
        let requested: HashSet<MarketId> = batch.iter().cloned().collect();
        batch.extend(known.into_iter().filter(|market_id| {
            !requested.contains(market_id) && due.get(market_id).map_or(true, |at| *at <= now)
        }));

        for market_id in batch {
            let Some(period) = rules.market_period(&market_id) else {
                continue;
            };
            match jobs.try_send(market_id.clone()) {
                Ok(()) => {
                    due.insert(market_id, now + period);
                }
                Err(TrySendError::Full(_)) => {
                    warn!(%market_id, "Job queue full, deferring pass");
                    rules.mark_for_check(market_id);
                }
                Err(TrySendError::Disconnected(_)) => {
                    error!("Workers gone, dispatcher stopping");
                    return;
                }
            }
        }
    }
    debug!("Dispatcher stopped");
}

fn run_worker(rules: &RulesManager, queue: &Receiver<MarketId>) {
    for market_id in queue {
        let pass = panic::catch_unwind(AssertUnwindSafe(|| rules.manage_market(&market_id)));
        if pass.is_err() {
            error!(%market_id, "Management pass panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_returns_false_on_timeout() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.wait_timeout(Duration::from_millis(5)));
        assert!(!shutdown.is_triggered());
    }

    #[test]
    fn trigger_wakes_waiters() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            thread::spawn(move || shutdown.wait_timeout(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(10));
        shutdown.trigger();
        shutdown.trigger();

        assert!(waiter.join().unwrap());
        assert!(shutdown.wait_timeout(Duration::from_secs(30)));
    }
}
