//! Handler for the `run` command.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use limitkeeper::adapter::outbound::{MemoryMarketCache, PaperExecutor};
use limitkeeper::application::{
    BetFrequencyLimit, ExistingFunds, ManagementService, ReplicationRecord, Replicator, RulesManager, Shutdown,
};
use limitkeeper::infrastructure::config::logging::LogFormat;
use limitkeeper::infrastructure::config::settings::Config;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::cli::RunArgs;

/// Execute the run command. Blocks until Ctrl+C.
pub fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.init_logging();

    let cache = Arc::new(MemoryMarketCache::new());
    let executor = Arc::new(PaperExecutor::new(Arc::clone(&cache)));
    let funds = Arc::new(ExistingFunds::new(
        Arc::new(Replicator::new()),
        config.funds.minimum_reserve,
        config.funds.currency_rate,
    ));
    funds.update_account(config.funds.available_funds, Decimal::ZERO);
    let frequency = Arc::new(BetFrequencyLimit::new(config.frequency.clone().into()));
    let rules = Arc::new(RulesManager::new(
        config.limits.clone().into(),
        Arc::clone(&funds),
        frequency,
        cache,
        executor.clone(),
    ));

    let replica_writer = match &args.replica_log {
        Some(path) => Some(spawn_replica_writer(
            path,
            rules.subscribe(config.replication.queue_capacity),
        )?),
        None => None,
    };

    let applied = config
        .commands
        .iter()
        .filter(|command| rules.execute_command(command))
        .count();
    info!(
        applied,
        rejected = config.commands.len() - applied,
        total_limit = %funds.total_limit(),
        "limitkeeper starting"
    );

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.trigger()) {
            warn!(error = %e, "Failed to set Ctrl-C handler, shutdown via code only");
        }
    }

    let service = ManagementService::start(Arc::clone(&rules), config.scheduler.clone().into(), shutdown.clone())
        .context("failed to start management service")?;

    let settle_interval = Duration::from_millis(args.settle_interval_ms.max(1));
    while !shutdown.wait_timeout(settle_interval) {
        executor.settle();
    }
    service.join();

    // the writer ends once the replicator, and with it the queue, is dropped
    drop(rules);
    drop(funds);
    if let Some(writer) = replica_writer {
        if writer.join().is_err() {
            error!("Replica writer panicked");
        }
    }

    info!("limitkeeper stopped");
    Ok(())
}

fn spawn_replica_writer(path: &Path, queue: Receiver<ReplicationRecord>) -> Result<thread::JoinHandle<()>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open replica log {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let handle = thread::Builder::new()
        .name("replica-log".into())
        .spawn(move || {
            for record in queue {
                let written = serde_json::to_writer(&mut out, &record)
                    .map_err(std::io::Error::from)
                    .and_then(|()| out.write_all(b"\n"))
                    .and_then(|()| out.flush());
                if let Err(e) = written {
                    error!(error = %e, sequence = record.sequence, "Failed to write replication record");
                    return;
                }
            }
        })?;
    Ok(handle)
}
