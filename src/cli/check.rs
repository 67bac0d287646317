//! Handler for the `check` command.

use std::path::Path;

use anyhow::{bail, Context, Result};
use limitkeeper::application::RuleCommand;
use limitkeeper::infrastructure::config::settings::Config;

/// Validate a configuration file and every startup command in it.
pub fn execute(config_path: &Path) -> Result<()> {
    println!("Checking configuration: {}", config_path.display());

    let config = Config::load(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;

    let mut rejected = 0;
    for command in &config.commands {
        if let Err(e) = command.parse::<RuleCommand>() {
            eprintln!("  ✗ {command}: {e}");
            rejected += 1;
        }
    }
    if rejected > 0 {
        bail!("{rejected} of {} startup commands rejected", config.commands.len());
    }

    println!("✓ Configuration is valid");
    println!();
    println!("Summary:");
    println!("  Available funds: {}", config.funds.available_funds);
    println!("  Minimum reserve: {}", config.funds.minimum_reserve);
    println!("  Orders per hour: {}", config.frequency.orders_per_hour);
    println!("  Workers: {}", config.scheduler.workers);
    println!("  Startup commands: {}", config.commands.len());
    Ok(())
}
