mod cli;

use clap::Parser;

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(args) => cli::run::execute(args),
        Commands::Check(args) => cli::check::execute(&args.config),
    }
}
