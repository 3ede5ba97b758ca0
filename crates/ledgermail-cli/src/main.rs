//! ledgermail - Route emailed credit memos through extraction into the ledger.

use clap::Parser;
use ledgermail_cli::commands;
use ledgermail_cli::logging::init_logging;
use ledgermail_cli::{AppConfig, Cli, Command, Env};

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ledgermail_cli::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let env = Env::system();

    match cli.command {
        Command::Run => commands::execute_run(&config, &env).await,
        Command::Poll => commands::execute_poll(&config, &env).await,
        Command::Reconcile(args) => commands::execute_reconcile(args, &config, &env).await,
        Command::Rules(args) => commands::execute_rules(args, &config, &env).await,
    }
}
