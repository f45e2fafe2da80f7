//! membersync - keeps Jellyfin accounts enabled while their owners belong to a group
//!
//! The daemon (`membersync run`) pulls the group roster on a fixed interval,
//! compares it with the accounts an operator has mapped to member ids, and
//! enables or disables those accounts to match. The remaining subcommands
//! manage the mapping store.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use config::LogFormat;
use error::AppResult;

/// membersync - group membership to media account sync
#[derive(Parser)]
#[command(name = "membersync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync cycles on an interval until interrupted
    Run(commands::sync::RunArgs),

    /// Run a single sync cycle and exit
    Once(commands::sync::OnceArgs),

    /// List accounts in the mapping store
    Accounts(commands::accounts::AccountsArgs),

    /// Map an account to one or more member ids
    Map(commands::accounts::MapArgs),

    /// Remove every mapped member id from an account
    Unmap(commands::accounts::UnmapArgs),

    /// Import mappings from a legacy users.csv file
    ImportCsv(commands::legacy::ImportCsvArgs),

    /// Export mappings in the legacy users.csv layout
    ExportCsv(commands::legacy::ExportCsvArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    init_tracing(LogFormat::from_reader(|key| std::env::var(key)));

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,membersync=debug"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    match cli.command {
        Commands::Run(args) => commands::sync::execute_run(args).await,
        Commands::Once(args) => commands::sync::execute_once(args).await,
        Commands::Accounts(args) => commands::accounts::execute_list(args).await,
        Commands::Map(args) => commands::accounts::execute_map(args).await,
        Commands::Unmap(args) => commands::accounts::execute_unmap(args).await,
        Commands::ImportCsv(args) => commands::legacy::execute_import(args).await,
        Commands::ExportCsv(args) => commands::legacy::execute_export(args).await,
    }
}
