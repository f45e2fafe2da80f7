//! `run` and `once`: sync cycles against the live roster and directory.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use secrecy::ExposeSecret;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use membersync_connector_jellyfin::{JellyfinConfig, JellyfinDirectory};
use membersync_connector_roster::{RosterConfig, RosterSource};
use membersync_provisioning::{CycleConfig, CycleDriver, CycleScheduler};

use crate::commands::open_store;
use crate::config::AppConfig;
use crate::error::AppResult;

/// Flags that take precedence over the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct CycleOverrides {
    /// Minimum roster size to trust (overrides GUARDRAIL_THRESHOLD)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub guardrail_threshold: Option<u32>,

    /// Compute and report transitions without applying them
    #[arg(long)]
    pub dry_run: bool,
}

impl CycleOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(threshold) = self.guardrail_threshold {
            config.guardrail_threshold = threshold as usize;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between cycle starts (overrides SCRIPT_INTERVAL)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    #[command(flatten)]
    pub overrides: CycleOverrides,
}

#[derive(Args, Debug)]
pub struct OnceArgs {
    #[command(flatten)]
    pub overrides: CycleOverrides,

    /// Print the cycle report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Build a driver wired to the configured roster, Jellyfin server and store.
async fn build_driver(config: &AppConfig) -> AppResult<CycleDriver> {
    let source = RosterSource::new(
        RosterConfig::new(
            config.roster.url.as_str(),
            config.roster.api_id.as_str(),
            config.roster.api_hash.expose_secret().as_str(),
            config.roster.group.as_str(),
        )
        .with_timeout_secs(config.http_timeout_secs),
    )?;

    let directory = JellyfinDirectory::new(
        JellyfinConfig::new(
            config.jellyfin.url.as_str(),
            config.jellyfin.api_key.expose_secret().as_str(),
        )
        .with_timeout_secs(config.http_timeout_secs),
    )?;

    let store = open_store(&config.store).await?;

    Ok(CycleDriver::new(
        Arc::new(source),
        Arc::new(directory),
        Arc::new(store),
        cycle_config(config),
    ))
}

fn cycle_config(config: &AppConfig) -> CycleConfig {
    CycleConfig {
        guardrail_threshold: config.guardrail_threshold,
        dry_run: config.dry_run,
        mutation_concurrency: config.mutation_concurrency,
        excluded_accounts: config.excluded_accounts.clone(),
    }
}

/// Execute `membersync run`.
pub async fn execute_run(args: RunArgs) -> AppResult<()> {
    let mut config = AppConfig::from_env()?;
    args.overrides.apply(&mut config);
    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }

    let driver = Arc::new(build_driver(&config).await?);
    let scheduler = CycleScheduler::new(driver, Duration::from_secs(config.interval_secs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let summary = scheduler.run(shutdown_rx).await;
    info!(
        completed = summary.completed,
        aborted = summary.aborted,
        "membersync stopped"
    );
    Ok(())
}

/// Execute `membersync once`.
pub async fn execute_once(args: OnceArgs) -> AppResult<()> {
    let mut config = AppConfig::from_env()?;
    args.overrides.apply(&mut config);

    let driver = build_driver(&config).await?;
    let report = driver.run_cycle().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. The cycle in flight is allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current cycle");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping after the current cycle");
        }
    }
}
