//! `accounts`, `map` and `unmap`: inspect and edit the mapping store.

use std::collections::BTreeSet;

use clap::Args;
use tracing::{info, warn};

use membersync_connector::ids::MemberId;
use membersync_db::{encode_mapped_ids, Account, MappingStore, StoreError};

use crate::commands::open_store;
use crate::config::StoreSettings;
use crate::error::{AppError, AppResult};

#[derive(Args, Debug)]
pub struct AccountsArgs {
    /// Print accounts as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Account name as it appears in Jellyfin
    pub account: String,

    /// Member ids that own this account
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Add to the existing ids instead of replacing them
    #[arg(long)]
    pub add: bool,
}

#[derive(Args, Debug)]
pub struct UnmapArgs {
    /// Account name as it appears in Jellyfin
    pub account: String,
}

/// Execute `membersync accounts`.
pub async fn execute_list(args: AccountsArgs) -> AppResult<()> {
    let store = open_store(&StoreSettings::from_env()).await?;
    let accounts = store.load().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
    } else {
        print!("{}", render_table(&accounts));
    }
    Ok(())
}

/// Execute `membersync map`.
pub async fn execute_map(args: MapArgs) -> AppResult<()> {
    let store = open_store(&StoreSettings::from_env()).await?;
    let ids = map_account(&store, &args).await?;
    println!("{} -> {}", args.account, encode_mapped_ids(&ids));
    Ok(())
}

/// Execute `membersync unmap`.
pub async fn execute_unmap(args: UnmapArgs) -> AppResult<()> {
    let store = open_store(&StoreSettings::from_env()).await?;
    unmap_account(&store, &args.account).await?;
    println!("{} is no longer mapped and will be left alone", args.account);
    Ok(())
}

pub(crate) async fn map_account(
    store: &dyn MappingStore,
    args: &MapArgs,
) -> AppResult<BTreeSet<MemberId>> {
    let mut ids = parse_ids(&args.ids)?;

    if args.add {
        let current = store
            .load()
            .await?
            .into_iter()
            .find(|account| account.name == args.account)
            .ok_or_else(|| StoreError::not_found(&args.account))?;
        ids.extend(current.mapped_ids);
    }

    store.set_mapped_ids(&args.account, &ids).await?;
    info!(account = %args.account, ids = %encode_mapped_ids(&ids), "Updated mapped ids");
    Ok(ids)
}

pub(crate) async fn unmap_account(store: &dyn MappingStore, account: &str) -> AppResult<()> {
    store.set_mapped_ids(account, &BTreeSet::new()).await?;
    warn!(account = %account, "Account unmapped; its enabled state is now frozen");
    Ok(())
}

/// Ids are stored whitespace-delimited, so an id may not contain whitespace.
fn parse_ids(raw: &[String]) -> AppResult<BTreeSet<MemberId>> {
    let mut ids = BTreeSet::new();
    for id in raw {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::Validation("member id may not be empty".into()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "member id '{id}' contains whitespace"
            )));
        }
        ids.insert(MemberId::new(id));
    }
    Ok(ids)
}

fn render_table(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts in the mapping store yet.\n".to_string();
    }

    let width = accounts
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  {:<8}  {:<13}  MAPPED IDS\n", "NAME", "ENABLED", "STATE");
    for account in accounts {
        let state = if account.state_indeterminate {
            "indeterminate"
        } else if account.is_provisioned() {
            "mapped"
        } else {
            "unmapped"
        };
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:<13}  {}\n",
            account.name,
            if account.enabled { "yes" } else { "no" },
            state,
            encode_mapped_ids(&account.mapped_ids),
        ));
    }
    out
}
