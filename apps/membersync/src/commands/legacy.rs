//! `import-csv` and `export-csv`: the legacy `users.csv` layout.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::warn;

use membersync_db::{
    import_legacy_rows, read_legacy_csv, write_legacy_csv, ImportSummary, MappingStore,
};

use crate::commands::open_store;
use crate::config::StoreSettings;
use crate::error::{AppError, AppResult};

#[derive(Args, Debug)]
pub struct ImportCsvArgs {
    /// Path to a users.csv file (header: ID,JellyfinUser,Enabled)
    pub path: PathBuf,

    /// Refuse to import anything if any line is malformed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ExportCsvArgs {
    /// Destination file, or '-' for stdout
    pub path: PathBuf,
}

/// Execute `membersync import-csv`.
pub async fn execute_import(args: ImportCsvArgs) -> AppResult<()> {
    let store = open_store(&StoreSettings::from_env()).await?;
    let summary = import_file(&store, &args.path, args.strict).await?;
    println!(
        "Imported {} new and {} existing accounts from {}",
        summary.inserted,
        summary.updated,
        args.path.display()
    );
    Ok(())
}

/// Execute `membersync export-csv`.
pub async fn execute_export(args: ExportCsvArgs) -> AppResult<()> {
    let store = open_store(&StoreSettings::from_env()).await?;
    let count = export_file(&store, &args.path).await?;
    if args.path.as_os_str() != "-" {
        println!("Exported {count} accounts to {}", args.path.display());
    }
    Ok(())
}

pub(crate) async fn import_file(
    store: &dyn MappingStore,
    path: &Path,
    strict: bool,
) -> AppResult<ImportSummary> {
    let file = File::open(path)?;
    let parsed = read_legacy_csv(BufReader::new(file))?;

    if !parsed.errors.is_empty() {
        for (line, message) in &parsed.errors {
            warn!(line, error = %message, "Skipping malformed legacy row");
        }
        if strict {
            let (line, message) = &parsed.errors[0];
            return Err(AppError::Validation(format!(
                "{} malformed rows in {}, first at line {line}: {message}",
                parsed.errors.len(),
                path.display()
            )));
        }
    }

    Ok(import_legacy_rows(store, &parsed.rows).await?)
}

pub(crate) async fn export_file(store: &dyn MappingStore, path: &Path) -> AppResult<usize> {
    let accounts = store.load().await?;

    if path.as_os_str() == "-" {
        write_legacy_csv(io::stdout().lock(), &accounts)?;
    } else {
        write_legacy_csv(BufWriter::new(File::create(path)?), &accounts)?;
    }
    Ok(accounts.len())
}
