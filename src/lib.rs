mod config;
mod database;
mod excel;
mod sync;

pub use config::Cli;
pub use database::{Database, DbError};
pub use excel::{ChangeFilter, ExcelError, InferenceMode, SheetWatcher};
pub use sync::{process_workbook, PassError, PassReport, SyncOptions};

use clap::Parser;
use is_terminal::IsTerminal;
use notify::Event;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

/// Failures that stop the process before or while it starts watching
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to open database: {0}")]
    Db(#[from] DbError),
    #[error("Workbook error: {0}")]
    Workbook(#[from] ExcelError),
    #[error("Failed to read workbook name: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("Initial synchronization failed: {0}")]
    Pass(#[from] PassError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(StartupError::from)
        .and_then(|rt| rt.block_on(run_with(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_with(cli: Cli) -> Result<(), StartupError> {
    let db = Database::open(&cli.db)?;
    let options = cli.sync_options();

    let path = match &cli.file {
        Some(file) => file.clone(),
        None => prompt_for_workbook()?,
    };
    let path = resolve_workbook(&path)?;

    let (report, synced_checksum) = tokio::task::block_in_place(|| initial_pass(&db, &path, &options))?;
    log_report(&report, cli.json);

    if cli.once {
        db.close()?;
        return Ok(());
    }

    let (mut watcher, mut events) = SheetWatcher::watch(&path, synced_checksum)?;
    log::info!("Watching for changes in: {}", watcher.path().display());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    log::warn!("Failed to listen for Ctrl-C: {}", e);
                }
                log::info!("Shutting down");
                break;
            }
            message = events.recv() => {
                match message {
                    None => {
                        log::warn!("Watch channel closed");
                        break;
                    }
                    Some(Err(e)) => log::warn!("error: {}", e),
                    Some(Ok(event)) => {
                        let outcome = tokio::task::block_in_place(|| {
                            handle_change(&db, watcher.filter_mut(), &event, &options)
                        });
                        match outcome {
                            Some(Ok(report)) => log_report(&report, cli.json),
                            Some(Err(e)) => log::error!("Synchronization failed, still watching: {}", e),
                            None => {}
                        }
                    }
                }
            }
        }
    }

    drop(watcher);
    db.close()?;
    Ok(())
}

/// First pass over the workbook, returning the checksum of the content it read.
///
/// The checksum is taken before reading so a save racing the pass is seen as
/// a change by the watcher.
pub fn initial_pass(
    db: &Database,
    path: &Path,
    options: &SyncOptions,
) -> Result<(PassReport, Option<String>), PassError> {
    let checksum = excel::compute_checksum(path).ok();
    let report = process_workbook(db, path, options)?;
    Ok((report, checksum))
}

/// Run a pass if `event` is a content change of the watched workbook.
///
/// A failed pass clears the remembered checksum so the next notification
/// for the same content retries.
pub fn handle_change(
    db: &Database,
    filter: &mut ChangeFilter,
    event: &Event,
    options: &SyncOptions,
) -> Option<Result<PassReport, PassError>> {
    let change = filter.process_event(event)?;
    log::info!("Modified file: {} ({:?})", change.path.display(), change.change_type);
    log::debug!("New checksum: {}", change.new_checksum);

    let result = process_workbook(db, &change.path, options);
    if result.is_err() {
        filter.forget_checksum();
    }
    Some(result)
}

fn prompt_for_workbook() -> Result<PathBuf, StartupError> {
    let name = if std::io::stdin().is_terminal() {
        dialoguer::Input::<String>::new()
            .with_prompt("Enter the name of the excel file")
            .interact_text()?
    } else {
        read_workbook_name(std::io::stdin().lock())?
    };
    Ok(PathBuf::from(name.trim()))
}

/// Read the workbook name from the first line of piped input
fn read_workbook_name(mut input: impl BufRead) -> std::io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn resolve_workbook(path: &Path) -> Result<PathBuf, ExcelError> {
    path.canonicalize()
        .map_err(|_| ExcelError::file_not_found(&path.display().to_string()))
}

fn log_report(report: &PassReport, json: bool) {
    log::info!(
        "Synchronized {} rows across {} tables from {}",
        report.rows_upserted(),
        report.tables.len(),
        report.path.display()
    );
    if json {
        println!("{}", report.to_json());
    }
}
