pub mod blocked_dates;
pub mod cli;
pub mod db;
pub mod reconcile;
pub mod scraper;
pub mod seminars;
pub mod settings;
pub mod staff;
pub mod sync;
mod utils;

use std::{fs, path::Path, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use cli::{CliCommand, Invocation};
use db::Database;
use settings::{SettingsStore, SETTINGS_FILE};

/// Everything a command needs: the store and the settings it was opened with.
pub struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
}

impl AppState {
    /// Open (creating if needed) the settings file and database under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let db_path = settings.snapshot().database_path(data_dir);
        let db = Database::new(db_path)?;

        Ok(Self { db, settings })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(invocation: Invocation) -> Result<ExitCode> {
    let state = AppState::open(&invocation.data_dir)?;

    match invocation.command {
        CliCommand::SyncRun => {
            let response = sync::trigger(&state).await;
            print_json(&response)?;
            if !response.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        CliCommand::SyncWatch => {
            let cancel_token = CancellationToken::new();
            {
                let cancel_token = cancel_token.clone();
                tokio::spawn(async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => log::info!("interrupt received, stopping after the current step"),
                        Err(err) => log::error!("failed to listen for ctrl-c: {err}"),
                    }
                    cancel_token.cancel();
                });
            }

            let period = Duration::from_secs(state.settings.snapshot().sync.interval_secs.max(1));
            let state_ref = &state;
            let summary =
                sync::watch_loop(period, cancel_token, move || sync::trigger(state_ref)).await;
            log::info!(
                "watch stopped after {} runs ({} failed)",
                summary.runs,
                summary.failures
            );
        }
        CliCommand::SyncHistory { limit } => print_json(&state.db.list_sync_runs(limit).await?)?,
        CliCommand::SeminarsList { from, to } => {
            print_json(&seminars::commands::list_seminars(&state, from, to).await?)?
        }
        CliCommand::SeminarsAssign {
            seminar_id,
            staff_id,
        } => print_json(&seminars::commands::assign_staff(&state, &seminar_id, staff_id).await?)?,
        CliCommand::SeminarsSchedule { from, to } => {
            print_json(&seminars::commands::schedule(&state, from, to).await?)?
        }
        CliCommand::StaffList => print_json(&staff::commands::list_staff(&state).await?)?,
        CliCommand::StaffAdd { name, color } => {
            print_json(&staff::commands::create_staff(&state, name, color).await?)?
        }
        CliCommand::StaffUpdate { id, name, color } => {
            print_json(&staff::commands::update_staff(&state, id, name, color).await?)?
        }
        CliCommand::StaffRemove { id } => {
            staff::commands::delete_staff(&state, id).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        CliCommand::StaffMove { id, direction } => {
            print_json(&staff::commands::move_staff(&state, id, direction).await?)?
        }
        CliCommand::StaffNextColor => {
            print_json(&serde_json::json!({
                "themeColor": staff::commands::next_staff_color(&state).await?
            }))?
        }
        CliCommand::BlockedList { from, to } => {
            print_json(&blocked_dates::commands::list_blocked_dates(&state, from, to).await?)?
        }
        CliCommand::BlockedAdd {
            selection,
            staff_id,
            reason,
        } => print_json(
            &blocked_dates::commands::add_blocked_dates(&state, selection, staff_id, reason)
                .await?,
        )?,
        CliCommand::BlockedRemove { ids } => {
            let deleted = blocked_dates::commands::delete_blocked_dates(&state, ids).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        CliCommand::BlockedClear => {
            let deleted = blocked_dates::commands::clear_blocked_dates(&state).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        CliCommand::ConfigShow => print_json(&state.settings.snapshot())?,
        CliCommand::ConfigSet { key, value } => {
            let updated = state.settings.set(&key, &value)?;
            log::info!("updated {key} in {}", state.settings.path().display());
            print_json(&updated)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub fn run() -> ExitCode {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli::build_cli().get_matches();
    let invocation = match cli::parse_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(invocation)) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;

    pub fn open_temp_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = AppState::open(dir.path()).expect("open app state");
        (dir, state)
    }
}
