//! Sync CLI commands: run a sync in the foreground and inspect the ledger.

use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::{resolve_vault, OutputFormat};
use remarkidian::config::Config;
use remarkidian::db::{SyncRunRepository, VaultRepository};
use remarkidian::models::{SyncKind, SyncRun, SyncStatus};
use remarkidian::{RemarkableClient, SyncOrchestrator};

/// Sync vaults with the document cloud
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub command: SyncSubcommand,
}

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Sync a vault now and wait for the result
    Run {
        /// Vault ID or name
        vault: String,
    },

    /// Show past sync runs, newest first
    History {
        /// Only runs of this vault (ID or name)
        #[arg(long)]
        vault: Option<String>,

        /// Maximum number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark an in-progress run as stopped
    Stop {
        /// Sync run ID
        run_id: i64,
    },
}

impl SyncCommand {
    pub async fn run(
        &self,
        pool: &SqlitePool,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SyncSubcommand::Run { vault } => {
                let vault = resolve_vault(&VaultRepository::new(pool.clone()), vault).await?;
                let orchestrator = orchestrator(pool, config)?;

                println!("Syncing vault '{}'...", vault.name);
                let run = orchestrator.run_sync(vault.id, SyncKind::Manual).await?;

                match run.status {
                    SyncStatus::Success => {
                        println!(
                            "Sync #{} complete: {} item(s) synced, {} error(s)",
                            run.id, run.items_synced, run.error_count
                        );
                        Ok(())
                    }
                    _ => Err(format!(
                        "Sync #{} failed: {}",
                        run.id,
                        run.error_message.as_deref().unwrap_or("unknown error")
                    )
                    .into()),
                }
            }

            SyncSubcommand::History {
                vault,
                limit,
                format,
            } => {
                let vault_id = match vault {
                    Some(identifier) => Some(
                        resolve_vault(&VaultRepository::new(pool.clone()), identifier)
                            .await?
                            .id,
                    ),
                    None => None,
                };
                let runs = SyncRunRepository::new(pool.clone())
                    .history(vault_id, *limit, 0)
                    .await?;

                if runs.is_empty() {
                    println!("No sync runs found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&runs)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<6}  {:<6}  {:<10}  {:<12}  {:<19}  {:>6}  {:>6}",
                            "ID", "VAULT", "KIND", "STATUS", "STARTED", "ITEMS", "ERRORS"
                        );
                        println!("{}", "-".repeat(80));
                        for run in &runs {
                            print_run(run);
                        }
                    }
                }
                Ok(())
            }

            SyncSubcommand::Stop { run_id } => {
                let run = orchestrator(pool, config)?.stop_sync(*run_id).await?;
                println!("Stopped sync #{} (vault {})", run.id, run.vault_id);
                Ok(())
            }
        }
    }
}

fn orchestrator(
    pool: &SqlitePool,
    config: &Config,
) -> Result<SyncOrchestrator, Box<dyn std::error::Error>> {
    let client = RemarkableClient::from_config(&config.remote)?;
    Ok(SyncOrchestrator::new(pool.clone(), Arc::new(client))
        .with_fetch_timeout(Duration::from_secs(config.remote.timeout_secs)))
}

fn print_run(run: &SyncRun) {
    println!(
        "{:<6}  {:<6}  {:<10}  {:<12}  {:<19}  {:>6}  {:>6}",
        run.id,
        run.vault_id,
        run.kind.as_str(),
        run.status.as_str(),
        run.started_at.format("%Y-%m-%d %H:%M:%S"),
        run.items_synced,
        run.error_count
    );
    if let Some(message) = &run.error_message {
        println!("        {}", message);
    }
}
