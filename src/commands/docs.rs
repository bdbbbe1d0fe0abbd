//! Read-side commands over a vault's tracked items.

use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use std::path::PathBuf;

use super::{resolve_vault, truncate, OutputFormat};
use remarkidian::content_hash;
use remarkidian::db::{TrackedItemRepository, VaultRepository};
use remarkidian::models::TrackedItem;
use remarkidian::sync::hierarchy::{tracked_forest, walk};

/// Show item counts for a vault
#[derive(Args)]
pub struct StatsCommand {
    /// Vault ID or name
    pub vault: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl StatsCommand {
    pub async fn run(&self, pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
        let vault = resolve_vault(&VaultRepository::new(pool.clone()), &self.vault).await?;
        let stats = TrackedItemRepository::new(pool.clone())
            .stats(vault.id)
            .await?;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            OutputFormat::Text => {
                println!("{}", vault.name);
                println!("{}", "=".repeat(vault.name.len()));
                println!("Documents:   {}", stats.total_documents);
                println!("  processed: {}", stats.processed_documents);
                println!("  pending:   {}", stats.unprocessed_documents);
                println!("Folders:     {}", stats.folders);
                println!("Files:       {}", stats.files);
                if let Some(at) = stats.latest_modification {
                    println!("Latest change: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
                match stats.last_sync {
                    Some(at) => println!("Last sync:     {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("Last sync:     never"),
                }
            }
        }
        Ok(())
    }
}

/// Print a vault's folder tree
#[derive(Args)]
pub struct TreeCommand {
    /// Vault ID or name
    pub vault: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl TreeCommand {
    pub async fn run(&self, pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
        let vault = resolve_vault(&VaultRepository::new(pool.clone()), &self.vault).await?;
        let items = TrackedItemRepository::new(pool.clone())
            .list_by_vault(vault.id)
            .await?;
        let forest = tracked_forest(vault.id, items);

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&forest)?);
            }
            OutputFormat::Text => {
                if forest.is_empty() {
                    println!("No documents tracked yet. Run 'remarkidian sync run {}'.", vault.name);
                    return Ok(());
                }
                println!("{}", vault.name);
                for (depth, item) in walk(&forest) {
                    println!("{}{}", "  ".repeat(depth + 1), tree_label(item));
                }
            }
        }
        Ok(())
    }
}

fn tree_label(item: &TrackedItem) -> String {
    if item.is_folder {
        format!("{}/", item.display_name)
    } else if item.processed {
        item.display_name.clone()
    } else {
        format!("{} *", item.display_name)
    }
}

/// Work with documents awaiting processing
#[derive(Args)]
pub struct DocsCommand {
    #[command(subcommand)]
    pub command: DocsSubcommand,
}

#[derive(Subcommand)]
pub enum DocsSubcommand {
    /// List documents that still need processing
    Pending {
        /// Vault ID or name
        vault: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark a tracked document as processed
    Done {
        /// Tracked item ID
        id: i64,

        /// Generated note; its SHA-256 is stored with the item
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

impl DocsCommand {
    pub async fn run(&self, pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
        let items = TrackedItemRepository::new(pool.clone());

        match &self.command {
            DocsSubcommand::Pending { vault, format } => {
                let vault = resolve_vault(&VaultRepository::new(pool.clone()), vault).await?;
                let pending = items.list_unprocessed(vault.id).await?;

                if pending.is_empty() {
                    println!("Nothing to process in '{}'", vault.name);
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&pending)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<6}  {:<30}  {:<7}  {:>7}  PATH", "ID", "NAME", "KIND", "VERSION");
                        println!("{}", "-".repeat(90));
                        for item in &pending {
                            println!(
                                "{:<6}  {:<30}  {:<7}  {:>7}  {}",
                                item.id,
                                truncate(&item.display_name, 30),
                                item.file_kind.as_str(),
                                item.remote_version,
                                item.local_path
                            );
                        }
                        println!("\nTotal: {} document(s)", pending.len());
                    }
                }
                Ok(())
            }

            DocsSubcommand::Done { id, file } => {
                let hash = match file {
                    Some(path) => Some(content_hash(&std::fs::read(path)?)),
                    None => None,
                };

                if !items.mark_processed(*id, hash.as_deref()).await? {
                    return Err(format!("Tracked item not found: {}", id).into());
                }
                println!("Marked item {} as processed", id);
                Ok(())
            }
        }
    }
}
