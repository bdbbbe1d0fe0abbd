use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{resolve_vault, truncate, OutputFormat};
use remarkidian::db::{is_unique_violation, VaultRepository};
use remarkidian::models::NewVault;

#[derive(Args)]
pub struct VaultCommand {
    #[command(subcommand)]
    pub command: VaultSubcommand,
}

#[derive(Subcommand)]
pub enum VaultSubcommand {
    /// Register a vault
    Add {
        /// Unique vault name
        name: String,

        /// Directory the notes are written under
        path: String,

        /// Exclude this vault from scheduled syncs
        #[arg(long)]
        no_sync: bool,
    },

    /// List all vaults
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a vault's details
    Show {
        /// Vault ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Include a vault in scheduled syncs
    Enable {
        /// Vault ID or name
        identifier: String,
    },

    /// Exclude a vault from scheduled syncs
    Disable {
        /// Vault ID or name
        identifier: String,
    },

    /// Remove a vault with its tracked items and sync history
    Remove {
        /// Vault ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl VaultCommand {
    pub async fn run(&self, repo: &VaultRepository) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            VaultSubcommand::Add {
                name,
                path,
                no_sync,
            } => {
                if name.trim().is_empty() || path.trim().is_empty() {
                    return Err("Vault name and path cannot be empty".into());
                }

                let new_vault = NewVault::new(name.trim(), path.trim()).with_sync_enabled(!no_sync);
                let created = match repo.create(&new_vault).await {
                    Ok(vault) => vault,
                    Err(e) if is_unique_violation(&e) => {
                        return Err(format!("A vault named '{}' already exists", name.trim()).into())
                    }
                    Err(e) => return Err(e.into()),
                };

                println!("Created vault:");
                println!("{}", created);
                Ok(())
            }

            VaultSubcommand::List { format } => {
                let vaults = repo.list().await?;

                if vaults.is_empty() {
                    println!("No vaults found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&vaults)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<6}  {:<24}  {:<8}  {:<20}  PATH", "ID", "NAME", "SYNC", "LAST SYNC");
                        println!("{}", "-".repeat(90));
                        for vault in &vaults {
                            let last_sync = vault
                                .last_synced_at
                                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "never".to_string());
                            println!(
                                "{:<6}  {:<24}  {:<8}  {:<20}  {}",
                                vault.id,
                                truncate(&vault.name, 24),
                                if vault.sync_enabled { "on" } else { "off" },
                                last_sync,
                                vault.local_path
                            );
                        }
                        println!("\nTotal: {} vault(s)", vaults.len());
                    }
                }
                Ok(())
            }

            VaultSubcommand::Show { identifier, format } => {
                let vault = resolve_vault(repo, identifier).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&vault)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", vault);
                    }
                }
                Ok(())
            }

            VaultSubcommand::Enable { identifier } => {
                let vault = resolve_vault(repo, identifier).await?;
                repo.set_sync_enabled(vault.id, true).await?;
                println!("Enabled scheduled sync for '{}'", vault.name);
                Ok(())
            }

            VaultSubcommand::Disable { identifier } => {
                let vault = resolve_vault(repo, identifier).await?;
                repo.set_sync_enabled(vault.id, false).await?;
                println!("Disabled scheduled sync for '{}'", vault.name);
                Ok(())
            }

            VaultSubcommand::Remove { identifier, force } => {
                let vault = resolve_vault(repo, identifier).await?;

                // Confirm deletion unless --force is used
                if !force {
                    print!(
                        "Remove vault '{}' and all of its tracked items? [y/N] ",
                        vault.name
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Removal cancelled.");
                        return Ok(());
                    }
                }

                repo.delete(vault.id).await?;
                println!("Removed vault: {}", vault.name);
                Ok(())
            }
        }
    }
}
