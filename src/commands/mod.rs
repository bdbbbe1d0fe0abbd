mod config_cmd;
mod docs;
mod sync_cmd;
mod vault;

pub use config_cmd::ConfigCommand;
pub use docs::{DocsCommand, StatsCommand, TreeCommand};
pub use sync_cmd::SyncCommand;
pub use vault::VaultCommand;

use clap::ValueEnum;
use remarkidian::db::VaultRepository;
use remarkidian::models::Vault;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Looks a vault up by numeric id first, then by name.
pub async fn resolve_vault(
    repo: &VaultRepository,
    identifier: &str,
) -> Result<Vault, Box<dyn std::error::Error>> {
    let vault = match identifier.parse::<i64>() {
        Ok(id) => match repo.get_by_id(id).await? {
            Some(vault) => Some(vault),
            None => repo.get_by_name(identifier).await?,
        },
        Err(_) => repo.get_by_name(identifier).await?,
    };

    vault.ok_or_else(|| format!("Vault not found: {}", identifier).into())
}

/// Shortens `text` to `width` characters, marking the cut with "...".
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
