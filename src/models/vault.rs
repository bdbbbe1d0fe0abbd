use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub id: i64,
    pub name: String,
    /// Directory the mirrored notes are written under
    pub local_path: String,
    pub sync_enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a vault.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVault {
    pub name: String,
    pub local_path: String,
    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,
}

fn default_sync_enabled() -> bool {
    true
}

impl NewVault {
    pub fn new(name: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_path: local_path.into(),
            sync_enabled: true,
        }
    }

    pub fn with_sync_enabled(mut self, enabled: bool) -> Self {
        self.sync_enabled = enabled;
        self
    }
}

impl fmt::Display for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Path: {}", self.local_path)?;
        writeln!(
            f,
            "Sync: {}",
            if self.sync_enabled { "enabled" } else { "disabled" }
        )?;
        match &self.last_synced_at {
            Some(at) => writeln!(f, "Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => writeln!(f, "Last sync: never")?,
        }
        Ok(())
    }
}
