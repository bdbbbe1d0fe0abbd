use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What triggered a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Manual,
    Scheduled,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Manual => "manual",
            SyncKind::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SyncKind::Manual),
            "scheduled" => Ok(SyncKind::Scheduled),
            _ => Err(format!(
                "Invalid sync kind '{}'. Valid options: manual, scheduled",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    InProgress,
    Success,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SyncStatus::InProgress),
            "success" => Ok(SyncStatus::Success),
            "error" => Ok(SyncStatus::Error),
            _ => Err(format!("Invalid sync status '{}'", s)),
        }
    }
}

/// One entry in the sync ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    pub vault_id: i64,
    pub kind: SyncKind,
    pub status: SyncStatus,
    /// New plus updated items
    pub items_synced: i64,
    pub error_count: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    pub fn is_in_progress(&self) -> bool {
        self.status == SyncStatus::InProgress
    }
}
