use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FileKind;

/// Local record of a remote item's last synchronized state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: i64,
    pub vault_id: i64,
    pub remote_id: String,
    pub file_name: String,
    pub display_name: String,
    pub local_path: String,
    pub remote_last_modified: Option<DateTime<Utc>>,
    pub remote_version: i64,
    pub synced_at: DateTime<Utc>,
    pub content_hash: Option<String>,
    /// False until downstream content processing has run since the last change
    pub processed: bool,
    pub parent_remote_id: Option<String>,
    pub is_folder: bool,
    pub file_kind: FileKind,
    pub file_size_bytes: Option<i64>,
}

/// Fields written when a remote item is first seen or has changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItemChanges {
    pub remote_id: String,
    pub file_name: String,
    pub display_name: String,
    pub local_path: String,
    pub remote_last_modified: Option<DateTime<Utc>>,
    pub remote_version: i64,
    pub parent_remote_id: Option<String>,
    pub is_folder: bool,
    pub file_kind: FileKind,
}

/// Aggregate counts over a vault's tracked items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VaultStats {
    pub total_documents: i64,
    pub processed_documents: i64,
    pub unprocessed_documents: i64,
    pub folders: i64,
    pub files: i64,
    pub latest_modification: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
}
