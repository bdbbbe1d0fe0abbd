use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FileKind;

/// Type tag the cloud uses for folders.
pub const COLLECTION_TYPE: &str = "CollectionType";

/// A document record exactly as the cloud listing returns it.
///
/// Every field is optional here; [`crate::sync::parser`] decides what a
/// missing value means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    // The cloud API spells this field with a double "s".
    #[serde(rename = "VissibleName", default)]
    pub visible_name: Option<String>,
    #[serde(rename = "Type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "Parent", default)]
    pub parent: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: Option<i64>,
    #[serde(rename = "ModifiedClient", default)]
    pub modified_client: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// Canonical shape of one remote file or folder, rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub parent_id: Option<String>,
    pub version: i64,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub file_kind: FileKind,
}

impl RemoteItem {
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}
