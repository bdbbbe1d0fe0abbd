//! Turns raw cloud records into canonical [`RemoteItem`]s and a forest.

use chrono::{DateTime, Utc};

use super::hierarchy::{build_forest, Forest};
use crate::models::{FileKind, ItemKind, RawDocument, RemoteItem, COLLECTION_TYPE};

/// Result of parsing one full listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocuments {
    pub items: Vec<RemoteItem>,
    pub hierarchy: Forest<RemoteItem>,
}

/// Canonicalizes every record and builds the parent/child forest.
///
/// Records without an id are skipped. Parent loops are broken in the forest
/// and reported in `hierarchy.cycles`; the items themselves are kept as listed.
pub fn parse_documents(raw: Vec<RawDocument>) -> ParsedDocuments {
    let total = raw.len();
    let items: Vec<RemoteItem> = raw.into_iter().filter_map(canonicalize).collect();

    if items.len() < total {
        tracing::warn!(
            skipped = total - items.len(),
            "Skipped remote records without an id"
        );
    }

    let hierarchy = build_forest(items.clone());
    for cycle in &hierarchy.cycles {
        tracing::error!(
            members = %cycle.join(", "),
            "Remote listing has cyclic parent references"
        );
    }
    ParsedDocuments { items, hierarchy }
}

/// Canonical form of one record, or `None` if it carries no id.
pub fn canonicalize(raw: RawDocument) -> Option<RemoteItem> {
    let id = raw.id.clone().filter(|id| !id.is_empty())?;

    let kind = if raw.doc_type.as_deref() == Some(COLLECTION_TYPE) {
        ItemKind::Folder
    } else {
        ItemKind::File
    };
    let file_kind = derive_file_kind(kind, raw.visible_name.as_deref());

    let name = raw
        .visible_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.clone());

    Some(RemoteItem {
        name,
        kind,
        parent_id: raw.parent.filter(|p| !p.is_empty()),
        version: raw.version.filter(|v| *v > 0).unwrap_or(1),
        last_modified_at: raw.modified_client.as_deref().and_then(parse_modified),
        file_kind,
        id,
    })
}

/// Folders are folders; files are classified by name suffix.
pub fn derive_file_kind(kind: ItemKind, name: Option<&str>) -> FileKind {
    if kind == ItemKind::Folder {
        return FileKind::Folder;
    }
    let name = name.unwrap_or_default();
    if name.ends_with(".pdf") {
        FileKind::Pdf
    } else if name.ends_with(".epub") {
        FileKind::Epub
    } else {
        FileKind::Native
    }
}

fn parse_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
