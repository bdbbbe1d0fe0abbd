//! Diffs a fresh remote listing against the tracked items of one vault.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;

use super::paths;
use crate::db::TrackedItemRepository;
use crate::models::{RemoteItem, TrackedItem, TrackedItemChanges};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Remote items in the listing
    pub total: usize,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub errors: usize,
}

impl ReconcileStats {
    /// What the ledger records as items synced.
    pub fn items_synced(&self) -> usize {
        self.new + self.updated
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Decides whether a tracked item must be rewritten from its remote state.
///
/// Rules apply in order: a newer remote version, then a newer remote
/// modification time, then a remote modification after our last sync of an
/// item that was already processed.
pub fn needs_update(existing: &TrackedItem, remote: &RemoteItem) -> bool {
    if remote.version > existing.remote_version {
        return true;
    }

    if let (Some(remote_at), Some(existing_at)) =
        (remote.last_modified_at, existing.remote_last_modified)
    {
        if remote_at > existing_at {
            return true;
        }
    }

    match remote.last_modified_at {
        Some(remote_at) => existing.processed && remote_at > existing.synced_at,
        None => false,
    }
}

/// Field values written for a remote item.
pub fn changes_for(item: &RemoteItem) -> TrackedItemChanges {
    TrackedItemChanges {
        remote_id: item.id.clone(),
        file_name: paths::file_name(item),
        display_name: item.name.clone(),
        local_path: paths::local_path(item),
        remote_last_modified: item.last_modified_at,
        remote_version: item.version,
        parent_remote_id: item.parent_id.clone(),
        is_folder: item.is_folder(),
        file_kind: item.file_kind,
    }
}

pub struct Reconciler {
    items: TrackedItemRepository,
}

impl Reconciler {
    pub fn new(items: TrackedItemRepository) -> Self {
        Self { items }
    }

    /// Applies a full listing to a vault.
    ///
    /// Each item is written independently: a failure is logged and counted
    /// and the remaining items are still processed. Tracked items missing
    /// from the listing are deleted, unless the listing is empty.
    pub async fn reconcile(&self, vault_id: i64, remote: &[RemoteItem]) -> ReconcileStats {
        let mut stats = ReconcileStats {
            total: remote.len(),
            ..Default::default()
        };

        for item in remote {
            match self.reconcile_item(vault_id, item).await {
                Ok(Outcome::Inserted) => stats.new += 1,
                Ok(Outcome::Updated) => stats.updated += 1,
                Ok(Outcome::Unchanged) => stats.unchanged += 1,
                Err(e) => {
                    tracing::error!(
                        vault_id,
                        remote_id = %item.id,
                        error = %e,
                        "Failed to reconcile item"
                    );
                    stats.errors += 1;
                }
            }
        }

        if remote.is_empty() {
            tracing::warn!(vault_id, "Remote listing is empty, skipping deletion pass");
        } else {
            match self.remove_missing(vault_id, remote).await {
                Ok(deleted) => stats.deleted = deleted,
                Err(e) => {
                    tracing::error!(vault_id, error = %e, "Deletion pass failed");
                    stats.errors += 1;
                }
            }
        }

        tracing::info!(
            vault_id,
            total = stats.total,
            new = stats.new,
            updated = stats.updated,
            unchanged = stats.unchanged,
            deleted = stats.deleted,
            errors = stats.errors,
            "Reconciliation finished"
        );

        stats
    }

    async fn reconcile_item(
        &self,
        vault_id: i64,
        item: &RemoteItem,
    ) -> Result<Outcome, sqlx::Error> {
        match self.items.get(vault_id, &item.id).await? {
            None => {
                self.items
                    .insert(vault_id, &changes_for(item), Utc::now())
                    .await?;
                tracing::debug!(
                    vault_id,
                    remote_id = %item.id,
                    name = %item.name,
                    "Tracked new item"
                );
                Ok(Outcome::Inserted)
            }
            Some(existing) if needs_update(&existing, item) => {
                self.items
                    .update_from_remote(existing.id, &changes_for(item), Utc::now())
                    .await?;
                tracing::debug!(
                    vault_id,
                    remote_id = %item.id,
                    from_version = existing.remote_version,
                    to_version = item.version,
                    "Updated changed item"
                );
                Ok(Outcome::Updated)
            }
            Some(_) => Ok(Outcome::Unchanged),
        }
    }

    async fn remove_missing(
        &self,
        vault_id: i64,
        remote: &[RemoteItem],
    ) -> Result<usize, sqlx::Error> {
        let keep: HashSet<&str> = remote.iter().map(|item| item.id.as_str()).collect();
        let removed = self.items.delete_missing(vault_id, &keep).await?;

        for item in &removed {
            tracing::info!(
                vault_id,
                remote_id = %item.remote_id,
                path = %item.local_path,
                "Removed item deleted remotely"
            );
        }

        Ok(removed.len())
    }
}
