use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp};
use crate::models::{FileKind, TrackedItem, TrackedItemChanges, VaultStats};

/// Durable store of tracked items, keyed by (vault, remote id).
///
/// Every single-row write is one statement and therefore atomic. Nothing
/// here spans several items except the deletion pass, which runs in its
/// own transaction.
#[derive(Clone)]
pub struct TrackedItemRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TrackedItemRow {
    id: i64,
    vault_id: i64,
    remote_id: String,
    file_name: String,
    display_name: String,
    local_path: String,
    remote_last_modified: Option<String>,
    remote_version: i64,
    synced_at: String,
    content_hash: Option<String>,
    processed: bool,
    parent_remote_id: Option<String>,
    is_folder: bool,
    file_kind: String,
    file_size_bytes: Option<i64>,
}

impl TryFrom<TrackedItemRow> for TrackedItem {
    type Error = sqlx::Error;

    fn try_from(row: TrackedItemRow) -> Result<Self, Self::Error> {
        let file_kind: FileKind = row
            .file_kind
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(TrackedItem {
            id: row.id,
            vault_id: row.vault_id,
            remote_id: row.remote_id,
            file_name: row.file_name,
            display_name: row.display_name,
            local_path: row.local_path,
            remote_last_modified: parse_optional_timestamp(row.remote_last_modified)?,
            remote_version: row.remote_version,
            synced_at: parse_timestamp(&row.synced_at)?,
            content_hash: row.content_hash,
            processed: row.processed,
            parent_remote_id: row.parent_remote_id,
            is_folder: row.is_folder,
            file_kind,
            file_size_bytes: row.file_size_bytes,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total_documents: i64,
    processed_documents: i64,
    unprocessed_documents: i64,
    folders: i64,
    files: i64,
    latest_modification: Option<String>,
    last_sync: Option<String>,
}

impl TrackedItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        vault_id: i64,
        remote_id: &str,
    ) -> Result<Option<TrackedItem>, sqlx::Error> {
        let row: Option<TrackedItemRow> =
            sqlx::query_as("SELECT * FROM tracked_items WHERE vault_id = ? AND remote_id = ?")
                .bind(vault_id)
                .bind(remote_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TrackedItem::try_from).transpose()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<TrackedItem>, sqlx::Error> {
        let row: Option<TrackedItemRow> = sqlx::query_as("SELECT * FROM tracked_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TrackedItem::try_from).transpose()
    }

    /// Lists a vault's items, folders first, then by display name.
    pub async fn list_by_vault(&self, vault_id: i64) -> Result<Vec<TrackedItem>, sqlx::Error> {
        let rows: Vec<TrackedItemRow> = sqlx::query_as(
            "SELECT * FROM tracked_items WHERE vault_id = ? ORDER BY is_folder DESC, display_name ASC",
        )
        .bind(vault_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrackedItem::try_from).collect()
    }

    /// Files still waiting for content processing, most recently modified first.
    pub async fn list_unprocessed(&self, vault_id: i64) -> Result<Vec<TrackedItem>, sqlx::Error> {
        let rows: Vec<TrackedItemRow> = sqlx::query_as(
            r#"
            SELECT * FROM tracked_items
            WHERE vault_id = ? AND processed = 0 AND is_folder = 0
            ORDER BY remote_last_modified DESC
            "#,
        )
        .bind(vault_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrackedItem::try_from).collect()
    }

    /// Inserts a newly seen item in the unprocessed state.
    pub async fn insert(
        &self,
        vault_id: i64,
        changes: &TrackedItemChanges,
        synced_at: DateTime<Utc>,
    ) -> Result<TrackedItem, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO tracked_items (
                vault_id, remote_id, file_name, display_name, local_path,
                remote_last_modified, remote_version, synced_at, processed,
                parent_remote_id, is_folder, file_kind
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(vault_id)
        .bind(&changes.remote_id)
        .bind(&changes.file_name)
        .bind(&changes.display_name)
        .bind(&changes.local_path)
        .bind(changes.remote_last_modified.as_ref().map(format_timestamp))
        .bind(changes.remote_version)
        .bind(format_timestamp(&synced_at))
        .bind(&changes.parent_remote_id)
        .bind(changes.is_folder)
        .bind(changes.file_kind.as_str())
        .execute(&self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Overwrites the mutable fields of an existing item and marks it for
    /// reprocessing.
    pub async fn update_from_remote(
        &self,
        id: i64,
        changes: &TrackedItemChanges,
        synced_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tracked_items SET
                display_name = ?,
                file_name = ?,
                local_path = ?,
                remote_last_modified = ?,
                remote_version = ?,
                parent_remote_id = ?,
                is_folder = ?,
                file_kind = ?,
                processed = 0,
                synced_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.display_name)
        .bind(&changes.file_name)
        .bind(&changes.local_path)
        .bind(changes.remote_last_modified.as_ref().map(format_timestamp))
        .bind(changes.remote_version)
        .bind(&changes.parent_remote_id)
        .bind(changes.is_folder)
        .bind(changes.file_kind.as_str())
        .bind(format_timestamp(&synced_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Deletes every item of the vault whose remote id is not in `keep`.
    ///
    /// Returns the removed items. The caller decides whether a deletion pass
    /// is safe to run at all.
    pub async fn delete_missing(
        &self,
        vault_id: i64,
        keep: &HashSet<&str>,
    ) -> Result<Vec<TrackedItem>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<TrackedItemRow> =
            sqlx::query_as("SELECT * FROM tracked_items WHERE vault_id = ?")
                .bind(vault_id)
                .fetch_all(&mut *tx)
                .await?;

        let mut removed = Vec::new();
        for row in rows {
            if keep.contains(row.remote_id.as_str()) {
                continue;
            }
            sqlx::query("DELETE FROM tracked_items WHERE id = ?")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            removed.push(TrackedItem::try_from(row)?);
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Marks an item as processed, storing the hash of the produced content.
    pub async fn mark_processed(
        &self,
        id: i64,
        content_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tracked_items SET processed = 1, content_hash = ?, synced_at = ? WHERE id = ?",
        )
        .bind(content_hash)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(&self, vault_id: i64) -> Result<VaultStats, sqlx::Error> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_documents,
                COUNT(CASE WHEN processed = 1 THEN 1 END) AS processed_documents,
                COUNT(CASE WHEN processed = 0 THEN 1 END) AS unprocessed_documents,
                COUNT(CASE WHEN is_folder = 1 THEN 1 END) AS folders,
                COUNT(CASE WHEN is_folder = 0 THEN 1 END) AS files,
                MAX(remote_last_modified) AS latest_modification,
                MAX(synced_at) AS last_sync
            FROM tracked_items
            WHERE vault_id = ?
            "#,
        )
        .bind(vault_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(VaultStats {
            total_documents: row.total_documents,
            processed_documents: row.processed_documents,
            unprocessed_documents: row.unprocessed_documents,
            folders: row.folders,
            files: row.files,
            latest_modification: parse_optional_timestamp(row.latest_modification)?,
            last_sync: parse_optional_timestamp(row.last_sync)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_db;
    use crate::db::VaultRepository;
    use crate::models::NewVault;
    use chrono::TimeZone;

    fn changes(remote_id: &str, name: &str, is_folder: bool) -> TrackedItemChanges {
        TrackedItemChanges {
            remote_id: remote_id.to_string(),
            file_name: format!("{}.md", name),
            display_name: name.to_string(),
            local_path: format!("documents/{}.md", name),
            remote_last_modified: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            remote_version: 1,
            parent_remote_id: None,
            is_folder,
            file_kind: if is_folder {
                FileKind::Folder
            } else {
                FileKind::Native
            },
        }
    }

    async fn create_vault(pool: &SqlitePool, name: &str) -> i64 {
        VaultRepository::new(pool.clone())
            .create(&NewVault::new(name, format!("/vaults/{}", name)))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        let inserted = repo
            .insert(vault_id, &changes("r1", "Diary", false), Utc::now())
            .await
            .unwrap();
        assert!(!inserted.processed);
        assert_eq!(inserted.remote_version, 1);

        let fetched = repo.get(vault_id, "r1").await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert!(repo.get(vault_id, "r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vault_remote_id_is_unique() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;
        let other_vault = create_vault(&db.pool, "other").await;

        repo.insert(vault_id, &changes("r1", "A", false), Utc::now())
            .await
            .unwrap();
        let err = repo
            .insert(vault_id, &changes("r1", "A", false), Utc::now())
            .await
            .unwrap_err();
        assert!(crate::db::is_unique_violation(&err));

        // Same remote id in a different vault is a different row
        repo.insert(other_vault, &changes("r1", "A", false), Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_resets_processed() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        let item = repo
            .insert(vault_id, &changes("r1", "Diary", false), Utc::now())
            .await
            .unwrap();
        repo.mark_processed(item.id, Some("abc123")).await.unwrap();

        let mut updated = changes("r1", "Diary 2", false);
        updated.remote_version = 3;
        repo.update_from_remote(item.id, &updated, Utc::now())
            .await
            .unwrap();

        let fetched = repo.get(vault_id, "r1").await.unwrap().unwrap();
        assert!(!fetched.processed);
        assert_eq!(fetched.remote_version, 3);
        assert_eq!(fetched.display_name, "Diary 2");
        assert_eq!(fetched.content_hash.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_error() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());

        let result = repo
            .update_from_remote(999, &changes("r1", "A", false), Utc::now())
            .await;
        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_delete_missing_keeps_listed_items() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        for id in ["a", "b", "c"] {
            repo.insert(vault_id, &changes(id, id, false), Utc::now())
                .await
                .unwrap();
        }

        let keep: HashSet<&str> = ["a", "c"].into_iter().collect();
        let removed = repo.delete_missing(vault_id, &keep).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].remote_id, "b");

        let remaining = repo.list_by_vault(vault_id).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn test_list_unprocessed_skips_folders_and_processed() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        repo.insert(vault_id, &changes("f", "Folder", true), Utc::now())
            .await
            .unwrap();
        let done = repo
            .insert(vault_id, &changes("d", "Done", false), Utc::now())
            .await
            .unwrap();
        repo.insert(vault_id, &changes("p", "Pending", false), Utc::now())
            .await
            .unwrap();
        repo.mark_processed(done.id, None).await.unwrap();

        let pending = repo.list_unprocessed(vault_id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].remote_id, "p");
    }

    #[tokio::test]
    async fn test_list_by_vault_orders_folders_first() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        repo.insert(vault_id, &changes("1", "Alpha", false), Utc::now())
            .await
            .unwrap();
        repo.insert(vault_id, &changes("2", "Zeta", true), Utc::now())
            .await
            .unwrap();

        let items = repo.list_by_vault(vault_id).await.unwrap();
        assert_eq!(items[0].display_name, "Zeta");
        assert_eq!(items[1].display_name, "Alpha");
    }

    #[tokio::test]
    async fn test_stats() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        let empty = repo.stats(vault_id).await.unwrap();
        assert_eq!(empty, VaultStats::default());

        repo.insert(vault_id, &changes("f", "Folder", true), Utc::now())
            .await
            .unwrap();
        let mut newer = changes("n", "Newer", false);
        newer.remote_last_modified = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let item = repo.insert(vault_id, &newer, Utc::now()).await.unwrap();
        repo.mark_processed(item.id, None).await.unwrap();

        let stats = repo.stats(vault_id).await.unwrap();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.processed_documents, 1);
        assert_eq!(stats.unprocessed_documents, 1);
        assert_eq!(stats.folders, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.latest_modification, newer.remote_last_modified);
        assert!(stats.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_vault_delete_cascades() {
        let db = setup_db().await;
        let repo = TrackedItemRepository::new(db.pool.clone());
        let vault_id = create_vault(&db.pool, "notes").await;

        repo.insert(vault_id, &changes("r1", "A", false), Utc::now())
            .await
            .unwrap();
        VaultRepository::new(db.pool.clone())
            .delete(vault_id)
            .await
            .unwrap();

        assert!(repo.list_by_vault(vault_id).await.unwrap().is_empty());
    }
}
