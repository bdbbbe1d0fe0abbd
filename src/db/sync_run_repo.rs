use chrono::Utc;
use sqlx::SqlitePool;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp};
use crate::models::{SyncKind, SyncRun, SyncStatus};

/// Append-only ledger of sync runs.
#[derive(Clone)]
pub struct SyncRunRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SyncRunRow {
    id: i64,
    vault_id: i64,
    kind: String,
    status: String,
    items_synced: i64,
    error_count: i64,
    error_message: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl TryFrom<SyncRunRow> for SyncRun {
    type Error = sqlx::Error;

    fn try_from(row: SyncRunRow) -> Result<Self, Self::Error> {
        let kind: SyncKind = row
            .kind
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let status: SyncStatus = row
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(SyncRun {
            id: row.id,
            vault_id: row.vault_id,
            kind,
            status,
            items_synced: row.items_synced,
            error_count: row.error_count,
            error_message: row.error_message,
            started_at: parse_timestamp(&row.started_at)?,
            completed_at: parse_optional_timestamp(row.completed_at)?,
        })
    }
}

impl SyncRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a new `in_progress` run.
    ///
    /// Fails with a UNIQUE violation if the vault already has a run in
    /// progress; the partial index makes this check atomic.
    pub async fn create(&self, vault_id: i64, kind: SyncKind) -> Result<SyncRun, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sync_runs (vault_id, kind, status, started_at) VALUES (?, ?, ?, ?)",
        )
        .bind(vault_id)
        .bind(kind.as_str())
        .bind(SyncStatus::InProgress.as_str())
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<SyncRun>, sqlx::Error> {
        let row: Option<SyncRunRow> = sqlx::query_as("SELECT * FROM sync_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SyncRun::try_from).transpose()
    }

    pub async fn find_in_progress(&self, vault_id: i64) -> Result<Option<SyncRun>, sqlx::Error> {
        let row: Option<SyncRunRow> =
            sqlx::query_as("SELECT * FROM sync_runs WHERE vault_id = ? AND status = 'in_progress'")
                .bind(vault_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(SyncRun::try_from).transpose()
    }

    /// All runs currently in progress, newest first.
    pub async fn list_active(&self) -> Result<Vec<SyncRun>, sqlx::Error> {
        let rows: Vec<SyncRunRow> = sqlx::query_as(
            "SELECT * FROM sync_runs WHERE status = 'in_progress' ORDER BY started_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SyncRun::try_from).collect()
    }

    /// Ledger entries, newest first, optionally for a single vault.
    pub async fn history(
        &self,
        vault_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncRun>, sqlx::Error> {
        let rows: Vec<SyncRunRow> = match vault_id {
            Some(vault_id) => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM sync_runs WHERE vault_id = ?
                    ORDER BY started_at DESC, id DESC LIMIT ? OFFSET ?
                    "#,
                )
                .bind(vault_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM sync_runs ORDER BY started_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(SyncRun::try_from).collect()
    }

    pub async fn latest_for_vault(&self, vault_id: i64) -> Result<Option<SyncRun>, sqlx::Error> {
        Ok(self.history(Some(vault_id), 1, 0).await?.into_iter().next())
    }

    /// Closes a run as successful. Returns false if the run was no longer
    /// in progress (for example it was stopped meanwhile).
    pub async fn complete_success(
        &self,
        id: i64,
        items_synced: i64,
        error_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sync_runs
            SET status = 'success', items_synced = ?, error_count = ?, completed_at = ?
            WHERE id = ? AND status = 'in_progress'
            "#,
        )
        .bind(items_synced)
        .bind(error_count)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Closes a run as failed. Returns false if the run was no longer in
    /// progress.
    pub async fn complete_error(&self, id: i64, message: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sync_runs
            SET status = 'error', error_message = ?, completed_at = ?
            WHERE id = ? AND status = 'in_progress'
            "#,
        )
        .bind(message)
        .bind(format_timestamp(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
