use chrono::Utc;
use sqlx::SqlitePool;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp};
use crate::models::{NewVault, Vault};

#[derive(Clone)]
pub struct VaultRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct VaultRow {
    id: i64,
    name: String,
    local_path: String,
    sync_enabled: bool,
    last_synced_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<VaultRow> for Vault {
    type Error = sqlx::Error;

    fn try_from(row: VaultRow) -> Result<Self, Self::Error> {
        Ok(Vault {
            id: row.id,
            name: row.name,
            local_path: row.local_path,
            sync_enabled: row.sync_enabled,
            last_synced_at: parse_optional_timestamp(row.last_synced_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl VaultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, vault: &NewVault) -> Result<Vault, sqlx::Error> {
        let now = format_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO vaults (name, local_path, sync_enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vault.name)
        .bind(&vault.local_path)
        .bind(vault.sync_enabled)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Vault>, sqlx::Error> {
        let row: Option<VaultRow> = sqlx::query_as("SELECT * FROM vaults WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Vault::try_from).transpose()
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Vault>, sqlx::Error> {
        let row: Option<VaultRow> =
            sqlx::query_as("SELECT * FROM vaults WHERE LOWER(name) = LOWER(?)")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Vault::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Vault>, sqlx::Error> {
        let rows: Vec<VaultRow> = sqlx::query_as("SELECT * FROM vaults ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Vault::try_from).collect()
    }

    pub async fn list_sync_enabled(&self) -> Result<Vec<Vault>, sqlx::Error> {
        let rows: Vec<VaultRow> =
            sqlx::query_as("SELECT * FROM vaults WHERE sync_enabled = 1 ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Vault::try_from).collect()
    }

    pub async fn set_sync_enabled(&self, id: i64, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE vaults SET sync_enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled)
            .bind(format_timestamp(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Records the completion time of a successful sync.
    pub async fn touch_last_synced(&self, id: i64) -> Result<(), sqlx::Error> {
        let now = format_timestamp(&Utc::now());
        sqlx::query("UPDATE vaults SET last_synced_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a vault. CASCADE removes its tracked items and sync runs.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vaults WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;
    use crate::db::test_support::setup_db;

    #[tokio::test]
    async fn test_create_and_get_vault() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        let created = repo
            .create(&NewVault::new("Notes", "/vaults/notes"))
            .await
            .unwrap();
        assert_eq!(created.name, "Notes");
        assert!(created.sync_enabled);
        assert!(created.last_synced_at.is_none());

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_by_name_case_insensitive() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        repo.create(&NewVault::new("Work Notes", "/w")).await.unwrap();

        assert!(repo.get_by_name("work notes").await.unwrap().is_some());
        assert!(repo.get_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_unique_violation() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        repo.create(&NewVault::new("Notes", "/a")).await.unwrap();
        let err = repo.create(&NewVault::new("Notes", "/b")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_list_sync_enabled() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        repo.create(&NewVault::new("B", "/b")).await.unwrap();
        repo.create(&NewVault::new("A", "/a").with_sync_enabled(false))
            .await
            .unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "A");

        let enabled = repo.list_sync_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "B");
    }

    #[tokio::test]
    async fn test_touch_last_synced() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        let vault = repo.create(&NewVault::new("Notes", "/n")).await.unwrap();
        repo.touch_last_synced(vault.id).await.unwrap();

        let fetched = repo.get_by_id(vault.id).await.unwrap().unwrap();
        assert!(fetched.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_vault() {
        let db = setup_db().await;
        let repo = VaultRepository::new(db.pool.clone());

        let vault = repo.create(&NewVault::new("Gone", "/g")).await.unwrap();
        assert!(repo.delete(vault.id).await.unwrap());
        assert!(repo.get_by_id(vault.id).await.unwrap().is_none());
        assert!(!repo.delete(vault.id).await.unwrap());
    }
}
