use crate::remote::RemoteError;

#[derive(Debug)]
pub enum SyncError {
    VaultNotFound(i64),
    /// Remote credentials are missing
    NotConfigured,
    /// The vault already has a run in progress
    AlreadyInProgress { vault_id: i64, run_id: Option<i64> },
    RunNotFound(i64),
    RunNotInProgress(i64),
    Remote(RemoteError),
    Database(sqlx::Error),
}

impl SyncError {
    /// Configuration errors are the caller's to fix and are never retried.
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::NotConfigured)
            || matches!(self, SyncError::Remote(RemoteError::NotConfigured))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::VaultNotFound(_) | SyncError::RunNotFound(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SyncError::AlreadyInProgress { .. } | SyncError::RunNotInProgress(_)
        )
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::VaultNotFound(id) => write!(f, "Vault not found: {}", id),
            SyncError::NotConfigured => write!(
                f,
                "Remote credentials not configured; set remote.device_token"
            ),
            SyncError::AlreadyInProgress { vault_id, .. } => {
                write!(f, "Sync already in progress for vault {}", vault_id)
            }
            SyncError::RunNotFound(id) => write!(f, "Sync run not found: {}", id),
            SyncError::RunNotInProgress(id) => write!(f, "Sync run {} is not in progress", id),
            SyncError::Remote(e) => write!(f, "Remote error: {}", e),
            SyncError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Remote(e) => Some(e),
            SyncError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        SyncError::Remote(e)
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Database(e)
    }
}
