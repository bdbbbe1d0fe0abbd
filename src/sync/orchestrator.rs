//! Runs syncs for vaults and records each one in the sync ledger.
//!
//! A run goes: create ledger row `in_progress`, fetch the listing, parse,
//! reconcile, then complete the row as `success` or `error`. The partial
//! unique index on in-progress runs guarantees one in-flight run per vault
//! even when two callers race past the pre-check.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use super::hierarchy::{tracked_forest, Node};
use super::parser::parse_documents;
use super::reconcile::{ReconcileStats, Reconciler};
use super::SyncError;
use crate::db::{is_unique_violation, SyncRunRepository, TrackedItemRepository, VaultRepository};
use crate::models::{SyncKind, SyncRun, TrackedItem, VaultStats};
use crate::remote::{DocumentSource, RemoteError};

/// Message recorded on runs ended through [`SyncOrchestrator::stop_sync`].
pub const STOPPED_MESSAGE: &str = "Manually stopped";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Clone)]
pub struct SyncOrchestrator {
    vaults: VaultRepository,
    items: TrackedItemRepository,
    runs: SyncRunRepository,
    source: Arc<dyn DocumentSource>,
    fetch_timeout: Duration,
}

impl SyncOrchestrator {
    pub fn new(pool: SqlitePool, source: Arc<dyn DocumentSource>) -> Self {
        Self {
            vaults: VaultRepository::new(pool.clone()),
            items: TrackedItemRepository::new(pool.clone()),
            runs: SyncRunRepository::new(pool),
            source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Deadline for one complete remote listing fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Starts a sync in the background and returns its run id immediately.
    ///
    /// Completion is observed by reading the run from the ledger.
    pub async fn start_sync(&self, vault_id: i64, kind: SyncKind) -> Result<i64, SyncError> {
        let run = self.begin_run(vault_id, kind).await?;
        let run_id = run.id;

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.execute(run).await {
                tracing::error!(run_id, error = %e, "Failed to record sync outcome");
            }
        });

        Ok(run_id)
    }

    /// Runs a sync to completion and returns the finished ledger entry.
    ///
    /// A failed sync is not an `Err`: it comes back as a run with status
    /// `error`. `Err` means the run could not be started or recorded.
    pub async fn run_sync(&self, vault_id: i64, kind: SyncKind) -> Result<SyncRun, SyncError> {
        let run = self.begin_run(vault_id, kind).await?;
        self.execute(run).await
    }

    /// Starts a scheduled run for every vault with sync enabled.
    ///
    /// Vaults that are already syncing are skipped. Returns the started run ids.
    pub async fn start_scheduled(&self) -> Result<Vec<i64>, SyncError> {
        let mut started = Vec::new();
        for vault in self.vaults.list_sync_enabled().await? {
            match self.start_sync(vault.id, SyncKind::Scheduled).await {
                Ok(run_id) => started.push(run_id),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(vault_id = vault.id, "Skipping scheduled sync, run in progress");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(started)
    }

    /// Marks an in-progress run as failed.
    ///
    /// This only updates the ledger. Work already in flight keeps running,
    /// but its completion can no longer overwrite the stopped status.
    pub async fn stop_sync(&self, run_id: i64) -> Result<SyncRun, SyncError> {
        let run = self
            .runs
            .get_by_id(run_id)
            .await?
            .ok_or(SyncError::RunNotFound(run_id))?;

        if !run.is_in_progress() || !self.runs.complete_error(run_id, STOPPED_MESSAGE).await? {
            return Err(SyncError::RunNotInProgress(run_id));
        }

        tracing::info!(run_id, vault_id = run.vault_id, "Sync run stopped");
        self.load_run(run_id).await
    }

    pub async fn get_sync_stats(&self, vault_id: i64) -> Result<VaultStats, SyncError> {
        self.require_vault(vault_id).await?;
        Ok(self.items.stats(vault_id).await?)
    }

    /// Rebuilds the vault's folder tree from stored parent references.
    ///
    /// Items on a stale parent loop are shown as roots.
    pub async fn get_document_hierarchy(
        &self,
        vault_id: i64,
    ) -> Result<Vec<Node<TrackedItem>>, SyncError> {
        self.require_vault(vault_id).await?;
        let items = self.items.list_by_vault(vault_id).await?;
        Ok(tracked_forest(vault_id, items))
    }

    async fn require_vault(&self, vault_id: i64) -> Result<(), SyncError> {
        match self.vaults.get_by_id(vault_id).await? {
            Some(_) => Ok(()),
            None => Err(SyncError::VaultNotFound(vault_id)),
        }
    }

    async fn begin_run(&self, vault_id: i64, kind: SyncKind) -> Result<SyncRun, SyncError> {
        self.require_vault(vault_id).await?;

        if self.source.check_configured().is_err() {
            return Err(SyncError::NotConfigured);
        }

        if let Some(active) = self.runs.find_in_progress(vault_id).await? {
            return Err(SyncError::AlreadyInProgress {
                vault_id,
                run_id: Some(active.id),
            });
        }

        let run = match self.runs.create(vault_id, kind).await {
            Ok(run) => run,
            Err(e) if is_unique_violation(&e) => {
                return Err(SyncError::AlreadyInProgress {
                    vault_id,
                    run_id: None,
                })
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(run_id = run.id, vault_id, kind = %kind, "Sync run started");
        Ok(run)
    }

    async fn execute(&self, run: SyncRun) -> Result<SyncRun, SyncError> {
        if let Err(e) = self.record_outcome(&run).await {
            // An open in-progress row blocks every later run for the vault.
            let message = format!("Failed to record sync outcome: {}", e);
            match self.runs.complete_error(run.id, &message).await {
                Ok(true) => tracing::warn!(run_id = run.id, error = %e, "Closed run as failed"),
                Ok(false) => {}
                Err(close) => tracing::error!(
                    run_id = run.id,
                    error = %close,
                    "Run left in progress; clear it with `remarkidian sync stop {}`",
                    run.id
                ),
            }
            return Err(e);
        }

        self.load_run(run.id).await
    }

    async fn record_outcome(&self, run: &SyncRun) -> Result<(), SyncError> {
        match self.sync_vault(run.vault_id).await {
            Ok(stats) => {
                let recorded = self
                    .runs
                    .complete_success(run.id, stats.items_synced() as i64, stats.errors as i64)
                    .await?;
                if recorded {
                    self.vaults.touch_last_synced(run.vault_id).await?;
                    tracing::info!(
                        run_id = run.id,
                        vault_id = run.vault_id,
                        items_synced = stats.items_synced(),
                        errors = stats.errors,
                        "Sync run succeeded"
                    );
                } else {
                    tracing::warn!(run_id = run.id, "Sync finished after the run was stopped");
                }
            }
            Err(e) => {
                tracing::error!(
                    run_id = run.id,
                    vault_id = run.vault_id,
                    error = %e,
                    "Sync run failed"
                );
                self.runs.complete_error(run.id, &e.to_string()).await?;
            }
        }
        Ok(())
    }

    async fn sync_vault(&self, vault_id: i64) -> Result<ReconcileStats, SyncError> {
        let raw = tokio::time::timeout(self.fetch_timeout, self.source.list_documents())
            .await
            .map_err(|_| RemoteError::Timeout(self.fetch_timeout))??;
        tracing::info!(vault_id, count = raw.len(), "Fetched remote listing");

        let parsed = parse_documents(raw);
        tracing::debug!(
            vault_id,
            roots = parsed.hierarchy.roots.len(),
            broken_cycles = parsed.hierarchy.cycles.len(),
            "Built remote hierarchy"
        );

        let mut stats = Reconciler::new(self.items.clone())
            .reconcile(vault_id, &parsed.items)
            .await;
        stats.errors += parsed.hierarchy.cycle_members();
        Ok(stats)
    }

    async fn load_run(&self, run_id: i64) -> Result<SyncRun, SyncError> {
        self.runs
            .get_by_id(run_id)
            .await?
            .ok_or(SyncError::RunNotFound(run_id))
    }
}
