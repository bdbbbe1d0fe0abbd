//! Remarkidian Library
//!
//! Mirrors a document cloud account into local note vaults: fetches the
//! remote listing, reconciles it against tracked items stored in SQLite and
//! records every sync run in a ledger.

pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod server;
pub mod sync;

pub use config::{Config, ConfigError};
pub use db::init_db;
pub use remote::{DocumentSource, RemarkableClient, RemoteError};
pub use sync::{content_hash, SyncError, SyncOrchestrator};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
