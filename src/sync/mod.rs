//! The sync core: parse a remote listing, reconcile it into the record
//! store and track every run in the ledger.

mod error;
pub mod hierarchy;
mod orchestrator;
pub mod parser;
pub mod paths;
pub mod reconcile;

pub use error::SyncError;
pub use hierarchy::{build_forest, tracked_forest, Forest, Node};
pub use orchestrator::{SyncOrchestrator, STOPPED_MESSAGE};
pub use parser::{parse_documents, ParsedDocuments};
pub use reconcile::{ReconcileStats, Reconciler};

#[cfg(test)]
pub(crate) use orchestrator::testing;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of processed content, stored on the tracked item.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}
