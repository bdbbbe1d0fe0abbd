//! Remote document cloud access.
//!
//! The sync core only sees the [`DocumentSource`] trait: a capability that
//! returns the flat list of raw document records for the account.
//! [`RemarkableClient`] is the HTTP implementation.

mod client;
mod error;

pub use client::RemarkableClient;
pub use error::RemoteError;

use async_trait::async_trait;

use crate::models::RawDocument;

/// Something that can list every document and folder of the remote account.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fails fast when credentials are missing, before any network call.
    fn check_configured(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    /// Fetches the full, flat listing. Errors on auth or transport failure.
    async fn list_documents(&self) -> Result<Vec<RawDocument>, RemoteError>;
}
