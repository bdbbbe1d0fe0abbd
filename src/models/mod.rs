mod file_kind;
mod remote_item;
mod sync_run;
mod tracked_item;
mod vault;

pub use file_kind::FileKind;
pub use remote_item::{ItemKind, RawDocument, RemoteItem, COLLECTION_TYPE};
pub use sync_run::{SyncKind, SyncRun, SyncStatus};
pub use tracked_item::{TrackedItem, TrackedItemChanges, VaultStats};
pub use vault::{NewVault, Vault};
