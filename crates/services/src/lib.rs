pub mod cloud_storage;
pub mod credential;
pub mod export;

pub use cloud_storage::{GoogleDriveStore, RemoteEntry, RemoteStore, StoreError};
pub use credential::{Credential, CredentialError, CredentialManager, Trust, Verdict};
pub use export::{ExportError, TreeExporter};
