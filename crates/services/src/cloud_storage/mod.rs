pub mod google_drive;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::Credential;

pub use google_drive::GoogleDriveStore;

/// Mime type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Immutable snapshot of a remote file or folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub is_container: bool,
    pub size: Option<u64>,
    pub modified_at: Option<String>,
}

impl RemoteEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            is_container: true,
            size: None,
            modified_at: None,
        }
    }

    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            is_container: false,
            size: None,
            modified_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    Denied(String),
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Transport,
    NotFound,
    Denied,
    QuotaExceeded,
    Remote,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Transport(_) => StoreErrorKind::Transport,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::Denied(_) => StoreErrorKind::Denied,
            StoreError::QuotaExceeded(_) => StoreErrorKind::QuotaExceeded,
            StoreError::Remote { .. } | StoreError::Decode(_) => StoreErrorKind::Remote,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Port over the remote file API. Implementations hold no per-call state
/// beyond what the `Credential` carries.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Lists the direct children of `container_id`, or of the drive root when `None`.
    async fn list_children(
        &self,
        credential: &Credential,
        container_id: Option<&str>,
    ) -> StoreResult<Vec<RemoteEntry>>;

    async fn get_metadata(&self, credential: &Credential, entry_id: &str)
    -> StoreResult<RemoteEntry>;

    async fn download_content(&self, credential: &Credential, entry_id: &str)
    -> StoreResult<Vec<u8>>;

    async fn export_content(
        &self,
        credential: &Credential,
        entry_id: &str,
        target_mime_type: &str,
    ) -> StoreResult<Vec<u8>>;

    async fn upload_content(
        &self,
        credential: &Credential,
        content: Vec<u8>,
        name: &str,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> StoreResult<RemoteEntry>;

    async fn delete(&self, credential: &Credential, entry_id: &str) -> StoreResult<()>;
}
