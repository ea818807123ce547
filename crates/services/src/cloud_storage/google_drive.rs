use std::time::Duration;

use async_trait::async_trait;
use drivegate_config::DriveSettings;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{FOLDER_MIME_TYPE, RemoteEntry, RemoteStore, StoreError, StoreResult};
use crate::credential::Credential;

const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    size: Option<String>,
    modified_time: Option<String>,
}

impl From<DriveFile> for RemoteEntry {
    fn from(f: DriveFile) -> Self {
        RemoteEntry {
            is_container: f.mime_type == FOLDER_MIME_TYPE,
            id: f.id,
            name: f.name,
            mime_type: f.mime_type,
            size: f.size.and_then(|s| s.parse().ok()),
            modified_at: f.modified_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Google Drive v3 implementation of the remote store port.
pub struct GoogleDriveStore {
    client: Client,
    api_url: String,
    upload_url: String,
    page_size: u32,
}

impl GoogleDriveStore {
    pub fn new(settings: &DriveSettings, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            upload_url: settings.upload_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size,
        }
    }

    fn file_url(&self, entry_id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(entry_id))
    }
}

/// Escapes a value for a single-quoted literal in a Drive `q` expression.
/// Backslashes go first so an escaped quote cannot be unescaped again.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Turns a non-2xx Drive response into the matching `StoreError`.
async fn check_status(resp: Response, entry: &str) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();
    let reason = body["error"]["errors"][0]["reason"].as_str().unwrap_or("");

    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(format!("{}: {}", entry, message)),
        StatusCode::FORBIDDEN
            if reason == "storageQuotaExceeded" || reason == "quotaExceeded" =>
        {
            StoreError::QuotaExceeded(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Denied(format!("{}: {}", entry, message))
        }
        _ => StoreError::Remote {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl RemoteStore for GoogleDriveStore {
    fn provider_name(&self) -> &str {
        "google_drive"
    }

    async fn list_children(
        &self,
        credential: &Credential,
        container_id: Option<&str>,
    ) -> StoreResult<Vec<RemoteEntry>> {
        let parent = container_id.unwrap_or("root");
        let query = format!(
            "'{}' in parents and trashed = false",
            escape_query_literal(parent)
        );
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let page_size = self.page_size.to_string();

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let resp = self
                .client
                .get(format!("{}/files", self.api_url))
                .bearer_auth(credential.access_token())
                .query(&params)
                .send()
                .await?;
            let page: DriveFileList = check_status(resp, parent).await?.json().await?;

            entries.extend(page.files.into_iter().map(RemoteEntry::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(parent, count = entries.len(), "Listed drive children");
        Ok(entries)
    }

    async fn get_metadata(
        &self,
        credential: &Credential,
        entry_id: &str,
    ) -> StoreResult<RemoteEntry> {
        let resp = self
            .client
            .get(self.file_url(entry_id))
            .bearer_auth(credential.access_token())
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await?;
        let file: DriveFile = check_status(resp, entry_id).await?.json().await?;
        Ok(file.into())
    }

    async fn download_content(
        &self,
        credential: &Credential,
        entry_id: &str,
    ) -> StoreResult<Vec<u8>> {
        let resp = self
            .client
            .get(self.file_url(entry_id))
            .bearer_auth(credential.access_token())
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = check_status(resp, entry_id).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn export_content(
        &self,
        credential: &Credential,
        entry_id: &str,
        target_mime_type: &str,
    ) -> StoreResult<Vec<u8>> {
        let resp = self
            .client
            .get(format!("{}/export", self.file_url(entry_id)))
            .bearer_auth(credential.access_token())
            .query(&[("mimeType", target_mime_type)])
            .send()
            .await?;
        let bytes = check_status(resp, entry_id).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        credential: &Credential,
        content: Vec<u8>,
        name: &str,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> StoreResult<RemoteEntry> {
        let mut metadata = serde_json::json!({ "name": name });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let boundary = format!("drivegate-{:016x}", rand::random::<u64>());
        let mut body = Vec::with_capacity(content.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
                b = boundary,
                m = metadata,
                t = mime_type,
            )
            .as_bytes(),
        );
        body.extend_from_slice(&content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let resp = self
            .client
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(credential.access_token())
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        let file: DriveFile = check_status(resp, name).await?.json().await?;
        debug!(id = %file.id, name, "Uploaded drive file");
        Ok(file.into())
    }

    async fn delete(&self, credential: &Credential, entry_id: &str) -> StoreResult<()> {
        let resp = self
            .client
            .delete(self.file_url(entry_id))
            .bearer_auth(credential.access_token())
            .send()
            .await?;
        check_status(resp, entry_id).await?;
        Ok(())
    }
}
