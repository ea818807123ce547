use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
};
use drivegate_services::RemoteEntry;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::{error::ApiError, extractors::auth::DriveUser, state::AppState};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderQuery {
    pub folder_id: String,
}

pub async fn list(
    State(state): State<AppState>,
    user: DriveUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RemoteEntry>>, ApiError> {
    let parent = query.parent_id.as_deref().filter(|p| !p.is_empty());
    let entries = state.store.list_children(&user.credential, parent).await?;
    Ok(Json(entries))
}

pub async fn get(
    State(state): State<AppState>,
    user: DriveUser,
    Path(file_id): Path<String>,
) -> Result<Json<RemoteEntry>, ApiError> {
    let entry = state.store.get_metadata(&user.credential, &file_id).await?;
    Ok(Json(entry))
}

/// Upload a file via multipart form data.
/// Fields: `file` (binary), `folderId` (text, optional)
pub async fn upload(
    State(state): State<AppState>,
    user: DriveUser,
    mut multipart: Multipart,
) -> Result<Json<RemoteEntry>, ApiError> {
    let mut file_data: Option<(String, String, Vec<u8>)> = None; // (name, mime_type, bytes)
    let mut folder_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file_data = Some((filename, content_type, bytes.to_vec()));
            }
            "folderId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                if !text.is_empty() {
                    folder_id = Some(text);
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file_data.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    let size = bytes.len();

    let entry = state
        .store
        .upload_content(
            &user.credential,
            bytes,
            &filename,
            &content_type,
            folder_id.as_deref(),
        )
        .await?;

    info!(id = %entry.id, name = %entry.name, size, "Uploaded file");
    Ok(Json(entry))
}

/// Downloads one file, exporting workspace-native documents to their
/// converted format.
pub async fn download_file(
    State(state): State<AppState>,
    user: DriveUser,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let entry = state
        .store
        .get_metadata(&user.credential, &query.file_id)
        .await?;
    let (bytes, mime_type) = state.exporter.fetch_leaf(&user.credential, &entry).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_DISPOSITION, attachment(&entry.name))
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// Downloads a whole folder tree as `folder.zip`.
///
/// The archive is spooled to a temp file first so a failed export returns an
/// error status instead of a truncated archive.
pub async fn download_folder(
    State(state): State<AppState>,
    user: DriveUser,
    Query(query): Query<FolderQuery>,
) -> Result<Response, ApiError> {
    let (file, stats) = state
        .exporter
        .export_to_tempfile(&user.credential, &query.folder_id)
        .await?;
    let length = file
        .metadata()
        .map_err(|e| ApiError::Internal(format!("Failed to stat archive: {}", e)))?
        .len();

    info!(
        folder_id = %query.folder_id,
        entries = stats.entries,
        bytes = length,
        "Streaming folder archive"
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, attachment("folder.zip"))
        .body(file_body(file))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

pub async fn delete(
    State(state): State<AppState>,
    user: DriveUser,
    Query(query): Query<FileQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete(&user.credential, &query.file_id).await?;
    info!(file_id = %query.file_id, "Deleted file");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', "'"))
}

/// Streams a spooled file in fixed-size chunks. The temp file is removed
/// when the stream is dropped.
fn file_body(file: std::fs::File) -> Body {
    let file = tokio::fs::File::from_std(file);
    let stream = futures::stream::unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok::<_, std::io::Error>(Bytes::from(buf)), file))
            }
            Err(e) => Some((Err(e), file)),
        }
    });
    Body::from_stream(stream)
}
