pub mod archive;

use std::collections::HashSet;
use std::fs::File;
use std::future::Future;
use std::io::{Seek, SeekFrom, Write};
use std::pin::Pin;
use std::sync::Arc;

use drivegate_config::ExportSettings;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;

use crate::cloud_storage::{FOLDER_MIME_TYPE, RemoteEntry, RemoteStore, StoreError};
use crate::credential::{Credential, Trust};

use archive::{ArchiveSink, Discard};

const WORKSPACE_PREFIX: &str = "application/vnd.google-apps.";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Credential is not usable ({0:?})")]
    InvalidCredential(Trust),
    #[error("No export format for {mime_type} ({path})")]
    UnsupportedExportType {
        entry_id: String,
        path: String,
        mime_type: String,
    },
    #[error("Folder {entry_id} is its own ancestor ({path})")]
    CycleDetected { entry_id: String, path: String },
    #[error("Folder nesting deeper than {max_depth} ({path})")]
    DepthExceeded { path: String, max_depth: usize },
    #[error("Remote call failed for {entry_id} ({path}): {source}")]
    Remote {
        entry_id: String,
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("Archive error: {0}")]
    Archive(#[from] ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a leaf's bytes are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Native,
    Convert(&'static str),
    Unsupported,
}

pub fn representation(mime_type: &str) -> Representation {
    match mime_type {
        "application/vnd.google-apps.document" => Representation::Convert("application/pdf"),
        "application/vnd.google-apps.spreadsheet" => Representation::Convert(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        "application/vnd.google-apps.presentation" => Representation::Convert(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        other if other.starts_with(WORKSPACE_PREFIX) => Representation::Unsupported,
        _ => Representation::Native,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub entries: usize,
    pub bytes: u64,
    pub folders: usize,
}

/// Traversal state for one export.
struct ExportPlan {
    ancestors: HashSet<String>,
    folders: usize,
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>>;

/// Walks a remote folder depth-first and writes every leaf into a ZIP archive.
pub struct TreeExporter {
    store: Arc<dyn RemoteStore>,
    settings: ExportSettings,
}

impl TreeExporter {
    pub fn new(store: Arc<dyn RemoteStore>, settings: ExportSettings) -> Self {
        Self { store, settings }
    }

    /// Exports the subtree under `folder_id` into `target`.
    ///
    /// The archive is finished and `target` handed back only when every
    /// entry was written. On any failure the sink is closed and `target`
    /// emptied before the error is returned.
    pub async fn export<W>(
        &self,
        credential: &Credential,
        folder_id: &str,
        target: W,
    ) -> Result<(W, ExportStats), ExportError>
    where
        W: Write + Seek + Discard + Send,
    {
        if !credential.is_valid() {
            return Err(ExportError::InvalidCredential(credential.trust()));
        }

        let mut sink = ArchiveSink::new(target);
        let mut plan = ExportPlan {
            ancestors: HashSet::from([folder_id.to_string()]),
            folders: 1,
        };

        info!(folder_id, provider = self.store.provider_name(), "Starting folder export");
        let walked = self
            .walk(credential, folder_id, String::new(), 0, &mut plan, &mut sink)
            .await;

        match walked {
            Ok(()) => {
                let stats = ExportStats {
                    entries: sink.entries(),
                    bytes: sink.bytes(),
                    folders: plan.folders,
                };
                let target = sink.finish()?;
                info!(
                    folder_id,
                    entries = stats.entries,
                    bytes = stats.bytes,
                    folders = stats.folders,
                    "Folder export finished"
                );
                Ok((target, stats))
            }
            Err(e) => {
                warn!(folder_id, written = sink.entries(), error = %e, "Folder export aborted");
                sink.abort();
                Err(e)
            }
        }
    }

    /// Runs an export into an anonymous temp file and returns it rewound.
    /// A failed export leaves nothing behind.
    pub async fn export_to_tempfile(
        &self,
        credential: &Credential,
        folder_id: &str,
    ) -> Result<(File, ExportStats), ExportError> {
        let file = tempfile::tempfile()?;
        let (mut file, stats) = self.export(credential, folder_id, file).await?;
        file.seek(SeekFrom::Start(0))?;
        Ok((file, stats))
    }

    /// Fetches a leaf's bytes according to the conversion rule. Returns the
    /// content together with its resulting mime type.
    pub async fn fetch_leaf(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
    ) -> Result<(Vec<u8>, String), ExportError> {
        self.fetch_at(credential, entry, &entry.name).await
    }

    async fn fetch_at(
        &self,
        credential: &Credential,
        entry: &RemoteEntry,
        path: &str,
    ) -> Result<(Vec<u8>, String), ExportError> {
        let remote = |source: StoreError| ExportError::Remote {
            entry_id: entry.id.clone(),
            path: path.to_string(),
            source,
        };

        if entry.is_container || entry.mime_type == FOLDER_MIME_TYPE {
            return Err(ExportError::UnsupportedExportType {
                entry_id: entry.id.clone(),
                path: path.to_string(),
                mime_type: entry.mime_type.clone(),
            });
        }

        match representation(&entry.mime_type) {
            Representation::Native => {
                let bytes = self
                    .store
                    .download_content(credential, &entry.id)
                    .await
                    .map_err(remote)?;
                Ok((bytes, entry.mime_type.clone()))
            }
            Representation::Convert(target) => {
                debug!(entry_id = %entry.id, from = %entry.mime_type, to = target, "Converting document");
                let bytes = self
                    .store
                    .export_content(credential, &entry.id, target)
                    .await
                    .map_err(remote)?;
                Ok((bytes, target.to_string()))
            }
            Representation::Unsupported => Err(ExportError::UnsupportedExportType {
                entry_id: entry.id.clone(),
                path: path.to_string(),
                mime_type: entry.mime_type.clone(),
            }),
        }
    }

    fn walk<'a, W>(
        &'a self,
        credential: &'a Credential,
        container_id: &'a str,
        prefix: String,
        depth: usize,
        plan: &'a mut ExportPlan,
        sink: &'a mut ArchiveSink<W>,
    ) -> WalkFuture<'a>
    where
        W: Write + Seek + Discard + Send,
    {
        Box::pin(async move {
            let mut children = self
                .store
                .list_children(credential, Some(container_id))
                .await
                .map_err(|source| ExportError::Remote {
                    entry_id: container_id.to_string(),
                    path: prefix.clone(),
                    source,
                })?;

            if self.settings.sort_by_name {
                children.sort_by(|a, b| a.name.cmp(&b.name));
            }
            debug!(container_id, path = %prefix, children = children.len(), "Listed folder");

            for child in &children {
                let path = join_path(&prefix, &segment_name(child));

                if child.is_container {
                    if depth + 1 > self.settings.max_depth {
                        return Err(ExportError::DepthExceeded {
                            path,
                            max_depth: self.settings.max_depth,
                        });
                    }
                    if !plan.ancestors.insert(child.id.clone()) {
                        return Err(ExportError::CycleDetected {
                            entry_id: child.id.clone(),
                            path,
                        });
                    }
                    plan.folders += 1;

                    self.walk(credential, &child.id, path, depth + 1, plan, sink)
                        .await?;
                    plan.ancestors.remove(&child.id);
                } else {
                    let (bytes, _) = self.fetch_at(credential, child, &path).await?;
                    sink.add_entry(&path, &bytes)?;
                    debug!(entry_id = %child.id, path = %path, size = bytes.len(), "Wrote archive entry");
                }
            }

            Ok(())
        })
    }
}

fn segment_name(entry: &RemoteEntry) -> String {
    if entry.name.is_empty() {
        warn!(entry_id = %entry.id, "Entry has no name, using its id");
        return entry.id.clone();
    }
    if entry.name.contains('/') || entry.name == "." || entry.name == ".." {
        warn!(entry_id = %entry.id, name = %entry.name, "Entry name is written verbatim into the archive path");
    }
    entry.name.clone()
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
