//! Bridges the real collaborators onto the core's trait seams.
//!
//! The transfer crate stays decoupled from HTTP, subprocesses and the
//! terminal; these adapters are the only place the concrete clients and
//! the trait contracts meet.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arcferry_archive::{ArchiveClient, ArchiveFile, Download, FetchError};
use arcferry_rclone::{CopyError, RcloneCopier};
use arcferry_transfer::{
    CopyFailure, FileCopier, FileFetcher, FlowError, MessageHandle, MetadataProvider,
    RemoteLister, SinkError, StatusSink,
};

/// Metadata lookups over the archive client.
pub struct ArchiveMetadata {
    client: Arc<ArchiveClient>,
}

impl ArchiveMetadata {
    pub fn new(client: Arc<ArchiveClient>) -> Self {
        Self { client }
    }
}

impl MetadataProvider for ArchiveMetadata {
    fn list_files(
        &self,
        archive_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ArchiveFile>, FlowError>> + Send + '_>> {
        let archive_id = archive_id.to_string();
        Box::pin(async move {
            let meta = self
                .client
                .fetch_metadata(&archive_id)
                .await
                .map_err(|e| FlowError::Metadata(e.to_string()))?;
            Ok(meta.list_files())
        })
    }
}

/// Streaming downloads over the archive client.
pub struct ArchiveFetcher {
    client: Arc<ArchiveClient>,
}

impl ArchiveFetcher {
    pub fn new(client: Arc<ArchiveClient>) -> Self {
        Self { client }
    }
}

impl FileFetcher for ArchiveFetcher {
    fn open(
        &self,
        archive_id: &str,
        filename: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Download, FetchError>> + Send + '_>> {
        let archive_id = archive_id.to_string();
        let filename = filename.to_string();
        Box::pin(async move { self.client.open_download(&archive_id, &filename).await })
    }
}

/// Remote enumeration over the rclone config file.
pub struct RcloneRemotes {
    conf_path: PathBuf,
}

impl RcloneRemotes {
    pub fn new(conf_path: impl Into<PathBuf>) -> Self {
        Self {
            conf_path: conf_path.into(),
        }
    }
}

impl RemoteLister for RcloneRemotes {
    fn list_remotes(&self) -> Result<Vec<String>, FlowError> {
        arcferry_rclone::list_remotes(&self.conf_path)
            .map_err(|e| FlowError::Metadata(format!("cannot read rclone config: {e}")))
    }
}

/// Copy delegation to the rclone subprocess.
pub struct RcloneCopy {
    copier: RcloneCopier,
}

impl RcloneCopy {
    pub fn new(copier: RcloneCopier) -> Self {
        Self { copier }
    }
}

impl FileCopier for RcloneCopy {
    fn copy(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CopyFailure>> + Send + '_>> {
        let local_path = local_path.to_path_buf();
        let remote_path = remote_path.to_string();
        Box::pin(async move {
            match self.copier.copy(&local_path, &remote_path, &[]).await {
                Ok(_) => Ok(()),
                Err(CopyError::Spawn(e)) => Err(CopyFailure {
                    exit_code: None,
                    diagnostic: format!("failed to run rclone: {e}"),
                }),
                Err(CopyError::Failed {
                    exit_code,
                    diagnostic,
                }) => Err(CopyFailure {
                    exit_code,
                    diagnostic,
                }),
            }
        })
    }
}

/// Console rendition of the evolving status message.
///
/// A real chat transport edits one message in place; the terminal can
/// only append, so every edit reprints the line tagged with its handle.
#[derive(Default)]
pub struct ConsoleSink {
    next_id: AtomicU64,
}

impl StatusSink for ConsoleSink {
    fn send(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<MessageHandle, SinkError>> + Send + '_>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[#{id}] {text}");
        Box::pin(async move { Ok(MessageHandle(id)) })
    }

    fn edit(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        println!("[#{}] {text}", handle.0);
        Box::pin(async { Ok(()) })
    }
}
