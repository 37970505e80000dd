//! Transfer pipeline: download, hand off to the copy tool, clean up.
//!
//! For a job in `Processing`, iterates its selected files in listed
//! order. Per file: stream the download into the per-archive working
//! directory with throttled progress edits, delegate the local copy to
//! the copy tool, then delete the local file whatever the copy outcome.
//! Auth and fatal failures hard-stop the whole pass; not-found and
//! transient failures skip to the next file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arcferry_archive::{ArchiveFile, Download, FetchError};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::classify::{TransferClass, classify_copy_failure, classify_fetch_failure};
use crate::progress::{DEFAULT_EDIT_INTERVAL, UpdateThrottle, format_progress};
use crate::registry::{Destination, Job};

/// Opaque handle to the single evolving status message of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(pub u64);

/// A status send/edit failed at the transport.
#[derive(Debug, thiserror::Error)]
#[error("status update failed: {0}")]
pub struct SinkError(pub String);

/// Chat transport seam: one evolving status message per job.
///
/// Edits are best-effort from the pipeline's point of view; a failed
/// edit is logged and never aborts a transfer.
pub trait StatusSink: Send + Sync {
    /// Sends a new status message and returns its handle.
    fn send(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<MessageHandle, SinkError>> + Send + '_>>;

    /// Overwrites an existing status message.
    fn edit(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>>;
}

/// Source seam: opens the streaming download for one file.
pub trait FileFetcher: Send + Sync {
    fn open(
        &self,
        archive_id: &str,
        filename: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Download, FetchError>> + Send + '_>>;
}

/// A copy-tool failure, ready for classification.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    /// Process exit code, `None` when killed or never started.
    pub exit_code: Option<i32>,
    /// Captured diagnostic text.
    pub diagnostic: String,
}

/// Copy seam: hands a downloaded file to the external copy tool.
pub trait FileCopier: Send + Sync {
    fn copy(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CopyFailure>> + Send + '_>>;
}

/// Per-file result of one pipeline iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    /// The file is gone from the source; the pass continues.
    SkippedNotFound,
    /// Download failed in a retryable way; the pass continues.
    FailedTransient(String),
    /// Credentials expired for `remote`; terminates the job.
    FailedAuth { remote: String },
    /// Unrecoverable failure; terminates the job.
    FailedFatal(String),
}

impl FileOutcome {
    pub fn is_hard_stop(&self) -> bool {
        matches!(
            self,
            FileOutcome::FailedAuth { .. } | FileOutcome::FailedFatal(_)
        )
    }
}

/// Result of one full pipeline pass over a job's selected files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Files that reached the destination.
    pub completed: usize,
    /// True when an auth or fatal failure ended the pass early.
    pub hard_stopped: bool,
    /// Per-file outcomes, in processing order.
    pub outcomes: Vec<FileOutcome>,
}

impl JobOutcome {
    /// Files attempted before the pass ended.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

/// Streams each selected file from the archive to local disk and hands
/// it to the copy tool, reporting on one evolving status message.
pub struct TransferPipeline {
    fetcher: Arc<dyn FileFetcher>,
    copier: Arc<dyn FileCopier>,
    sink: Arc<dyn StatusSink>,
    work_dir: PathBuf,
    edit_interval: Duration,
}

/// Download failures: fetch errors plus local write errors.
#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("local write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferPipeline {
    pub fn new(
        fetcher: Arc<dyn FileFetcher>,
        copier: Arc<dyn FileCopier>,
        sink: Arc<dyn StatusSink>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            copier,
            sink,
            work_dir: work_dir.into(),
            edit_interval: DEFAULT_EDIT_INTERVAL,
        }
    }

    /// Overrides the status-edit interval (tests).
    pub fn with_edit_interval(mut self, interval: Duration) -> Self {
        self.edit_interval = interval;
        self
    }

    /// Runs the single transfer pass for a job.
    ///
    /// Files are processed strictly in listed order; a download completes
    /// fully before its copy starts, and the copy finishes before cleanup.
    /// The hard-stop decision is the returned boolean, never inferred
    /// from prior status text.
    pub async fn run(
        &self,
        job: &Job,
        destination: &Destination,
        status: &MessageHandle,
    ) -> JobOutcome {
        let total = job.selected_files.len();
        let remote_path = destination.remote_path(&job.archive_id);
        let target_dir = self.work_dir.join(&job.archive_id);

        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut hard_stopped = false;

        for (idx, file) in job.selected_files.iter().enumerate() {
            let position = idx + 1;
            let outcome = self
                .process_file(job, file, position, total, &target_dir, destination, status)
                .await;

            match &outcome {
                FileOutcome::Completed => {
                    completed += 1;
                    self.edit_best_effort(
                        status,
                        &format!("({position}/{total}) Uploaded: {}\n{remote_path}", file.name),
                    )
                    .await;
                }
                FileOutcome::SkippedNotFound => {
                    self.edit_best_effort(
                        status,
                        &format!(
                            "({position}/{total}) File not found at the source: {}",
                            file.name
                        ),
                    )
                    .await;
                }
                FileOutcome::FailedTransient(msg) => {
                    self.edit_best_effort(
                        status,
                        &format!("({position}/{total}) Download error for {}: {msg}", file.name),
                    )
                    .await;
                }
                FileOutcome::FailedAuth { remote } => {
                    hard_stopped = true;
                    self.edit_best_effort(
                        status,
                        &format!(
                            "Authentication error: token expired for remote `{remote}`.\n\
                             Run `rclone config reconnect {remote}:` manually, \
                             then submit the link again."
                        ),
                    )
                    .await;
                }
                FileOutcome::FailedFatal(msg) => {
                    hard_stopped = true;
                    self.edit_best_effort(
                        status,
                        &format!("({position}/{total}) Error for {}: {msg}", file.name),
                    )
                    .await;
                }
            }

            debug!(job = %job.job_id, file = %file.name, ?outcome, "file processed");
            outcomes.push(outcome);

            if hard_stopped {
                warn!(
                    job = %job.job_id,
                    file = %file.name,
                    remaining = total - position,
                    "hard stop, abandoning remaining files"
                );
                break;
            }
        }

        if !hard_stopped {
            self.edit_best_effort(
                status,
                &format!("Finished! All {total} files uploaded to {remote_path}"),
            )
            .await;
            info!(job = %job.job_id, files = total, remote = %remote_path, "job finished");
        }

        JobOutcome {
            completed,
            hard_stopped,
            outcomes,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_file(
        &self,
        job: &Job,
        file: &ArchiveFile,
        position: usize,
        total: usize,
        target_dir: &Path,
        destination: &Destination,
        status: &MessageHandle,
    ) -> FileOutcome {
        // Directory creation is idempotent; namespacing by archive id
        // keeps concurrent jobs for the same archive from colliding with
        // other archives' files.
        if let Err(e) = tokio::fs::create_dir_all(target_dir).await {
            return FileOutcome::FailedFatal(format!(
                "cannot create {}: {e}",
                target_dir.display()
            ));
        }
        let local_path = target_dir.join(&file.name);

        // 1. Download phase.
        self.edit_best_effort(
            status,
            &format!("({position}/{total}) Downloading: {}", file.name),
        )
        .await;

        if let Err(err) = self
            .download(job, file, &local_path, position, total, status)
            .await
        {
            // Best-effort removal of the partial file. A not-found error
            // just means the download failed before the file was created.
            if let Err(e) = tokio::fs::remove_file(&local_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %local_path.display(), error = %e, "failed to remove partial download");
                }
            }

            return match &err {
                DownloadError::Fetch(fetch) => match classify_fetch_failure(fetch) {
                    TransferClass::NotFound => FileOutcome::SkippedNotFound,
                    TransferClass::Transient => FileOutcome::FailedTransient(fetch.to_string()),
                    _ => FileOutcome::FailedFatal(fetch.to_string()),
                },
                DownloadError::Io(_) => FileOutcome::FailedFatal(err.to_string()),
            };
        }

        // 2. Upload phase.
        self.edit_best_effort(
            status,
            &format!(
                "({position}/{total}) Download complete, uploading: {}",
                file.name
            ),
        )
        .await;

        let remote_path = destination.remote_path(&job.archive_id);
        let copy_result = self.copier.copy(&local_path, &remote_path).await;

        // 3. Cleanup, regardless of the copy outcome.
        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            warn!(path = %local_path.display(), error = %e, "failed to remove local copy");
        }

        // 4. Outcome classification.
        match copy_result {
            Ok(()) => FileOutcome::Completed,
            Err(failure) => match classify_copy_failure(&failure.diagnostic) {
                TransferClass::AuthExpired => FileOutcome::FailedAuth {
                    remote: destination.remote.clone(),
                },
                _ => FileOutcome::FailedFatal(failure.diagnostic.trim().to_string()),
            },
        }
    }

    /// Streams one file to disk, emitting throttled progress edits.
    async fn download(
        &self,
        job: &Job,
        file: &ArchiveFile,
        local_path: &Path,
        position: usize,
        total_files: usize,
        status: &MessageHandle,
    ) -> Result<(), DownloadError> {
        let mut download = self.fetcher.open(&job.archive_id, &file.name).await?;

        // Declared transfer length wins; descriptor size is the fallback.
        let total_size = download.declared_len.or((file.size > 0).then_some(file.size));

        let mut out = tokio::fs::File::create(local_path).await?;
        let mut downloaded: u64 = 0;
        let mut throttle = UpdateThrottle::new(self.edit_interval);

        while let Some(chunk) = download.bytes.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if throttle.ready() {
                let bar = format_progress(downloaded, total_size);
                self.edit_best_effort(
                    status,
                    &format!(
                        "({position}/{total_files}) Downloading: {}\n{bar}",
                        file.name
                    ),
                )
                .await;
            }
        }

        out.flush().await?;
        debug!(file = %file.name, bytes = downloaded, "download complete");
        Ok(())
    }

    async fn edit_best_effort(&self, handle: &MessageHandle, text: &str) {
        if let Err(e) = self.sink.edit(handle, text).await {
            warn!(error = %e, "status edit failed");
        }
    }
}
