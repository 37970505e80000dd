//! rclone integration.
//!
//! Two operations: enumerating the remotes registered in an rclone config
//! file, and running `rclone copy` for a single local file. Transfer
//! tuning (`--transfers`, `--checkers`, `--drive-chunk-size`) is fixed
//! here and opaque to callers.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

const TRANSFERS: &str = "4";
const CHECKERS: &str = "8";
const DRIVE_CHUNK_SIZE: &str = "32M";

/// Errors from an rclone invocation.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("failed to run rclone: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("rclone exited with code {exit_code:?}: {diagnostic}")]
    Failed {
        /// Process exit code, `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr, falling back to stdout when stderr is empty.
        diagnostic: String,
    },
}

/// Lists the remote names registered in an rclone config file.
///
/// Remote names are the bracketed section headers. A missing file is not
/// an error: no file simply means no remotes registered yet.
pub fn list_remotes(conf_path: &Path) -> std::io::Result<Vec<String>> {
    if !conf_path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(conf_path)?;
    let mut remotes = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if !name.is_empty() {
                remotes.push(name.to_string());
            }
        }
    }
    Ok(remotes)
}

/// Runs `rclone copy` against a fixed config file.
pub struct RcloneCopier {
    binary: String,
    conf_path: PathBuf,
}

impl RcloneCopier {
    /// Creates a copier using the `rclone` binary from `PATH`.
    pub fn new(conf_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: "rclone".to_string(),
            conf_path: conf_path.into(),
        }
    }

    /// Overrides the rclone binary (tests).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Copies one local file to `remote_path` (e.g. `gdrive:Archive/item`).
    ///
    /// Returns captured stdout on success. On a non-zero exit the
    /// diagnostic text is preserved verbatim so callers can classify it.
    pub async fn copy(
        &self,
        local_path: &Path,
        remote_path: &str,
        extra_args: &[String],
    ) -> Result<String, CopyError> {
        let args = build_copy_args(local_path, remote_path, &self.conf_path, extra_args);
        debug!(binary = %self.binary, ?args, "running rclone copy");

        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            error!(code = ?output.status.code(), "rclone copy failed");
            return Err(CopyError::Failed {
                exit_code: output.status.code(),
                diagnostic,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builds the full `rclone copy` argument list.
fn build_copy_args(
    local_path: &Path,
    remote_path: &str,
    conf_path: &Path,
    extra_args: &[String],
) -> Vec<String> {
    let mut args = vec![
        "copy".to_string(),
        "--progress".to_string(),
        local_path.display().to_string(),
        remote_path.to_string(),
        "--config".to_string(),
        conf_path.display().to_string(),
        "--transfers".to_string(),
        TRANSFERS.to_string(),
        "--checkers".to_string(),
        CHECKERS.to_string(),
        "--drive-chunk-size".to_string(),
        DRIVE_CHUNK_SIZE.to_string(),
    ];
    args.extend(extra_args.iter().cloned());
    args
}
