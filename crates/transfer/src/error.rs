//! Selection-flow error taxonomy.
//!
//! Everything here is surfaced to the user as-is; per-file transfer
//! failures are a separate concern handled by the pipeline's
//! [`FileOutcome`](crate::pipeline::FileOutcome).

use crate::registry::JobId;

/// Errors produced during link, format and destination selection.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The submitted link is not an archive item URL.
    #[error("could not parse an archive identifier from `{0}`")]
    BadLink(String),

    /// Metadata lookup failed.
    #[error("metadata lookup failed: {0}")]
    Metadata(String),

    /// The archive listed no downloadable files; the job is never stored.
    #[error("no downloadable files found for `{0}`")]
    MetadataUnavailable(String),

    /// Stale, missing, or out-of-order job event. Mutates nothing.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// A job with this id already exists.
    #[error("job already exists: {0}")]
    DuplicateJob(JobId),

    /// No files in the job match the chosen format.
    #[error("no files match format `{0}`")]
    NoFilesForFormat(String),

    /// The credential store lists no remotes; the job stays in
    /// `FormatChosen` until one is registered out-of-band.
    #[error("no remotes configured; add one to the rclone config, then submit the link again")]
    NoDestinationsConfigured,
}
