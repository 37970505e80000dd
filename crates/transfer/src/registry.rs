//! Keyed store of in-flight jobs.
//!
//! The registry is shared across all concurrently handled conversations
//! and injected wherever it is needed; it is never ambient global state.
//! Every operation holds the map lock for its whole read-modify-write,
//! so transitions on a single job appear atomic to racing callbacks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use arcferry_archive::ArchiveFile;
use tracing::debug;

use crate::error::FlowError;

/// Jobs untouched for this long are swept on the next `create`.
///
/// The map lives for the process lifetime; without the sweep, completed
/// and abandoned entries would accumulate forever.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Identifies one job: unique per (conversation, originating command).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Builds an id from the conversation and the triggering message.
    pub fn from_parts(conversation: i64, message: i64) -> Self {
        Self(format!("{conversation}:{message}"))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a job sits in the selection flow.
///
/// Transitions run strictly forward; a violated guard reports
/// [`FlowError::JobNotFound`] and changes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Files listed; waiting on a format choice.
    MetadataReady,
    /// Format picked and files selected; waiting on a destination choice.
    FormatChosen,
    /// Destination picked; the transfer pass starts next.
    DestinationChosen,
    /// The pipeline is running the single transfer pass.
    Processing,
    /// Every selected file was processed.
    Completed,
    /// A hard stop ended the transfer pass early.
    Aborted,
}

/// A named remote plus the fixed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub remote: String,
}

impl Destination {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    /// Full copy-tool destination for an archive:
    /// `<remote>:Archive/<archive_id>`.
    pub fn remote_path(&self, archive_id: &str) -> String {
        format!("{}:Archive/{archive_id}", self.remote)
    }
}

/// One in-flight user request.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: JobId,
    pub archive_id: String,
    /// Files available for the archive; immutable once fetched.
    pub candidate_files: Vec<ArchiveFile>,
    /// Set once by the format choice; never re-selected.
    pub chosen_format: Option<String>,
    /// Subset of `candidate_files` matching `chosen_format`, in listed order.
    pub selected_files: Vec<ArchiveFile>,
    pub destination: Option<Destination>,
    pub state: JobState,
    created_at: Instant,
}

/// Shared, injected store of jobs keyed by [`JobId`].
pub struct JobRegistry {
    inner: Mutex<HashMap<JobId, Job>>,
    ttl: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_JOB_TTL)
    }

    /// Creates a registry with a custom eviction TTL (tests).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates a job in `MetadataReady`. Rejects duplicate ids and leaves
    /// the existing entry untouched. Expired entries are swept here.
    pub fn create(
        &self,
        job_id: JobId,
        archive_id: String,
        candidate_files: Vec<ArchiveFile>,
    ) -> Result<Job, FlowError> {
        let mut jobs = self.inner.lock().unwrap();

        let now = Instant::now();
        let before = jobs.len();
        jobs.retain(|_, j| now.duration_since(j.created_at) < self.ttl);
        if jobs.len() < before {
            debug!(evicted = before - jobs.len(), "swept expired jobs");
        }

        if jobs.contains_key(&job_id) {
            return Err(FlowError::DuplicateJob(job_id));
        }

        let job = Job {
            job_id: job_id.clone(),
            archive_id,
            candidate_files,
            chosen_format: None,
            selected_files: Vec::new(),
            destination: None,
            state: JobState::MetadataReady,
            created_at: now,
        };
        jobs.insert(job_id, job.clone());
        Ok(job)
    }

    /// Returns a snapshot of a job, if present.
    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        self.inner.lock().unwrap().get(job_id).cloned()
    }

    /// Records the format choice and the matching file subset.
    ///
    /// Only valid from `MetadataReady`; anything else (missing job,
    /// already past this stage) reports not-found so a replayed or stale
    /// button press is a no-op.
    pub fn choose_format(&self, job_id: &JobId, format: &str) -> Result<Job, FlowError> {
        let mut jobs = self.inner.lock().unwrap();
        let Some(job) = jobs.get_mut(job_id) else {
            return Err(FlowError::JobNotFound(job_id.clone()));
        };
        if job.state != JobState::MetadataReady {
            return Err(FlowError::JobNotFound(job_id.clone()));
        }

        let selected: Vec<ArchiveFile> = job
            .candidate_files
            .iter()
            .filter(|f| f.format == format)
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(FlowError::NoFilesForFormat(format.to_string()));
        }

        job.chosen_format = Some(format.to_string());
        job.selected_files = selected;
        job.state = JobState::FormatChosen;
        Ok(job.clone())
    }

    /// Records the destination choice. Only valid from `FormatChosen`.
    pub fn choose_destination(
        &self,
        job_id: &JobId,
        destination: Destination,
    ) -> Result<Job, FlowError> {
        let mut jobs = self.inner.lock().unwrap();
        let Some(job) = jobs.get_mut(job_id) else {
            return Err(FlowError::JobNotFound(job_id.clone()));
        };
        if job.state != JobState::FormatChosen {
            return Err(FlowError::JobNotFound(job_id.clone()));
        }

        job.destination = Some(destination);
        job.state = JobState::DestinationChosen;
        Ok(job.clone())
    }

    /// Marks the job as running its transfer pass.
    pub fn mark_processing(&self, job_id: &JobId) -> Result<Job, FlowError> {
        let mut jobs = self.inner.lock().unwrap();
        let Some(job) = jobs.get_mut(job_id) else {
            return Err(FlowError::JobNotFound(job_id.clone()));
        };
        if job.state != JobState::DestinationChosen {
            return Err(FlowError::JobNotFound(job_id.clone()));
        }

        job.state = JobState::Processing;
        Ok(job.clone())
    }

    /// Records the terminal state after the transfer pass.
    pub fn finish(&self, job_id: &JobId, aborted: bool) -> Result<Job, FlowError> {
        let mut jobs = self.inner.lock().unwrap();
        let Some(job) = jobs.get_mut(job_id) else {
            return Err(FlowError::JobNotFound(job_id.clone()));
        };
        if job.state != JobState::Processing {
            return Err(FlowError::JobNotFound(job_id.clone()));
        }

        job.state = if aborted {
            JobState::Aborted
        } else {
            JobState::Completed
        };
        Ok(job.clone())
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
