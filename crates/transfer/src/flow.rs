//! Selection state machine: link → formats → destination.
//!
//! Each handler validates the job's current state through the registry
//! guards before acting, so an out-of-order or duplicate user choice is
//! a reported no-op rather than undefined behavior.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arcferry_archive::ArchiveFile;
use tracing::{debug, info};

use crate::error::FlowError;
use crate::registry::{Destination, Job, JobId, JobRegistry};

/// Metadata collaborator: lists an archive's files.
///
/// The bot app implements this over the archive client; tests use canned
/// listings. A trait keeps the flow decoupled from HTTP.
pub trait MetadataProvider: Send + Sync {
    fn list_files(
        &self,
        archive_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ArchiveFile>, FlowError>> + Send + '_>>;
}

/// Credential-store collaborator: names the configured remotes.
pub trait RemoteLister: Send + Sync {
    fn list_remotes(&self) -> Result<Vec<String>, FlowError>;
}

/// Formats offered once an archive's files are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOffer {
    pub job_id: JobId,
    pub archive_id: String,
    pub file_count: usize,
    /// Sorted distinct format values across the candidate files.
    pub formats: Vec<String>,
}

/// Destinations offered once a format is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationOffer {
    pub job_id: JobId,
    pub format: String,
    pub selected_count: usize,
    pub remotes: Vec<String>,
}

/// Drives a job through the selection states with guarded transitions.
pub struct SelectionFlow {
    registry: Arc<JobRegistry>,
    metadata: Arc<dyn MetadataProvider>,
    remotes: Arc<dyn RemoteLister>,
}

impl SelectionFlow {
    pub fn new(
        registry: Arc<JobRegistry>,
        metadata: Arc<dyn MetadataProvider>,
        remotes: Arc<dyn RemoteLister>,
    ) -> Self {
        Self {
            registry,
            metadata,
            remotes,
        }
    }

    /// Handles a submitted link: parses the identifier, fetches the file
    /// listing and stores the job in `MetadataReady`.
    ///
    /// An empty listing discards the job before it is ever stored.
    pub async fn submit_link(&self, job_id: JobId, url: &str) -> Result<FormatOffer, FlowError> {
        let archive_id = arcferry_archive::parse_archive_url(url)
            .ok_or_else(|| FlowError::BadLink(url.to_string()))?;

        let files = self.metadata.list_files(&archive_id).await?;
        if files.is_empty() {
            return Err(FlowError::MetadataUnavailable(archive_id));
        }

        let mut formats: Vec<String> = files.iter().map(|f| f.format.clone()).collect();
        formats.sort();
        formats.dedup();

        let job = self.registry.create(job_id, archive_id, files)?;
        info!(
            job = %job.job_id,
            archive = %job.archive_id,
            files = job.candidate_files.len(),
            "job created"
        );

        Ok(FormatOffer {
            job_id: job.job_id,
            archive_id: job.archive_id,
            file_count: job.candidate_files.len(),
            formats,
        })
    }

    /// Handles a format choice and offers destinations.
    ///
    /// With no remotes configured the job stays halted in `FormatChosen`;
    /// registering a remote is an out-of-band step.
    pub fn choose_format(
        &self,
        job_id: &JobId,
        format: &str,
    ) -> Result<DestinationOffer, FlowError> {
        let job = self.registry.choose_format(job_id, format)?;
        debug!(job = %job.job_id, format, selected = job.selected_files.len(), "format chosen");

        let remotes = self.remotes.list_remotes()?;
        if remotes.is_empty() {
            return Err(FlowError::NoDestinationsConfigured);
        }

        Ok(DestinationOffer {
            job_id: job.job_id,
            format: format.to_string(),
            selected_count: job.selected_files.len(),
            remotes,
        })
    }

    /// Handles a destination choice; returns the job ready for its
    /// transfer pass.
    pub fn choose_destination(&self, job_id: &JobId, remote: &str) -> Result<Job, FlowError> {
        let job = self
            .registry
            .choose_destination(job_id, Destination::new(remote))?;
        debug!(job = %job.job_id, remote, "destination chosen");
        Ok(job)
    }
}
