//! Job orchestration and transfer pipeline.
//!
//! Drives a chat-initiated job from link submission through format and
//! destination selection, then streams each selected file from the
//! archive to local disk, hands it to the copy tool, and deletes the
//! local copy, reporting progress on a single evolving status message.
//!
//! This crate holds the logic only. Collaborators (metadata lookup,
//! the copy tool, the chat transport) enter through traits
//! ([`MetadataProvider`], [`RemoteLister`], [`FileFetcher`],
//! [`FileCopier`], [`StatusSink`]) implemented by the app, so everything
//! here is testable with mocks.

pub mod classify;
pub mod error;
pub mod flow;
pub mod pipeline;
pub mod progress;
pub mod registry;

pub use classify::{TransferClass, classify_copy_failure, classify_fetch_failure};
pub use error::FlowError;
pub use flow::{DestinationOffer, FormatOffer, MetadataProvider, RemoteLister, SelectionFlow};
pub use pipeline::{
    CopyFailure, FileCopier, FileFetcher, FileOutcome, JobOutcome, MessageHandle, SinkError,
    StatusSink, TransferPipeline,
};
pub use progress::{DEFAULT_EDIT_INTERVAL, UpdateThrottle, format_progress};
pub use registry::{Destination, Job, JobId, JobRegistry, JobState};
