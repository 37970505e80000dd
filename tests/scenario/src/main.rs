fn main() {
    println!("Run `cargo test -p scenario` to execute the end-to-end job scenarios.");
}

/// End-to-end scenarios: selection flow wired to the transfer pipeline
/// with scripted collaborators, exercising whole jobs the way the bot
/// front end drives them.
#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::path::Path;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    use arcferry_archive::{ArchiveFile, Download, FetchError};
    use arcferry_transfer::{
        CopyFailure, Destination, FileCopier, FileFetcher, FileOutcome, FlowError, JobId,
        JobOutcome, JobRegistry, JobState, MessageHandle, MetadataProvider, RemoteLister,
        SelectionFlow, SinkError, StatusSink, TransferPipeline,
    };
    use bytes::Bytes;

    const MIB: u64 = 1024 * 1024;

    // ------------------------------------------------------------------
    // Scripted collaborators
    // ------------------------------------------------------------------

    struct CannedMetadata {
        files: Vec<ArchiveFile>,
    }

    impl MetadataProvider for CannedMetadata {
        fn list_files(
            &self,
            _archive_id: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ArchiveFile>, FlowError>> + Send + '_>>
        {
            let files = self.files.clone();
            Box::pin(async move { Ok(files) })
        }
    }

    struct CannedRemotes {
        remotes: Vec<String>,
    }

    impl RemoteLister for CannedRemotes {
        fn list_remotes(&self) -> Result<Vec<String>, FlowError> {
            Ok(self.remotes.clone())
        }
    }

    /// Serves per-file content once; unknown files report not-found.
    struct ScriptedFetcher {
        contents: Mutex<HashMap<String, Bytes>>,
        opened: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(contents: &[(&str, Bytes)]) -> Self {
            Self {
                contents: Mutex::new(
                    contents
                        .iter()
                        .map(|(n, b)| (n.to_string(), b.clone()))
                        .collect(),
                ),
                opened: Mutex::new(Vec::new()),
            }
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl FileFetcher for ScriptedFetcher {
        fn open(
            &self,
            _archive_id: &str,
            filename: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Download, FetchError>> + Send + '_>> {
            self.opened.lock().unwrap().push(filename.to_string());
            let content = self.contents.lock().unwrap().remove(filename);
            let filename = filename.to_string();
            Box::pin(async move {
                let Some(content) = content else {
                    return Err(FetchError::NotFound(filename));
                };
                Ok(Download {
                    declared_len: Some(content.len() as u64),
                    bytes: Box::pin(futures_util::stream::iter([Ok::<Bytes, FetchError>(
                        content,
                    )])),
                })
            })
        }
    }

    /// Pops one scripted result per copy call.
    struct ScriptedCopier {
        script: Mutex<Vec<Result<(), CopyFailure>>>,
    }

    impl ScriptedCopier {
        fn new(script: Vec<Result<(), CopyFailure>>) -> Self {
            Self {
                script: Mutex::new(script),
            }
        }
    }

    impl FileCopier for ScriptedCopier {
        fn copy(
            &self,
            _local_path: &Path,
            _remote_path: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), CopyFailure>> + Send + '_>> {
            let result = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() { Ok(()) } else { script.remove(0) }
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn all(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }

        fn last(&self) -> String {
            self.texts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl StatusSink for RecordingSink {
        fn send(
            &self,
            text: &str,
        ) -> Pin<Box<dyn Future<Output = Result<MessageHandle, SinkError>> + Send + '_>>
        {
            self.texts.lock().unwrap().push(text.to_string());
            Box::pin(async { Ok(MessageHandle(1)) })
        }

        fn edit(
            &self,
            _handle: &MessageHandle,
            text: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
            self.texts.lock().unwrap().push(text.to_string());
            Box::pin(async { Ok(()) })
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn file(name: &str, size: u64, format: &str) -> ArchiveFile {
        ArchiveFile {
            name: name.into(),
            size,
            format: format.into(),
        }
    }

    /// Archive X: two ZIP files (10 and 20 MiB) and one TXT file.
    fn archive_x() -> Vec<ArchiveFile> {
        vec![
            file("disc1.zip", 10 * MIB, "ZIP"),
            file("notes.txt", 4096, "TXT"),
            file("disc2.zip", 20 * MIB, "ZIP"),
        ]
    }

    struct Harness {
        registry: Arc<JobRegistry>,
        flow: SelectionFlow,
        fetcher: Arc<ScriptedFetcher>,
        sink: Arc<RecordingSink>,
        pipeline: TransferPipeline,
        _dir: tempfile::TempDir,
    }

    fn harness(
        files: Vec<ArchiveFile>,
        remotes: Vec<String>,
        contents: &[(&str, Bytes)],
        copier: ScriptedCopier,
    ) -> Harness {
        let registry = Arc::new(JobRegistry::new());
        let flow = SelectionFlow::new(
            Arc::clone(&registry),
            Arc::new(CannedMetadata { files }),
            Arc::new(CannedRemotes { remotes }),
        );
        let fetcher = Arc::new(ScriptedFetcher::new(contents));
        let sink = Arc::new(RecordingSink::default());
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TransferPipeline::new(
            Arc::clone(&fetcher) as Arc<dyn FileFetcher>,
            Arc::new(copier),
            Arc::clone(&sink) as Arc<dyn StatusSink>,
            dir.path(),
        );

        Harness {
            registry,
            flow,
            fetcher,
            sink,
            pipeline,
            _dir: dir,
        }
    }

    /// Drives a job through the whole flow and one transfer pass.
    async fn run_job(h: &Harness, format: &str, remote: &str) -> JobOutcome {
        let job_id = JobId::from_parts(7, 1);
        h.flow
            .submit_link(job_id.clone(), "https://archive.org/details/x")
            .await
            .unwrap();
        h.flow.choose_format(&job_id, format).unwrap();
        h.flow.choose_destination(&job_id, remote).unwrap();

        let job = h.registry.mark_processing(&job_id).unwrap();
        let destination = job.destination.clone().unwrap();
        let status = h.sink.send("Starting file processing...").await.unwrap();

        let outcome = h.pipeline.run(&job, &destination, &status).await;
        h.registry.finish(&job_id, outcome.hard_stopped).unwrap();
        outcome
    }

    // ------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn zip_selection_uploads_both_files() {
        let h = harness(
            archive_x(),
            vec!["gdrive".into()],
            &[
                ("disc1.zip", Bytes::from(vec![1u8; 512])),
                ("disc2.zip", Bytes::from(vec![2u8; 1024])),
            ],
            ScriptedCopier::new(vec![Ok(()), Ok(())]),
        );

        let outcome = run_job(&h, "ZIP", "gdrive").await;

        assert_eq!(outcome.completed, 2);
        assert!(!outcome.hard_stopped);
        // Only the ZIP subset is fetched, in listed order.
        assert_eq!(h.fetcher.opened(), ["disc1.zip", "disc2.zip"]);
        assert!(
            h.sink.last().contains("2 files uploaded"),
            "got: {}",
            h.sink.last()
        );
        assert_eq!(
            h.registry.get(&JobId::from_parts(7, 1)).unwrap().state,
            JobState::Completed
        );
    }

    #[tokio::test]
    async fn expired_token_on_second_file_stops_the_job() {
        let h = harness(
            archive_x(),
            vec!["gdrive".into()],
            &[
                ("disc1.zip", Bytes::from(vec![1u8; 512])),
                ("disc2.zip", Bytes::from(vec![2u8; 1024])),
            ],
            ScriptedCopier::new(vec![
                Ok(()),
                Err(CopyFailure {
                    exit_code: Some(1),
                    diagnostic: "2026/08/27 ERROR: drive: maybe token expired".into(),
                }),
            ]),
        );

        let outcome = run_job(&h, "ZIP", "gdrive").await;

        assert!(outcome.hard_stopped);
        assert_eq!(outcome.completed, 1);
        assert_eq!(
            outcome.outcomes[1],
            FileOutcome::FailedAuth {
                remote: "gdrive".into()
            }
        );
        // Hard stop: nothing after disc2.zip was attempted.
        assert_eq!(h.fetcher.opened(), ["disc1.zip", "disc2.zip"]);
        let last = h.sink.last();
        assert!(last.contains("gdrive"), "got: {last}");
        assert!(last.contains("rclone config reconnect gdrive:"), "got: {last}");
        assert!(!h.sink.all().iter().any(|t| t.contains("Finished")));
        assert_eq!(
            h.registry.get(&JobId::from_parts(7, 1)).unwrap().state,
            JobState::Aborted
        );
    }

    #[tokio::test]
    async fn no_remotes_halts_before_any_transfer() {
        let h = harness(archive_x(), vec![], &[], ScriptedCopier::new(vec![]));

        let job_id = JobId::from_parts(7, 1);
        h.flow
            .submit_link(job_id.clone(), "https://archive.org/details/x")
            .await
            .unwrap();
        let err = h.flow.choose_format(&job_id, "ZIP").unwrap_err();

        assert!(matches!(err, FlowError::NoDestinationsConfigured));
        assert_eq!(
            h.registry.get(&job_id).unwrap().state,
            JobState::FormatChosen
        );
        assert!(h.fetcher.opened().is_empty());
    }

    #[tokio::test]
    async fn vanished_file_is_reported_and_skipped() {
        // disc1.zip is listed in the metadata but gone from the source.
        let h = harness(
            archive_x(),
            vec!["gdrive".into()],
            &[("disc2.zip", Bytes::from(vec![2u8; 1024]))],
            ScriptedCopier::new(vec![Ok(())]),
        );

        let outcome = run_job(&h, "ZIP", "gdrive").await;

        assert_eq!(outcome.outcomes[0], FileOutcome::SkippedNotFound);
        assert_eq!(outcome.outcomes[1], FileOutcome::Completed);
        assert!(!outcome.hard_stopped);
        assert!(
            h.sink
                .all()
                .iter()
                .any(|t| t.contains("File not found at the source: disc1.zip"))
        );
    }

    #[tokio::test]
    async fn destination_path_follows_the_template() {
        let dest = Destination::new("s3-backup");
        assert_eq!(dest.remote_path("x"), "s3-backup:Archive/x");
    }
}
