//! Interactive console loop.
//!
//! Stands in for the chat transport: `/download <link>` starts a job,
//! numbered replies pick the format and destination, and the transfer
//! pass reports on a status line per job.

use std::sync::Arc;

use arcferry_transfer::{
    DestinationOffer, FlowError, FormatOffer, JobId, JobRegistry, SelectionFlow, StatusSink,
    TransferPipeline,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

/// Everything the loop needs, wired up in `main`.
pub struct Bot {
    pub registry: Arc<JobRegistry>,
    pub flow: SelectionFlow,
    pub pipeline: Arc<TransferPipeline>,
    pub sink: Arc<dyn StatusSink>,
}

/// The console waits on at most one pending choice at a time.
enum Pending {
    None,
    Format(FormatOffer),
    Destination(DestinationOffer),
}

impl Bot {
    /// Reads commands from stdin until EOF or `/quit`.
    pub async fn run(&self) -> anyhow::Result<()> {
        println!("arcferry: send `/download <archive.org link>` to begin, `/quit` to exit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending = Pending::None;
        let mut next_message_id: i64 = 0;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" {
                break;
            }

            if let Some(url) = download_url(line) {
                if url.is_empty() {
                    println!("Usage: /download https://archive.org/details/<identifier>");
                    continue;
                }

                next_message_id += 1;
                let job_id = JobId::from_parts(0, next_message_id);
                match self.flow.submit_link(job_id, url).await {
                    Ok(offer) => {
                        println!(
                            "Found {} files in archive `{}`. Choose a format:",
                            offer.file_count, offer.archive_id
                        );
                        print_choices(&offer.formats);
                        pending = Pending::Format(offer);
                    }
                    Err(e) => report(&e),
                }
                continue;
            }

            match std::mem::replace(&mut pending, Pending::None) {
                Pending::None => {
                    println!("No choice pending. Send `/download <link>` to begin.");
                }
                Pending::Format(offer) => match pick(&offer.formats, line) {
                    None => {
                        println!("Pick a number between 1 and {}.", offer.formats.len());
                        pending = Pending::Format(offer);
                    }
                    Some(format) => match self.flow.choose_format(&offer.job_id, format) {
                        Ok(dest_offer) => {
                            println!(
                                "Selected format `{}` ({} files). Choose a destination:",
                                dest_offer.format, dest_offer.selected_count
                            );
                            print_choices(&dest_offer.remotes);
                            pending = Pending::Destination(dest_offer);
                        }
                        Err(e) => report(&e),
                    },
                },
                Pending::Destination(offer) => match pick(&offer.remotes, line) {
                    None => {
                        println!("Pick a number between 1 and {}.", offer.remotes.len());
                        pending = Pending::Destination(offer);
                    }
                    Some(remote) => {
                        if let Err(e) = self.start_transfer(&offer, remote).await {
                            report(&e);
                        }
                    }
                },
            }
        }

        Ok(())
    }

    /// Runs the transfer pass for a job whose destination was just chosen.
    async fn start_transfer(
        &self,
        offer: &DestinationOffer,
        remote: &str,
    ) -> Result<(), FlowError> {
        let job = self.flow.choose_destination(&offer.job_id, remote)?;
        let destination = job
            .destination
            .clone()
            .ok_or_else(|| FlowError::JobNotFound(job.job_id.clone()))?;

        println!(
            "Process started: archive `{}`, format `{}`, destination `{}`, {} files.",
            job.archive_id,
            offer.format,
            destination.remote_path(&job.archive_id),
            job.selected_files.len()
        );

        let job = self.registry.mark_processing(&job.job_id)?;
        let status = match self.sink.send("Starting file processing...").await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "could not open the status message");
                self.registry.finish(&job.job_id, true)?;
                return Ok(());
            }
        };

        let outcome = self.pipeline.run(&job, &destination, &status).await;
        self.registry.finish(&job.job_id, outcome.hard_stopped)?;
        Ok(())
    }
}

fn print_choices(choices: &[String]) {
    for (i, choice) in choices.iter().enumerate() {
        println!("  {}. {choice}", i + 1);
    }
}

/// Extracts the URL argument from a `/download` command line.
///
/// The command token must match exactly; `/downloadable ...` is not a
/// command. Returns an empty string when the argument is missing.
fn download_url(line: &str) -> Option<&str> {
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    (command == "/download").then(|| rest.trim())
}

/// Resolves a 1-based numeric reply against the offered choices.
fn pick<'a>(choices: &'a [String], input: &str) -> Option<&'a str> {
    let n: usize = input.parse().ok()?;
    choices.get(n.checked_sub(1)?).map(String::as_str)
}

fn report(err: &FlowError) {
    println!("Error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_command_requires_an_exact_token() {
        assert_eq!(
            download_url("/download https://archive.org/details/x"),
            Some("https://archive.org/details/x")
        );
        assert_eq!(download_url("/download   spaced  "), Some("spaced"));
        assert_eq!(download_url("/download"), Some(""));
        assert_eq!(download_url("/downloadable stuff"), None);
        assert_eq!(download_url("download x"), None);
    }

    #[test]
    fn pick_resolves_one_based_indices() {
        let choices = vec!["ZIP".to_string(), "Text".to_string()];
        assert_eq!(pick(&choices, "1"), Some("ZIP"));
        assert_eq!(pick(&choices, "2"), Some("Text"));
        assert_eq!(pick(&choices, "0"), None);
        assert_eq!(pick(&choices, "3"), None);
        assert_eq!(pick(&choices, "zip"), None);
    }
}
