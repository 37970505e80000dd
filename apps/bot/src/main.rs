//! arcferry entry point.

mod adapters;
mod config;
mod console;

use std::sync::Arc;

use arcferry_archive::ArchiveClient;
use arcferry_rclone::RcloneCopier;
use arcferry_transfer::{JobRegistry, SelectionFlow, StatusSink, TransferPipeline};
use tracing_subscriber::EnvFilter;

use crate::adapters::{ArchiveFetcher, ArchiveMetadata, ConsoleSink, RcloneCopy, RcloneRemotes};
use crate::config::BotConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting arcferry");

    let config = match BotConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            BotConfig::default()
        }
    };
    tracing::info!(
        download_dir = %config.download_dir.display(),
        rclone_conf = %config.rclone_conf.display(),
        "configuration loaded"
    );

    std::fs::create_dir_all(&config.download_dir)?;

    let client = Arc::new(
        ArchiveClient::new()?.with_base_url(config.archive_base_url.clone()),
    );
    let registry = Arc::new(JobRegistry::new());
    let sink: Arc<dyn StatusSink> = Arc::new(ConsoleSink::default());

    let flow = SelectionFlow::new(
        Arc::clone(&registry),
        Arc::new(ArchiveMetadata::new(Arc::clone(&client))),
        Arc::new(RcloneRemotes::new(config.rclone_conf.clone())),
    );
    let pipeline = Arc::new(TransferPipeline::new(
        Arc::new(ArchiveFetcher::new(client)),
        Arc::new(RcloneCopy::new(RcloneCopier::new(config.rclone_conf))),
        Arc::clone(&sink),
        config.download_dir,
    ));

    let bot = console::Bot {
        registry,
        flow,
        pipeline,
        sink,
    };
    bot.run().await
}
