//! One-shot CLI wrapper around the asset-dl pipeline.
//!
//! Exit status: 0 on full success, 1 on any failure in directory
//! preparation, either fetch stage, or compression.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use asset_dl::{CollectionDownloader, Config, RunSummary};

/// Download a fixed collection of JSON metadata and image assets, then
/// compress the images.
#[derive(Debug, Parser)]
#[command(name = "asset-dl", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL for metadata documents (`<n>.json` is appended)
    #[arg(long, value_name = "URL", required_unless_present = "config")]
    metadata_base_url: Option<String>,

    /// Base URL for image assets (`<n>.<ext>` is appended)
    #[arg(long, value_name = "URL", required_unless_present = "config")]
    image_base_url: Option<String>,

    /// Number of items in the collection
    #[arg(long, value_name = "N")]
    total_count: Option<u32>,

    /// Concurrent requests per batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,
}

impl Cli {
    /// Build the pipeline configuration: config file first, flags override.
    fn into_config(self) -> asset_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_path(path)?,
            None => Config::default(),
        };
        if let Some(url) = self.metadata_base_url {
            config.fetch.metadata_base_url = url;
        }
        if let Some(url) = self.image_base_url {
            config.fetch.image_base_url = url;
        }
        if let Some(count) = self.total_count {
            config.fetch.total_count = count;
        }
        if let Some(size) = self.batch_size {
            config.fetch.batch_size = size;
        }
        Ok(config)
    }
}

async fn run(cli: Cli) -> asset_dl::Result<RunSummary> {
    let downloader = CollectionDownloader::new(cli.into_config()?)?;
    downloader.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) => {
            tracing::info!(
                metadata_files = summary.metadata_files,
                asset_files = summary.asset_files,
                compressed_files = summary.compressed_files,
                "all stages finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("asset-dl error: {err}");
            ExitCode::FAILURE
        }
    }
}
