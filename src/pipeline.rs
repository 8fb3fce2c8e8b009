//! Pipeline orchestration
//!
//! Wires the stages together: prepare storage, run the metadata and asset
//! fetch stages concurrently, then compress — compression never starts
//! before both fetch stages have fully succeeded.

use tokio::sync::broadcast;

use crate::compress;
use crate::config::Config;
use crate::downloader::run_fetch_stage;
use crate::error::{Error, Result};
use crate::fetch;
use crate::storage;
use crate::types::{Event, ItemKind, RunSummary, StageReport};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One-shot downloader for a fixed, densely indexed collection
///
/// Fetches `total_count` metadata documents and image assets in bounded
/// batches, then writes a lossily compressed copy of every asset.
///
/// # Example
///
/// ```no_run
/// use asset_dl::{CollectionDownloader, Config, FetchConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config {
///         fetch: FetchConfig {
///             metadata_base_url: "https://bucket.example.com/json".to_string(),
///             image_base_url: "https://bucket.example.com/images".to_string(),
///             ..Default::default()
///         },
///         ..Default::default()
///     };
///
///     let downloader = CollectionDownloader::new(config)?;
///
///     // Subscribe to progress events
///     let mut events = downloader.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     let summary = downloader.run().await?;
///     println!("compressed {} assets", summary.compressed_files);
///     Ok(())
/// }
/// ```
pub struct CollectionDownloader {
    config: Config,
    client: reqwest::Client,
    event_tx: broadcast::Sender<Event>,
}

impl CollectionDownloader {
    /// Create a downloader from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = fetch::build_client(&config.fetch)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            client,
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Subscribers that fall behind the channel capacity miss older events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Run the whole pipeline once
    ///
    /// Steps, in order: prepare the output directories; fetch metadata and
    /// assets concurrently (each internally batched); compress every asset.
    /// The first failing stage is returned as the error; per-item failures
    /// inside a stage surface as one aggregate [`Error::StageFailed`]. Files
    /// written before a failure stay on disk.
    pub async fn run(&self) -> Result<RunSummary> {
        storage::prepare_directories(&self.config.storage)?;
        self.event_tx
            .send(Event::RunStarted {
                total_count: self.config.fetch.total_count,
            })
            .ok();

        // Disjoint directories and index spaces, so the two stages share
        // nothing but the HTTP client.
        let (metadata_report, asset_report) =
            tokio::join!(self.fetch_metadata(), self.download_assets());

        let metadata_files = check_stage(ItemKind::Metadata, metadata_report)?;
        let asset_files = check_stage(ItemKind::Asset, asset_report)?;

        let compressed_files = compress::compress_directory(
            &self.config.storage,
            &self.config.compression,
            &self.config.fetch.image_extension,
            &self.event_tx,
        )
        .await?;

        let summary = RunSummary {
            metadata_files,
            asset_files,
            compressed_files,
        };
        tracing::info!(
            metadata_files,
            asset_files,
            compressed_files,
            "run completed"
        );
        self.event_tx.send(Event::RunCompleted { summary }).ok();
        Ok(summary)
    }

    /// Fetch all metadata documents in batches
    ///
    /// Uses the same batching discipline as the asset stage, with
    /// incremental per-item writes.
    async fn fetch_metadata(&self) -> StageReport {
        let fetch_cfg = &self.config.fetch;
        let storage_cfg = &self.config.storage;
        run_fetch_stage(
            &self.client,
            &self.config.retry,
            ItemKind::Metadata,
            fetch_cfg.total_count,
            fetch_cfg.batch_size,
            |index| fetch::item_url(&fetch_cfg.metadata_base_url, &format!("{index}.json")),
            |index| storage_cfg.metadata_path(index),
            &self.event_tx,
        )
        .await
    }

    /// Download all image assets in batches
    async fn download_assets(&self) -> StageReport {
        let fetch_cfg = &self.config.fetch;
        let storage_cfg = &self.config.storage;
        let extension = fetch_cfg.image_extension.as_str();
        run_fetch_stage(
            &self.client,
            &self.config.retry,
            ItemKind::Asset,
            fetch_cfg.total_count,
            fetch_cfg.batch_size,
            |index| {
                fetch::item_url(&fetch_cfg.image_base_url, &format!("{index}.{extension}"))
            },
            |index| storage_cfg.asset_path(index, extension),
            &self.event_tx,
        )
        .await
    }
}

/// Convert a stage report into a result, folding failures into one error
fn check_stage(kind: ItemKind, report: StageReport) -> Result<usize> {
    if let Some(first) = report.failures.first() {
        return Err(Error::StageFailed {
            kind,
            failed: report.failures.len(),
            total: report.total(),
            first_index: first.index,
            first_error: first.error.clone(),
        });
    }
    Ok(report.succeeded)
}
