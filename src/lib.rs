//! # asset-dl
//!
//! Batched bulk downloader for fixed, densely indexed collections: N JSON
//! metadata documents plus N image assets pulled from a remote object store,
//! each written to disk as it arrives, followed by a lossy compression pass
//! over the downloaded images.
//!
//! ## Design Philosophy
//!
//! asset-dl is designed to be:
//! - **Bounded** - peak concurrency and peak in-memory data are capped by
//!   the batch size, never by the collection size
//! - **Resilient** - per-item results with bounded retry; one failing item
//!   never discards its siblings' finished work
//! - **Library-first** - the pipeline is a plain Rust type; the bundled
//!   binary is a thin one-shot wrapper
//! - **Event-driven** - consumers subscribe to progress events, no polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use asset_dl::{CollectionDownloader, Config, FetchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         fetch: FetchConfig {
//!             metadata_base_url: "https://bucket.example.com/json".to_string(),
//!             image_base_url: "https://bucket.example.com/images".to_string(),
//!             total_count: 1000,
//!             batch_size: 100,
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let summary = CollectionDownloader::new(config)?.run().await?;
//!     println!(
//!         "saved {} metadata files, {} assets, {} compressed copies",
//!         summary.metadata_files, summary.asset_files, summary.compressed_files
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Lossy image compression pass
pub mod compress;
/// Configuration types
pub mod config;
/// Batched fetch engine
pub mod downloader;
/// Error types
pub mod error;
/// Single-item HTTP retrieval
pub mod fetch;
/// Pipeline orchestration
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Directory preparation and durable writes
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{CompressionConfig, Config, FetchConfig, RetryConfig, StorageConfig};
pub use error::{CompressionError, Error, Result};
pub use pipeline::CollectionDownloader;
pub use types::{Event, ItemKind, RunSummary};
