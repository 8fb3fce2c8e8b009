//! Core types and events

use serde::{Deserialize, Serialize};

/// Which of the two fetch stages an item belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// JSON metadata document (`<n>.json`)
    Metadata,
    /// Binary image asset (`<n>.<ext>`)
    Asset,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Metadata => write!(f, "metadata"),
            ItemKind::Asset => write!(f, "asset"),
        }
    }
}

/// Events emitted by the pipeline
///
/// Consumers subscribe via [`crate::CollectionDownloader::subscribe`]; slow
/// subscribers may miss events (broadcast semantics), so events carry state,
/// not deltas that must not be lost.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pipeline started; directories are prepared
    RunStarted {
        /// Number of items per fetch stage
        total_count: u32,
    },

    /// One item was fetched and durably written
    FileSaved {
        /// Which stage the item belongs to
        kind: ItemKind,
        /// Item index (1-based)
        index: u32,
        /// Size of the written file in bytes
        bytes: u64,
    },

    /// One item failed after exhausting its retry budget
    ItemFailed {
        /// Which stage the item belongs to
        kind: ItemKind,
        /// Item index (1-based)
        index: u32,
        /// Error message for the failure
        error: String,
    },

    /// A batch fully resolved (success or failure); the next batch may start
    BatchCompleted {
        /// Which stage the batch belongs to
        kind: ItemKind,
        /// Batch number (1-based)
        batch: usize,
        /// Total number of batches in the stage
        total_batches: usize,
    },

    /// A fetch stage finished all its batches
    StageCompleted {
        /// Which stage finished
        kind: ItemKind,
        /// Number of items fetched and written
        succeeded: usize,
        /// Number of items that failed
        failed: usize,
    },

    /// Compression started over the downloaded assets
    CompressionStarted {
        /// Number of files to compress
        files: usize,
    },

    /// One asset was compressed
    FileCompressed {
        /// File name of the compressed asset (e.g., "42.png")
        file_name: String,
        /// Size of the original file in bytes
        original_bytes: u64,
        /// Size of the compressed file in bytes
        compressed_bytes: u64,
    },

    /// The whole pipeline finished successfully
    RunCompleted {
        /// Final counts for the run
        summary: RunSummary,
    },
}

/// A single item that failed within a fetch stage
#[derive(Clone, Debug)]
pub struct ItemFailure {
    /// Item index (1-based)
    pub index: u32,
    /// Error message for the failure
    pub error: String,
}

/// Outcome of one fetch stage: per-item results, aggregated
///
/// Sibling successes are kept even when some items fail; the caller decides
/// whether the stage as a whole counts as failed.
#[derive(Clone, Debug, Default)]
pub struct StageReport {
    /// Number of items fetched and durably written
    pub succeeded: usize,
    /// Items that failed, in index order
    pub failures: Vec<ItemFailure>,
}

impl StageReport {
    /// Total number of items attempted in this stage
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}

/// Final counts for a successful pipeline run
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RunSummary {
    /// Number of metadata documents written
    pub metadata_files: usize,
    /// Number of image assets written
    pub asset_files: usize,
    /// Number of compressed copies written
    pub compressed_files: usize,
}
