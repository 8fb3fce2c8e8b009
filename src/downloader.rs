//! Batched fetch engine shared by the metadata and asset stages
//!
//! Partitions the index space 1..=N into fixed-size batches. Batches run
//! strictly one after another; items within a batch run concurrently, each
//! as an atomic fetch-then-write unit. Peak concurrency and peak in-memory
//! body data are therefore bounded by the batch size, not by N.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;

use crate::config::RetryConfig;
use crate::fetch;
use crate::types::{Event, ItemFailure, ItemKind, StageReport};

/// Partition `1..=total_count` into consecutive batches of `batch_size`
///
/// The last batch may be shorter. `batch_size` must be at least 1 (enforced
/// by config validation).
pub(crate) fn batch_ranges(total_count: u32, batch_size: usize) -> Vec<RangeInclusive<u32>> {
    let size = (batch_size as u32).max(1);
    let mut ranges = Vec::new();
    let mut start = 1u32;
    while start <= total_count {
        let end = start.saturating_add(size - 1).min(total_count);
        ranges.push(start..=end);
        if end == total_count {
            break;
        }
        start = end + 1;
    }
    ranges
}

/// Fetch every item of one stage in sequential batches
///
/// Per-item results are collected rather than short-circuited: a failing
/// item neither cancels its in-flight siblings nor discards their already
/// written files, and later batches still run. The caller inspects the
/// returned [`StageReport`] to decide whether the stage counts as failed.
pub(crate) async fn run_fetch_stage<U, P>(
    client: &reqwest::Client,
    retry: &RetryConfig,
    kind: ItemKind,
    total_count: u32,
    batch_size: usize,
    make_url: U,
    make_path: P,
    event_tx: &broadcast::Sender<Event>,
) -> StageReport
where
    U: Fn(u32) -> String,
    P: Fn(u32) -> PathBuf,
{
    let batches = batch_ranges(total_count, batch_size);
    let total_batches = batches.len();
    let mut report = StageReport::default();

    for (batch_idx, range) in batches.into_iter().enumerate() {
        // No request of the next batch is issued before every item of this
        // batch has resolved.
        let results: Vec<(u32, crate::error::Result<u64>)> = stream::iter(range)
            .map(|index| {
                let url = make_url(index);
                let path = make_path(index);
                async move {
                    let result = fetch::fetch_and_store(client, retry, &url, &path).await;
                    (index, result)
                }
            })
            .buffer_unordered(batch_size)
            .collect()
            .await;

        for (index, result) in results {
            match result {
                Ok(bytes) => {
                    tracing::info!(%kind, index, bytes, "file saved");
                    report.succeeded += 1;
                    event_tx.send(Event::FileSaved { kind, index, bytes }).ok();
                }
                Err(e) => {
                    tracing::warn!(%kind, index, error = %e, "item failed");
                    report.failures.push(ItemFailure {
                        index,
                        error: e.to_string(),
                    });
                    event_tx
                        .send(Event::ItemFailed {
                            kind,
                            index,
                            error: e.to_string(),
                        })
                        .ok();
                }
            }
        }

        tracing::debug!(%kind, batch = batch_idx + 1, total_batches, "batch completed");
        event_tx
            .send(Event::BatchCompleted {
                kind,
                batch: batch_idx + 1,
                total_batches,
            })
            .ok();
    }

    report.failures.sort_by_key(|f| f.index);
    event_tx
        .send(Event::StageCompleted {
            kind,
            succeeded: report.succeeded,
            failed: report.failures.len(),
        })
        .ok();
    report
}
