//! Output directory preparation and durable item writes

use std::path::Path;

use crate::config::StorageConfig;
use crate::error::Result;

/// Create the metadata, asset, and compressed-asset directories if absent
///
/// Idempotent: directories that already exist are left untouched. Any other
/// creation failure (e.g., permission denied) propagates as an I/O error.
pub fn prepare_directories(storage: &StorageConfig) -> Result<()> {
    for dir in [
        &storage.metadata_dir,
        &storage.asset_dir,
        &storage.compressed_dir,
    ] {
        std::fs::create_dir_all(dir)?;
        tracing::debug!(dir = %dir.display(), "output directory ready");
    }
    Ok(())
}

/// Write a fully received item body to its final path, overwriting any
/// existing file
///
/// The write completes before the item counts as fetched; there is no
/// partial-write recovery (a crash mid-write leaves a partial file, which a
/// re-run overwrites).
pub async fn write_item(path: &Path, body: &[u8]) -> Result<u64> {
    tokio::fs::write(path, body).await?;
    Ok(body.len() as u64)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn layout_in(root: &Path) -> StorageConfig {
        StorageConfig {
            metadata_dir: root.join("metadata"),
            asset_dir: root.join("asset"),
            compressed_dir: root.join("compressed-asset"),
        }
    }

    #[test]
    fn prepare_creates_all_three_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = layout_in(dir.path());

        prepare_directories(&storage).unwrap();

        assert!(storage.metadata_dir.is_dir());
        assert!(storage.asset_dir.is_dir());
        assert!(storage.compressed_dir.is_dir());
    }

    #[test]
    fn prepare_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = layout_in(dir.path());

        prepare_directories(&storage).unwrap();
        prepare_directories(&storage).unwrap();

        assert!(storage.asset_dir.is_dir());
    }

    #[tokio::test]
    async fn write_item_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");

        write_item(&path, b"{\"id\": 1}").await.unwrap();
        let bytes = write_item(&path, b"{\"id\": 1, \"v\": 2}").await.unwrap();

        assert_eq!(bytes, 17);
        assert_eq!(std::fs::read(&path).unwrap(), b"{\"id\": 1, \"v\": 2}");
    }
}
