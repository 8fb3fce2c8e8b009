//! Lossy post-download image compression
//!
//! Re-encodes every downloaded asset as an indexed-color PNG via palette
//! quantization (libimagequant), the same transform the reference tooling
//! applies with pngquant. Quantization is CPU-bound, so files run on
//! blocking worker threads with bounded parallelism while the async caller
//! awaits them.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;

use crate::config::{CompressionConfig, StorageConfig};
use crate::error::{CompressionError, Error, Result};
use crate::types::Event;

/// Compress every downloaded asset into the compressed-asset directory
///
/// Scans the asset directory for files with the configured extension and
/// writes a quantized copy under the same file name. Runs strictly after
/// the fetch stages; any single file failure aborts the whole call. Returns
/// the number of files compressed.
pub async fn compress_directory(
    storage: &StorageConfig,
    compression: &CompressionConfig,
    extension: &str,
    event_tx: &broadcast::Sender<Event>,
) -> Result<usize> {
    let inputs = collect_assets(&storage.asset_dir, extension)?;
    tracing::info!(files = inputs.len(), "compression started");
    event_tx
        .send(Event::CompressionStarted {
            files: inputs.len(),
        })
        .ok();

    let quality_min = (compression.quality_min * 100.0).round() as u8;
    let quality_max = (compression.quality_max * 100.0).round() as u8;

    let mut jobs = stream::iter(inputs)
        .map(|input| {
            let output = storage.compressed_path(input.file_name().unwrap_or(input.as_os_str()));
            async move {
                let worker_input = input.clone();
                let worker_output = output.clone();
                let (original, compressed) = tokio::task::spawn_blocking(move || {
                    compress_one(&worker_input, &worker_output, quality_min, quality_max)
                })
                .await
                .map_err(|e| Error::TaskJoin(e.to_string()))??;
                Ok::<_, Error>((output, original, compressed))
            }
        })
        .buffer_unordered(compression.parallelism.max(1));

    let mut count = 0usize;
    while let Some(result) = jobs.next().await {
        let (output, original_bytes, compressed_bytes) = result?;
        count += 1;
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(file = %file_name, original_bytes, compressed_bytes, "file compressed");
        event_tx
            .send(Event::FileCompressed {
                file_name,
                original_bytes,
                compressed_bytes,
            })
            .ok();
    }
    Ok(count)
}

/// List asset files with the given extension, sorted by file name
///
/// Sorting keeps log output and event order stable across runs.
fn collect_assets(asset_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(asset_dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Quantize one image file and write it as an indexed-color PNG
///
/// Returns `(original_bytes, compressed_bytes)`.
fn compress_one(
    input: &Path,
    output: &Path,
    quality_min: u8,
    quality_max: u8,
) -> std::result::Result<(u64, u64), CompressionError> {
    let data = std::fs::read(input).map_err(|source| CompressionError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let original_bytes = data.len() as u64;

    let decoded = image::load_from_memory(&data).map_err(|source| CompressionError::Decode {
        path: input.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<imagequant::RGBA> = rgba
        .pixels()
        .map(|p| imagequant::RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let quantize_err = |e: imagequant::Error| CompressionError::Quantize {
        path: input.to_path_buf(),
        message: e.to_string(),
    };
    let mut attributes = imagequant::new();
    attributes
        .set_quality(quality_min, quality_max)
        .map_err(quantize_err)?;
    let mut liq_image = attributes
        .new_image(pixels, width as usize, height as usize, 0.0)
        .map_err(quantize_err)?;
    let mut quantized = attributes.quantize(&mut liq_image).map_err(quantize_err)?;
    quantized.set_dithering_level(1.0).map_err(quantize_err)?;
    let (palette, indexed) = quantized.remapped(&mut liq_image).map_err(quantize_err)?;

    write_indexed_png(output, width, height, &palette, &indexed)?;

    let compressed_bytes = std::fs::metadata(output)
        .map_err(|source| CompressionError::Io {
            path: output.to_path_buf(),
            source,
        })?
        .len();
    Ok((original_bytes, compressed_bytes))
}

/// Encode an indexed-color PNG with a PLTE palette and tRNS alpha entries
fn write_indexed_png(
    output: &Path,
    width: u32,
    height: u32,
    palette: &[imagequant::RGBA],
    indexed: &[u8],
) -> std::result::Result<(), CompressionError> {
    let io_err = |source: std::io::Error| CompressionError::Io {
        path: output.to_path_buf(),
        source,
    };
    let encode_err = |source: png::EncodingError| CompressionError::Encode {
        path: output.to_path_buf(),
        source,
    };

    let mut plte = Vec::with_capacity(palette.len() * 3);
    let mut trns = Vec::with_capacity(palette.len());
    for color in palette {
        plte.extend_from_slice(&[color.r, color.g, color.b]);
        trns.push(color.a);
    }

    let file = std::fs::File::create(output).map_err(io_err)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(plte);
    encoder.set_trns(trns);
    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(indexed).map_err(encode_err)?;
    writer.finish().map_err(encode_err)?;
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic multi-color test image; varied enough that the RGBA
    /// original is clearly larger than an indexed copy.
    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) * 29 % 256) as u8,
                255,
            ])
        });
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn compress_one_writes_smaller_valid_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("1.png");
        let output = dir.path().join("1-compressed.png");
        std::fs::write(&input, test_png(64, 64)).unwrap();

        let (original, compressed) = compress_one(&input, &output, 15, 30).unwrap();

        assert!(output.exists());
        assert!(compressed <= original, "quantized copy must not grow");
        let reloaded = image::open(&output).unwrap().to_rgba8();
        assert_eq!(reloaded.dimensions(), (64, 64));
    }

    #[test]
    fn compress_one_rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("1.png");
        let output = dir.path().join("1-compressed.png");
        std::fs::write(&input, b"not a png at all").unwrap();

        let err = compress_one(&input, &output, 15, 30).unwrap_err();
        assert!(matches!(err, CompressionError::Decode { .. }));
    }

    #[test]
    fn collect_assets_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2.png"), b"x").unwrap();
        std::fs::write(dir.path().join("1.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let inputs = collect_assets(dir.path(), "png").unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.png", "2.png"]);
    }

    #[tokio::test]
    async fn compress_directory_preserves_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            metadata_dir: dir.path().join("metadata"),
            asset_dir: dir.path().join("asset"),
            compressed_dir: dir.path().join("compressed-asset"),
        };
        crate::storage::prepare_directories(&storage).unwrap();
        std::fs::write(storage.asset_dir.join("1.png"), test_png(32, 32)).unwrap();
        std::fs::write(storage.asset_dir.join("2.png"), test_png(32, 32)).unwrap();

        let (event_tx, _rx) = broadcast::channel(16);
        let count = compress_directory(
            &storage,
            &CompressionConfig::default(),
            "png",
            &event_tx,
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert!(storage.compressed_dir.join("1.png").exists());
        assert!(storage.compressed_dir.join("2.png").exists());
    }

    #[tokio::test]
    async fn one_bad_file_aborts_the_whole_call() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            metadata_dir: dir.path().join("metadata"),
            asset_dir: dir.path().join("asset"),
            compressed_dir: dir.path().join("compressed-asset"),
        };
        crate::storage::prepare_directories(&storage).unwrap();
        std::fs::write(storage.asset_dir.join("1.png"), test_png(16, 16)).unwrap();
        std::fs::write(storage.asset_dir.join("2.png"), b"corrupt").unwrap();

        let (event_tx, _rx) = broadcast::channel(16);
        let result =
            compress_directory(&storage, &CompressionConfig::default(), "png", &event_tx).await;

        assert!(matches!(result, Err(Error::Compression(_))));
    }
}
