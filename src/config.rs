//! Configuration types for asset-dl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Fetch behavior configuration (collection size, endpoints, batching)
///
/// Groups settings related to how the remote collection is addressed and how
/// requests are fanned out. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL for metadata documents; `<n>.json` is appended per item
    pub metadata_base_url: String,

    /// Base URL for image assets; `<n>.<ext>` is appended per item
    pub image_base_url: String,

    /// Number of items in the collection, indices 1..=total_count (default: 1000)
    #[serde(default = "default_total_count")]
    pub total_count: u32,

    /// Number of concurrent requests per batch (default: 100)
    ///
    /// Batches run strictly one after another, so this is also the peak
    /// request concurrency of a fetch stage.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// File extension of the image assets, without the dot (default: "png")
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            metadata_base_url: String::new(),
            image_base_url: String::new(),
            total_count: default_total_count(),
            batch_size: default_batch_size(),
            image_extension: default_image_extension(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Output directory layout
///
/// The three directories are disjoint; the two fetch stages and the
/// compressor each own one and never write into another's.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for metadata documents (default: "./metadata")
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,

    /// Directory for downloaded image assets (default: "./asset")
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,

    /// Directory for compressed copies (default: "./compressed-asset")
    #[serde(default = "default_compressed_dir")]
    pub compressed_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            asset_dir: default_asset_dir(),
            compressed_dir: default_compressed_dir(),
        }
    }
}

impl StorageConfig {
    /// Path for the metadata document of `index`
    #[must_use]
    pub fn metadata_path(&self, index: u32) -> PathBuf {
        self.metadata_dir.join(format!("{index}.json"))
    }

    /// Path for the image asset of `index` with the given extension
    #[must_use]
    pub fn asset_path(&self, index: u32, extension: &str) -> PathBuf {
        self.asset_dir.join(format!("{index}.{extension}"))
    }

    /// Path for the compressed copy of an asset, preserving its file name
    #[must_use]
    pub fn compressed_path(&self, file_name: &std::ffi::OsStr) -> PathBuf {
        self.compressed_dir.join(file_name)
    }
}

/// Lossy compression configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Minimum acceptable quality, fractional 0.0..=1.0 (default: 0.15)
    ///
    /// Quantization fails for a file if even the largest palette cannot
    /// reach this quality.
    #[serde(default = "default_quality_min")]
    pub quality_min: f32,

    /// Target quality, fractional 0.0..=1.0 (default: 0.30)
    #[serde(default = "default_quality_max")]
    pub quality_max: f32,

    /// Number of files quantized in parallel on blocking threads (default: 4)
    #[serde(default = "default_compression_parallelism")]
    pub parallelism: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality_min: default_quality_min(),
            quality_max: default_quality_max(),
            parallelism: default_compression_parallelism(),
        }
    }
}

/// Retry behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_serde_ms")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde_ms")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the download pipeline
///
/// All knobs the components need are carried here explicitly; nothing is read
/// from ambient process state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Collection addressing and batching
    pub fetch: FetchConfig,

    /// Output directory layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Lossy compression settings
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Per-item retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display()), None))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is internally consistent
    ///
    /// Called by [`crate::CollectionDownloader::new`]; callers constructing a
    /// `Config` by hand get the same checks there.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.total_count == 0 {
            return Err(Error::config(
                "total_count must be at least 1",
                Some("fetch.total_count"),
            ));
        }
        if self.fetch.batch_size == 0 {
            return Err(Error::config(
                "batch_size must be at least 1",
                Some("fetch.batch_size"),
            ));
        }
        if self.fetch.image_extension.is_empty() || self.fetch.image_extension.contains('.') {
            return Err(Error::config(
                "image_extension must be a bare extension like \"png\"",
                Some("fetch.image_extension"),
            ));
        }
        for (url, key) in [
            (&self.fetch.metadata_base_url, "fetch.metadata_base_url"),
            (&self.fetch.image_base_url, "fetch.image_base_url"),
        ] {
            Url::parse(url)
                .map_err(|e| Error::config(format!("invalid base URL {url:?}: {e}"), Some(key)))?;
        }
        let (min, max) = (self.compression.quality_min, self.compression.quality_max);
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(Error::config(
                format!("quality range [{min}, {max}] must satisfy 0.0 <= min <= max <= 1.0"),
                Some("compression.quality_min"),
            ));
        }
        if self.compression.parallelism == 0 {
            return Err(Error::config(
                "parallelism must be at least 1",
                Some("compression.parallelism"),
            ));
        }
        Ok(())
    }
}

fn default_total_count() -> u32 {
    1000
}

fn default_batch_size() -> usize {
    100
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("./metadata")
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("./asset")
}

fn default_compressed_dir() -> PathBuf {
    PathBuf::from("./compressed-asset")
}

fn default_quality_min() -> f32 {
    0.15
}

fn default_quality_max() -> f32 {
    0.30
}

fn default_compression_parallelism() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second retry delays)
mod duration_serde_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
