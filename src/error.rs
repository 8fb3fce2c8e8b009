//! Error types for asset-dl
//!
//! This module provides error handling for the pipeline, including:
//! - Domain-specific error types (network, storage I/O, compression)
//! - Per-stage aggregate failures with the first failing index for diagnosis
//! - Context information (URL, file path, item index)

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ItemKind;

/// Result type alias for asset-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for asset-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.batch_size")
        key: Option<String>,
    },

    /// Network error (request failure, connection error, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status code
    #[error("GET {url} returned HTTP {status}")]
    HttpStatus {
        /// The URL that was requested
        url: String,
        /// The non-2xx status code returned by the server
        status: u16,
    },

    /// I/O error (directory creation, file write, file read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image compression error (decode, quantize, encode)
    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// A fetch stage finished with one or more failed items
    #[error(
        "{kind} stage failed: {failed} of {total} items failed \
         (first: index {first_index}: {first_error})"
    )]
    StageFailed {
        /// Which stage failed (metadata or asset)
        kind: ItemKind,
        /// Number of items that failed
        failed: usize,
        /// Total number of items attempted
        total: usize,
        /// Index of the first failing item
        first_index: u32,
        /// Error message of the first failing item
        first_error: String,
    },

    /// A background worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    TaskJoin(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Image-compression errors, tagged with the file that failed
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Reading the source image or writing the compressed output failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file being read or written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The downloaded bytes could not be decoded as an image
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// The file that failed to decode
        path: PathBuf,
        /// The underlying decoder error
        source: image::ImageError,
    },

    /// Palette quantization failed (e.g., the quality floor was unreachable)
    #[error("failed to quantize {path}: {message}")]
    Quantize {
        /// The file that failed to quantize
        path: PathBuf,
        /// The quantizer's error message
        message: String,
    },

    /// Writing the quantized image as an indexed PNG failed
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// The output file that failed to encode
        path: PathBuf,
        /// The underlying encoder error
        source: png::EncodingError,
    },
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(String::from),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failed_names_stage_and_first_index() {
        let err = Error::StageFailed {
            kind: ItemKind::Metadata,
            failed: 3,
            total: 1000,
            first_index: 500,
            first_error: "GET http://example/500.json returned HTTP 500".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("metadata stage failed"));
        assert!(msg.contains("3 of 1000"));
        assert!(msg.contains("index 500"));
    }

    #[test]
    fn http_status_message_includes_url_and_code() {
        let err = Error::HttpStatus {
            url: "http://example/7.png".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "GET http://example/7.png returned HTTP 404");
    }
}
