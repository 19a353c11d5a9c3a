//! imgpress Encoder Library
//!
//! This library decodes images, optionally shrinks them, and re-encodes them
//! at a target quality. It also runs independent compressions in parallel.

pub mod batch;
pub mod compressor;
pub mod progress_tracker;

pub use batch::{output_path, plan_outputs, BatchCompressor, BatchOutcome, BatchReport};
pub use compressor::{compress, compress_bytes, compress_with_mime, Compressor};
pub use progress_tracker::ProgressTracker;

use imgpress_core::CompressionParams;

/// Result type for imgpress-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for imgpress-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Core(#[from] imgpress_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Output conflict: {0}")]
    OutputConflict(String),
}

impl Error {
    /// Whether the error comes from a bad format or bad parameters
    /// rather than from the image data itself
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Core(imgpress_core::Error::UnsupportedFormat(_))
                | Error::Core(imgpress_core::Error::InvalidParams(_))
        )
    }
}

/// Batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Parameters applied to every image
    pub params: CompressionParams,
    /// Target output size in bytes; when set, overrides `params.quality`
    /// per image
    pub target_size: Option<u64>,
    /// Number of worker threads (0 = one per CPU)
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            params: CompressionParams::default(),
            target_size: None,
            jobs: 0,
        }
    }
}

impl BatchConfig {
    /// Resolves the effective parameters for an input of `input_len` bytes
    pub fn params_for(&self, input_len: usize) -> CompressionParams {
        match self.target_size {
            Some(target) => CompressionParams {
                quality: imgpress_core::params::quality_for_target_size(target, input_len),
                ..self.params
            },
            None => self.params,
        }
    }

    /// Number of worker threads to spawn for `items` inputs
    pub fn worker_count(&self, items: usize) -> usize {
        let jobs = if self.jobs == 0 { num_cpus::get() } else { self.jobs };
        jobs.clamp(1, items.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_for_target_size() {
        let config = BatchConfig {
            params: CompressionParams::new(70).with_max_size(Some(640), None),
            target_size: Some(500),
            jobs: 1,
        };
        let params = config.params_for(1000);
        assert_eq!(params.quality, 50);
        assert_eq!(params.max_width, Some(640));

        let fixed = BatchConfig::default();
        assert_eq!(fixed.params_for(1000).quality, imgpress_core::DEFAULT_QUALITY);
    }

    #[test]
    fn test_worker_count() {
        let config = BatchConfig {
            jobs: 8,
            ..BatchConfig::default()
        };
        assert_eq!(config.worker_count(3), 3);
        assert_eq!(config.worker_count(20), 8);
        assert_eq!(config.worker_count(0), 1);
        assert!(BatchConfig::default().worker_count(1000) >= 1);
    }

    #[test]
    fn test_validation_errors() {
        let invalid: Error = imgpress_core::Error::InvalidParams("quality".into()).into();
        assert!(invalid.is_validation());
        assert!(!Error::OutputConflict("out/x.jpg".into()).is_validation());
    }
}
