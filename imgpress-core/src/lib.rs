//! imgpress Core Library
//!
//! This library provides the core data structures shared by the imgpress
//! crates: supported image formats, loaded image assets, compression
//! parameters and compression results.

pub mod asset;
pub mod format;
pub mod params;
pub mod result;

pub use asset::ImageAsset;
pub use format::ImageFormat;
pub use params::{CompressionParams, DEFAULT_QUALITY};
pub use result::{CompressionResult, OutputMeta};

/// Result type for imgpress-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for imgpress-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid compression parameters: {0}")]
    InvalidParams(String),
}
