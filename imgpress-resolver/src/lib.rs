//! imgpress Resolver Library
//!
//! This library turns image references handed out by a Dify deployment into
//! fetchable URLs and downloads the images behind them.

pub mod fetcher;
pub mod resolver;

pub use fetcher::{FetchConfig, Fetcher, FileReference};
pub use resolver::{resolve_reference, UrlResolver};
pub use reqwest::Url;

/// Result type for imgpress-resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for imgpress-resolver operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("{0}")]
    Core(#[from] imgpress_core::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
