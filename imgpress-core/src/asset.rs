//! Image asset data structures

use crate::{ImageFormat, Result};
use image::ImageReader;
use std::io::Cursor;
use std::path::Path;

/// An encoded image held in memory.
///
/// Assets are immutable once loaded. Compression produces a new buffer
/// instead of rewriting this one.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    data: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
    file_name: Option<String>,
}

impl ImageAsset {
    /// Loads an asset, sniffing the format from the data
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::detect(&data)?;
        Self::with_format(data, format)
    }

    /// Loads an asset whose format is already known (e.g. from a MIME type)
    pub fn with_format(data: Vec<u8>, format: ImageFormat) -> Result<Self> {
        let (width, height) =
            ImageReader::with_format(Cursor::new(&data), format.into()).into_dimensions()?;

        Ok(Self {
            data,
            format,
            width,
            height,
            file_name: None,
        })
    }

    /// Reads an asset from disk, keeping the file name
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = ImageFormat::detect(&data).or_else(|_| ImageFormat::from_path(path))?;
        let asset = Self::with_format(data, format)?;

        Ok(match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => asset.with_file_name(name),
            None => asset,
        })
    }

    /// Attaches a file name used when naming the compressed output
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Returns the encoded bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the size of the encoded data in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}
