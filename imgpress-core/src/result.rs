//! Compression results

use crate::ImageFormat;

/// Output of a single compression call
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Re-encoded image data
    pub data: Vec<u8>,
    /// Output format (always the input format)
    pub format: ImageFormat,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Size of the input in bytes
    pub original_size: usize,
    /// Quality the image was encoded with
    pub quality: u8,
    /// File name of the input, if known
    pub file_name: Option<String>,
}

/// Description of a compressed image, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputMeta {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

impl CompressionResult {
    /// Returns the size of the compressed data in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Compressed size as a fraction of the input size
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.size() as f64 / self.original_size as f64
    }

    /// Whether the output is strictly smaller than the input
    pub fn is_smaller(&self) -> bool {
        self.size() < self.original_size
    }

    /// Name to give the output, defaulting to `compressed_image.<ext>`
    pub fn output_file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("compressed_image.{}", self.format.extension()))
    }

    pub fn meta(&self) -> OutputMeta {
        OutputMeta {
            filename: self.output_file_name(),
            mime_type: self.format.mime_type().to_string(),
            size: self.size(),
        }
    }

    /// Consumes the result, returning the encoded bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
