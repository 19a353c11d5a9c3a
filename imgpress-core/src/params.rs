//! Compression parameters

use crate::{Error, Result};

/// Quality used when neither a quality nor a target size is given
pub const DEFAULT_QUALITY: u8 = 85;

/// Number of bytes in one megabyte, as used for target sizes
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Configuration for one compression call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionParams {
    /// Encoding quality (1-100)
    pub quality: u8,
    /// Optional maximum output width in pixels
    pub max_width: Option<u32>,
    /// Optional maximum output height in pixels
    pub max_height: Option<u32>,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_width: None,
            max_height: None,
        }
    }
}

impl CompressionParams {
    /// Creates parameters with the given quality and no size bound
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// Derives the quality from a target output size.
    ///
    /// The quality is the target/input byte ratio scaled to 100 and clamped
    /// to 1..=100. A zero target falls back to [`DEFAULT_QUALITY`].
    pub fn for_target_size(target_bytes: u64, input_len: usize) -> Self {
        Self::new(quality_for_target_size(target_bytes, input_len))
    }

    /// Sets the bounding box the output must fit in
    pub fn with_max_size(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    /// Checks that quality and size bounds are in range
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidParams(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        if self.max_width == Some(0) {
            return Err(Error::InvalidParams("max width must be positive".to_string()));
        }
        if self.max_height == Some(0) {
            return Err(Error::InvalidParams("max height must be positive".to_string()));
        }
        Ok(())
    }

    /// Computes the output dimensions for an input of `width`x`height`.
    ///
    /// Images are only ever shrunk. The result fits inside the bounding box
    /// and keeps the aspect ratio, with each side at least one pixel.
    pub fn fit_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_w = self.max_width.unwrap_or(u32::MAX);
        let max_h = self.max_height.unwrap_or(u32::MAX);
        if width <= max_w && height <= max_h {
            return (width, height);
        }

        let (w, h) = (width as u64, height as u64);
        let (mw, mh) = (max_w as u64, max_h as u64);

        // Compare mw/w against mh/h without floating point
        if mw * h <= mh * w {
            let new_h = ((h * mw + w / 2) / w).clamp(1, mh);
            (max_w, new_h as u32)
        } else {
            let new_w = ((w * mh + h / 2) / h).clamp(1, mw);
            (new_w as u32, max_h)
        }
    }

    /// Whether an input of `width`x`height` needs resizing
    pub fn needs_resize(&self, width: u32, height: u32) -> bool {
        self.fit_dimensions(width, height) != (width, height)
    }
}

/// Converts a target size in megabytes to bytes. Negative values map to 0.
pub fn megabytes_to_bytes(megabytes: f64) -> u64 {
    if megabytes.is_finite() && megabytes > 0.0 {
        (megabytes * BYTES_PER_MB) as u64
    } else {
        0
    }
}

/// Quality needed to bring `input_len` bytes down to roughly `target_bytes`
pub fn quality_for_target_size(target_bytes: u64, input_len: usize) -> u8 {
    if target_bytes == 0 {
        return DEFAULT_QUALITY;
    }
    if input_len == 0 {
        return 100;
    }
    let quality = (100u128 * target_bytes as u128) / input_len as u128;
    quality.clamp(1, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CompressionParams::default().validate().is_ok());
        assert!(CompressionParams::new(1).validate().is_ok());
        assert!(CompressionParams::new(100).validate().is_ok());
        assert!(matches!(
            CompressionParams::new(0).validate(),
            Err(Error::InvalidParams(_))
        ));
        assert!(CompressionParams::new(101).validate().is_err());
        assert!(CompressionParams::new(50)
            .with_max_size(Some(0), None)
            .validate()
            .is_err());
        assert!(CompressionParams::new(50)
            .with_max_size(None, Some(0))
            .validate()
            .is_err());
    }

    #[test]
    fn test_quality_for_target_size() {
        // 1 MB target for a 4 MB input
        assert_eq!(quality_for_target_size(1024 * 1024, 4 * 1024 * 1024), 25);
        // Target bigger than input clamps to 100
        assert_eq!(quality_for_target_size(10_000, 1_000), 100);
        // Tiny target clamps to 1
        assert_eq!(quality_for_target_size(1, 1_000_000), 1);
        // No target keeps the default
        assert_eq!(quality_for_target_size(0, 1_000), DEFAULT_QUALITY);
        assert_eq!(
            CompressionParams::for_target_size(0, 1_000).quality,
            DEFAULT_QUALITY
        );
    }

    #[test]
    fn test_megabytes_to_bytes() {
        assert_eq!(megabytes_to_bytes(1.0), 1024 * 1024);
        assert_eq!(megabytes_to_bytes(0.5), 512 * 1024);
        assert_eq!(megabytes_to_bytes(0.0), 0);
        assert_eq!(megabytes_to_bytes(-2.0), 0);
        assert_eq!(megabytes_to_bytes(f64::NAN), 0);
    }

    #[test]
    fn test_fit_dimensions_preserves_aspect_ratio() {
        let params = CompressionParams::new(80).with_max_size(Some(1000), Some(1000));
        assert_eq!(params.fit_dimensions(2000, 2000), (1000, 1000));
        assert_eq!(params.fit_dimensions(4000, 2000), (1000, 500));
        assert_eq!(params.fit_dimensions(2000, 4000), (500, 1000));
        assert_eq!(params.fit_dimensions(800, 600), (800, 600));
        assert!(!params.needs_resize(800, 600));
    }

    #[test]
    fn test_fit_dimensions_single_bound() {
        let width_only = CompressionParams::new(80).with_max_size(Some(300), None);
        assert_eq!(width_only.fit_dimensions(1200, 900), (300, 225));

        let height_only = CompressionParams::new(80).with_max_size(None, Some(100));
        assert_eq!(height_only.fit_dimensions(1200, 900), (133, 100));
    }

    #[test]
    fn test_fit_dimensions_never_below_one_pixel() {
        let params = CompressionParams::new(80).with_max_size(Some(10), Some(10));
        assert_eq!(params.fit_dimensions(10_000, 1), (10, 1));
    }
}
