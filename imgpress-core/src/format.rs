//! Image formats accepted for compression

use crate::{Error, Result};
use std::fmt;
use std::path::Path;

/// An image format imgpress can decode and re-encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
}

impl ImageFormat {
    /// All supported formats
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::WebP,
        ImageFormat::Bmp,
    ];

    /// Parses a MIME type such as `image/jpeg`.
    ///
    /// Parameters after `;` are ignored and matching is case-insensitive.
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        Self::ALL
            .into_iter()
            .find(|format| format.mime_type().eq_ignore_ascii_case(essence))
            .ok_or_else(|| Error::UnsupportedFormat(mime.to_string()))
    }

    /// Parses a file extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "gif" => Ok(ImageFormat::Gif),
            "webp" => Ok(ImageFormat::WebP),
            "bmp" | "dib" => Ok(ImageFormat::Bmp),
            _ => Err(Error::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Guesses the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    /// Sniffs the format from the leading magic bytes
    pub fn detect(data: &[u8]) -> Result<Self> {
        let guessed = image::guess_format(data)
            .map_err(|_| Error::UnsupportedFormat("unrecognized image data".to_string()))?;
        Self::try_from(guessed)
    }

    /// Returns the canonical MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Returns the preferred file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Whether the encoder honours the quality setting directly
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Gif => "GIF",
            ImageFormat::WebP => "WebP",
            ImageFormat::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

impl TryFrom<image::ImageFormat> for ImageFormat {
    type Error = Error;

    fn try_from(format: image::ImageFormat) -> Result<Self> {
        match format {
            image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
            image::ImageFormat::Png => Ok(ImageFormat::Png),
            image::ImageFormat::Gif => Ok(ImageFormat::Gif),
            image::ImageFormat::WebP => Ok(ImageFormat::WebP),
            image::ImageFormat::Bmp => Ok(ImageFormat::Bmp),
            other => Err(Error::UnsupportedFormat(format!("{:?}", other))),
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::WebP => image::ImageFormat::WebP,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime("IMAGE/PNG").unwrap(), ImageFormat::Png);
        assert_eq!(
            ImageFormat::from_mime("image/webp; charset=binary").unwrap(),
            ImageFormat::WebP
        );
        assert!(matches!(
            ImageFormat::from_mime("image/tiff"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(ImageFormat::from_mime("application/pdf").is_err());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageFormat::from_extension("JPG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension(".jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("bmp").unwrap(), ImageFormat::Bmp);
        assert!(ImageFormat::from_extension("heic").is_err());
        assert!(ImageFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_detect_magic_bytes() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(ImageFormat::detect(&png).unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::detect(b"GIF89a....").unwrap(), ImageFormat::Gif);
        assert!(ImageFormat::detect(b"not an image").is_err());
    }
}
