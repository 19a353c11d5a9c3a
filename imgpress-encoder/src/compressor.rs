//! Single-image compression: decode, optional resize, re-encode

use crate::Result;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use imgpress_core::{CompressionParams, CompressionResult, ImageAsset, ImageFormat};
use tracing::{debug, info};

/// Compressor bound to one set of parameters
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    params: CompressionParams,
}

impl Compressor {
    /// Creates a compressor with the given parameters
    pub fn new(params: CompressionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CompressionParams {
        &self.params
    }

    /// Compresses an asset with this compressor's parameters
    pub fn compress(&self, asset: &ImageAsset) -> Result<CompressionResult> {
        compress(asset, &self.params)
    }
}

/// Compresses a loaded asset.
///
/// The output keeps the input format. Parameters are validated before any
/// decoding happens.
pub fn compress(asset: &ImageAsset, params: &CompressionParams) -> Result<CompressionResult> {
    params.validate()?;

    let format = asset.format();
    debug!(
        %format,
        width = asset.width(),
        height = asset.height(),
        bytes = asset.data_size(),
        "decoding image"
    );
    let mut image = image::load_from_memory_with_format(asset.data(), format.into())?;

    let (width, height) = params.fit_dimensions(image.width(), image.height());
    if (width, height) != (image.width(), image.height()) {
        debug!(from_w = image.width(), from_h = image.height(), width, height, "resizing");
        image = image.resize_exact(width, height, FilterType::Lanczos3);
    }

    let data = encode(&image, format, params.quality)?;

    info!(
        %format,
        quality = params.quality,
        original = asset.data_size(),
        compressed = data.len(),
        "compressed image"
    );

    Ok(CompressionResult {
        data,
        format,
        width,
        height,
        original_size: asset.data_size(),
        quality: params.quality,
        file_name: asset.file_name().map(String::from),
    })
}

/// Compresses raw bytes whose format is known
pub fn compress_bytes(
    data: &[u8],
    format: ImageFormat,
    params: &CompressionParams,
) -> Result<CompressionResult> {
    params.validate()?;
    let asset = ImageAsset::with_format(data.to_vec(), format)?;
    compress(&asset, params)
}

/// Compresses raw bytes tagged with a MIME type such as `image/png`
pub fn compress_with_mime(
    data: &[u8],
    mime_type: &str,
    params: &CompressionParams,
) -> Result<CompressionResult> {
    let format = ImageFormat::from_mime(mime_type)?;
    compress_bytes(data, format, params)
}

/// Encodes `image` as `format`.
///
/// Only JPEG honours `quality` as a quality factor. GIF uses it to pick the
/// quantiser speed; PNG, WebP and BMP are lossless.
fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    let mut buffer = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            // No alpha channel in JPEG
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, quality).encode(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageFormat::Png => {
            let (pixels, color) = pixels(image);
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive)
                .write_image(&pixels, width, height, color)?;
        }
        ImageFormat::Gif => {
            let rgba = image.to_rgba8();
            let mut encoder = GifEncoder::new_with_speed(&mut buffer, gif_speed(quality));
            encoder.encode(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
        ImageFormat::WebP => {
            let (pixels, color) = pixels(image);
            WebPEncoder::new_lossless(&mut buffer).write_image(&pixels, width, height, color)?;
        }
        ImageFormat::Bmp => {
            let (pixels, color) = pixels(image);
            BmpEncoder::new(&mut buffer).write_image(&pixels, width, height, color)?;
        }
    }

    Ok(buffer)
}

/// 8-bit pixels, keeping alpha only when the source has it
fn pixels(image: &DynamicImage) -> (Vec<u8>, ExtendedColorType) {
    if image.color().has_alpha() {
        (image.to_rgba8().into_raw(), ExtendedColorType::Rgba8)
    } else {
        (image.to_rgb8().into_raw(), ExtendedColorType::Rgb8)
    }
}

/// Maps quality 1..100 to GIF quantiser speed 30..1 (lower is finer)
fn gif_speed(quality: u8) -> i32 {
    let quality = quality.clamp(1, 100) as i32;
    30 - (quality - 1) * 29 / 99
}
