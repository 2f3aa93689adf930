//! Blob encoding — canvas RGB pixels to PNG/JPEG/WebP bytes.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("buffer does not match dimensions: expected {expected} bytes, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Supported still-image output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
}

impl ImageMime {
    /// Parse a mime-type string; unknown types return `None` so the
    /// config layer can fall back to its default.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Encode an RGB24 buffer at the requested mime and quality.
///
/// `quality` in [0, 1] applies to JPEG only; PNG is lossless and the WebP
/// encoder in `image` is lossless-only.
pub fn encode_rgb(
    rgb: &[u8],
    width: u32,
    height: u32,
    mime: ImageMime,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(EncodeError::InvalidDimensions { expected, actual: rgb.len() });
    }

    let mut out = Vec::new();
    match mime {
        ImageMime::Png => {
            PngEncoder::new(&mut out).write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
        }
        ImageMime::Jpeg => {
            let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            JpegEncoder::new_with_quality(&mut out, q)
                .write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
        }
        ImageMime::Webp => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
        }
    }
    Ok(out)
}
