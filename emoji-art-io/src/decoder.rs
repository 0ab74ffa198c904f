//! Image decoding backed by the `image` crate.
//!
//! Decodes PNG, JPEG, and WebP background bytes into RGBA8 pixels, optionally
//! shrinking anything larger than a configured edge length.

use emoji_art_core::{DecodeError, DecodedImage, ImageDecoder};

use crate::error::{IoError, IoResult};
use crate::fetcher::FetchConfig;

/// [`ImageDecoder`] that uses `image::load_from_memory`.
///
/// Optionally downscales images larger than a maximum edge length, keeping
/// the aspect ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder {
    max_dimension: Option<u32>,
}

impl ImageCrateDecoder {
    /// Decoder that keeps images at their native size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_dimension: None,
        }
    }

    /// Decoder that shrinks images so neither edge exceeds `max_dimension`.
    #[must_use]
    pub const fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: Some(max_dimension),
        }
    }

    /// Decoder honoring `config.max_image_dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] for a zero maximum.
    pub fn from_config(config: &FetchConfig) -> IoResult<Self> {
        match config.max_image_dimension {
            Some(0) => Err(IoError::InvalidConfig(
                "max image dimension must be non-zero".to_string(),
            )),
            Some(max) => Ok(Self::with_max_dimension(max)),
            None => Ok(Self::new()),
        }
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let image = load_image_from_bytes(bytes)?;
        match self.max_dimension {
            Some(max) => Ok(resize_to_fit(&image, max, max).unwrap_or(image)),
            None => Ok(image),
        }
    }
}

/// Decode raw bytes into an RGBA8 image.
///
/// # Errors
///
/// Returns [`DecodeError`] if the bytes are not a supported image.
pub fn load_image_from_bytes(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    let format = image::guess_format(data).ok();
    let img = image::load_from_memory(data).map_err(|e| DecodeError(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!("Decoded {format:?} image {width}x{height}");

    Ok(DecodedImage::new(width, height, rgba.into_raw()))
}

/// Shrink an image to fit within max dimensions while preserving aspect ratio.
///
/// Returns `None` if the image already fits.
#[must_use]
pub fn resize_to_fit(image: &DecodedImage, max_width: u32, max_height: u32) -> Option<DecodedImage> {
    if image.width() <= max_width && image.height() <= max_height {
        return None;
    }

    let scale_x = f64::from(max_width) / f64::from(image.width());
    let scale_y = f64::from(max_height) / f64::from(image.height());
    let scale = scale_x.min(scale_y);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_width = ((f64::from(image.width()) * scale) as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_height = ((f64::from(image.height()) * scale) as u32).max(1);

    let rgba = image::RgbaImage::from_raw(image.width(), image.height(), image.pixels().to_vec())?;

    let resized = image::imageops::resize(
        &rgba,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    );

    Some(DecodedImage::new(new_width, new_height, resized.into_raw()))
}
