//! Pure image helpers shared by the upload and serve paths.
//!
//! Decoding sniffs the format from the byte content rather than trusting the
//! filename, and re-encoding always uses the sniffed format so a PNG stays a
//! PNG through the resize round trip.

use image::{DynamicImage, GenericImageView, ImageFormat, imageops::FilterType};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("unrecognized image data")]
    UnknownFormat,
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Decode image bytes, returning the image together with its sniffed format.
pub fn decode(data: &[u8]) -> Result<(DynamicImage, ImageFormat), ImagingError> {
    let format = image::guess_format(data).map_err(|_| ImagingError::UnknownFormat)?;
    let img = image::load_from_memory_with_format(data, format)?;
    Ok((img, format))
}

/// Shrink `img` so both dimensions fit within `max_width` x `max_height`,
/// preserving aspect ratio. An image already within the box is returned
/// unchanged; this never enlarges.
pub fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

/// Re-encode an image in the given format.
pub fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 40])))
    }

    #[test]
    fn wide_image_shrinks_to_box_width() {
        let out = fit_within(solid(1600, 900), 800, 600);
        assert_eq!(out.dimensions(), (800, 450));
    }

    #[test]
    fn tall_image_shrinks_to_box_height() {
        let out = fit_within(solid(600, 1200), 800, 600);
        assert_eq!(out.dimensions(), (300, 600));
    }

    #[test]
    fn small_image_is_not_enlarged() {
        let out = fit_within(solid(400, 300), 800, 600);
        assert_eq!(out.dimensions(), (400, 300));
    }

    #[test]
    fn aspect_ratio_is_preserved_within_rounding() {
        let out = fit_within(solid(1234, 700), 800, 600);
        let (w, h) = out.dimensions();
        assert!(w <= 800 && h <= 600);
        let src = 1234.0 / 700.0;
        let dst = w as f64 / h as f64;
        assert!((src - dst).abs() < 0.01);
    }

    #[test]
    fn decode_encode_round_trip_keeps_format_and_size() {
        let bytes = encode(&solid(32, 16), ImageFormat::Png).unwrap();
        let (img, format) = decode(&bytes).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(img.dimensions(), (32, 16));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(ImagingError::UnknownFormat)
        ));
    }
}
