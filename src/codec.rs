//! # Native Codec
//!
//! Thin wrapper around the `image` crate: decode bytes into pixels plus the
//! embedded orientation, and encode pixels into one of the native target formats.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with guessed format |
//! | Orientation | `ImageDecoder::orientation` (EXIF) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` (RGB only) |
//! | Encode → PNG | `PngEncoder` |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → AVIF | `AvifEncoder::new_with_speed_quality` (rav1e) |
//!
//! JPEG XL has no encoder here, see [`crate::external_encoder`].

use crate::error::ConvertError;
use crate::format::FormatId;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// rav1e speed preset: 1 (slowest) to 10 (fastest).
const AVIF_SPEED: u8 = 6;

/// Decoded pixels together with the orientation the source asked for.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    pub orientation: Orientation,
}

impl DecodedImage {
    /// Wrap pixels that carry no orientation metadata.
    #[cfg(test)]
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            orientation: Orientation::NoTransforms,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }
}

/// Encoder knobs shared by the native formats.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// 1-100, used by JPEG and AVIF
    pub quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

/// Decode an in-memory image, sniffing the format from its content.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, ConvertError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;

    // Broken EXIF should not prevent the conversion.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let pixels = DynamicImage::from_decoder(decoder)?;

    Ok(DecodedImage { pixels, orientation })
}

/// Encode `image` into the byte representation of a native `format`.
pub fn encode(
    image: &DynamicImage,
    format: FormatId,
    options: &EncodeOptions,
) -> Result<Vec<u8>, ConvertError> {
    let mut buffer = Vec::new();

    match format {
        FormatId::Jpg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, options.quality))?;
        }
        FormatId::Png => {
            png_compatible(image)
                .write_with_encoder(PngEncoder::new(&mut buffer))?;
        }
        FormatId::Webp => {
            eight_bit_rgb(image).write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
        }
        FormatId::Avif => {
            eight_bit_rgb(image).write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buffer,
                AVIF_SPEED,
                options.quality,
            ))?;
        }
        FormatId::JpegXl => return Err(ConvertError::NoNativeEncoder(format)),
    }

    Ok(buffer)
}

/// RGB8 or RGBA8 depending on whether the source has an alpha channel.
fn eight_bit_rgb(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(image),
        color if color.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}

/// PNG takes everything except floating point buffers.
fn png_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::Rgb32F => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
        ColorType::Rgba32F => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
        _ => Cow::Borrowed(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(16, 8, |x, y| {
            Rgba([(x * 16) as u8, (y * 32) as u8, 128, 200])
        }))
    }

    #[test]
    fn test_png_keeps_dimensions_and_alpha() {
        let bytes = encode(&sample(), FormatId::Png, &EncodeOptions::default()).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.pixels.color().has_alpha());
        assert_eq!(decoded.orientation, Orientation::NoTransforms);
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let bytes = encode(&sample(), FormatId::Jpg, &EncodeOptions { quality: 90 }).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = decode(&bytes).unwrap();
        assert!(!decoded.pixels.color().has_alpha());
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn test_webp_signature() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        let bytes = encode(&gray, FormatId::Webp, &EncodeOptions::default()).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_jpegxl_has_no_native_encoder() {
        let err = encode(&sample(), FormatId::JpegXl, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::NoNativeEncoder(FormatId::JpegXl)));
    }

    /// Insert an APP1 Exif segment with a single Orientation entry right after SOI.
    fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\0");
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
        tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&(orientation as u32).to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_exif_orientation_rotates_dimensions() {
        let wide = DynamicImage::ImageRgb8(image::RgbImage::from_fn(100, 50, |x, _| {
            image::Rgb([(x * 2) as u8, 64, 128])
        }));
        let jpeg = encode(&wide, FormatId::Jpg, &EncodeOptions::default()).unwrap();
        let tagged = with_exif_orientation(&jpeg, 6);

        let decoded = decode(&tagged).unwrap();
        assert_eq!(decoded.orientation, Orientation::Rotate90);
        assert_eq!(decoded.dimensions(), (100, 50));

        let oriented = crate::transform::transform(decoded, &crate::transform::TransformSpec::default());
        assert_eq!((oriented.width(), oriented.height()), (50, 100));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
