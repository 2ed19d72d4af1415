//! # Transform Planner
//!
//! Turns the user's resize/rotate/grayscale/colorspace options into an ordered
//! list of [`Operation`]s and applies them to decoded pixels.
//!
//! ## Fixed order
//! 1. **Orientation**: explicit rotation if given, otherwise auto-orient from metadata
//!    (never both)
//! 2. **Resize**: missing dimension derived from the aspect ratio, optional no-enlargement clamp
//! 3. **Grayscale**: luminance only, stored back as RGB(A) so every encoder accepts it
//! 4. **sRGB**: normalize to 8-bit sRGB last so nothing after it undoes it
//!
//! Planning is pure: it only looks at dimensions and orientation, so it is
//! computed once per source file and shared by all target formats.

use crate::codec::DecodedImage;
use crate::error::ConvertError;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Transform options for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub allow_enlargement: bool,
    /// Clockwise degrees. `None` means auto-orient from metadata.
    pub rotate_degrees: Option<i32>,
    pub grayscale: bool,
    pub to_srgb: bool,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            allow_enlargement: true,
            rotate_degrees: None,
            grayscale: false,
            to_srgb: false,
        }
    }
}

impl TransformSpec {
    /// Check the options before any file is touched.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.width == Some(0) {
            return Err(ConvertError::Validation("width must be a positive integer".to_string()));
        }
        if self.height == Some(0) {
            return Err(ConvertError::Validation("height must be a positive integer".to_string()));
        }
        if let Some(degrees) = self.rotate_degrees {
            if degrees % 90 != 0 {
                return Err(ConvertError::Validation(format!(
                    "rotation must be a multiple of 90 degrees, got {}",
                    degrees
                )));
            }
        }
        Ok(())
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees. `None` for a full turn.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// A single image operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AutoOrient(Orientation),
    Rotate(Rotation),
    Resize { width: u32, height: u32 },
    Grayscale,
    ToSrgb,
}

fn orientation_swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

/// `round(other * requested / same)`, never below one pixel.
fn scale(other: u32, requested: u32, same: u32) -> u32 {
    let scaled = (other as f64 * requested as f64 / same as f64).round();
    scaled.max(1.0) as u32
}

/// Target dimensions for the resize step, `None` when nothing changes.
///
/// `source` must already account for any rotation applied before the resize.
pub fn resize_dimensions(spec: &TransformSpec, source: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return None;
    }

    let (mut width, mut height) = match (spec.width, spec.height) {
        (None, None) => return None,
        (Some(w), None) => (w, scale(src_h, w, src_w)),
        (None, Some(h)) => (scale(src_w, h, src_h), h),
        (Some(w), Some(h)) => (w, h),
    };

    // Only a strictly larger target is clamped.
    if !spec.allow_enlargement {
        width = width.min(src_w);
        height = height.min(src_h);
    }

    if (width, height) == source {
        None
    } else {
        Some((width, height))
    }
}

/// Build the operation sequence for a source of the given size and orientation.
pub fn plan(spec: &TransformSpec, source: (u32, u32), orientation: Orientation) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut dims = source;

    match spec.rotate_degrees {
        Some(degrees) => {
            if let Some(rotation) = Rotation::from_degrees(degrees) {
                if rotation.swaps_axes() {
                    dims = (dims.1, dims.0);
                }
                ops.push(Operation::Rotate(rotation));
            }
        }
        None => {
            if orientation != Orientation::NoTransforms {
                if orientation_swaps_axes(orientation) {
                    dims = (dims.1, dims.0);
                }
                ops.push(Operation::AutoOrient(orientation));
            }
        }
    }

    if let Some((width, height)) = resize_dimensions(spec, dims) {
        ops.push(Operation::Resize { width, height });
    }

    if spec.grayscale {
        ops.push(Operation::Grayscale);
    }

    if spec.to_srgb {
        ops.push(Operation::ToSrgb);
    }

    ops
}

/// Apply `ops` in order.
pub fn apply(mut image: DynamicImage, ops: &[Operation]) -> DynamicImage {
    for op in ops {
        image = match *op {
            Operation::AutoOrient(orientation) => {
                image.apply_orientation(orientation);
                image
            }
            Operation::Rotate(Rotation::Cw90) => image.rotate90(),
            Operation::Rotate(Rotation::Cw180) => image.rotate180(),
            Operation::Rotate(Rotation::Cw270) => image.rotate270(),
            Operation::Resize { width, height } => {
                image.resize_to_fill(width, height, FilterType::Lanczos3)
            }
            Operation::Grayscale => {
                let gray = image.grayscale();
                if gray.color().has_alpha() {
                    DynamicImage::ImageRgba8(gray.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(gray.to_rgb8())
                }
            }
            Operation::ToSrgb => {
                if image.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.to_rgb8())
                }
            }
        };
    }
    image
}

/// Plan and apply in one go.
pub fn transform(decoded: DecodedImage, spec: &TransformSpec) -> DynamicImage {
    let ops = plan(spec, decoded.dimensions(), decoded.orientation);
    apply(decoded.pixels, &ops)
}
