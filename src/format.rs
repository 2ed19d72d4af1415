//! # Format Registry
//!
//! Static knowledge about the image formats this tool understands:
//! - which formats are encoded in-process and which are delegated to an external tool
//! - the mapping between file extensions, request tokens and formats
//! - expansion of the `all` token into the full, fixed-order format set
//!
//! | Format  | Token    | Extension | Strategy         |
//! |---------|----------|-----------|------------------|
//! | JPEG    | `jpg`    | `.jpg`    | Native           |
//! | PNG     | `png`    | `.png`    | Native           |
//! | WebP    | `webp`   | `.webp`   | Native           |
//! | AVIF    | `avif`   | `.avif`   | Native           |
//! | JPEG XL | `jpegxl` | `.jxl`    | ExternalDelegate |

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Token that expands to every supported target format.
pub const ALL_TOKEN: &str = "all";

/// Source extensions picked up when scanning a directory.
///
/// Overlaps the target set but is not the same thing: `jpeg` is accepted as a
/// source spelling and `jxl` is the extension of the `jpegxl` format.
pub const SOURCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "jxl"];

/// One of the fixed image formats this tool recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatId {
    Jpg,
    Png,
    Webp,
    Avif,
    #[serde(rename = "jpegxl")]
    JpegXl,
}

/// How a target format gets encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Encoded entirely by the in-process codec
    Native,
    /// Requires a separate encoder process
    ExternalDelegate,
}

impl FormatId {
    /// Every format, native formats first and the external one last.
    pub const ALL: [FormatId; 5] = [
        FormatId::Jpg,
        FormatId::Png,
        FormatId::Webp,
        FormatId::Avif,
        FormatId::JpegXl,
    ];

    /// The name used to request this format on the command line.
    pub fn token(&self) -> &'static str {
        match self {
            FormatId::Jpg => "jpg",
            FormatId::Png => "png",
            FormatId::Webp => "webp",
            FormatId::Avif => "avif",
            FormatId::JpegXl => "jpegxl",
        }
    }

    /// The extension written to disk. Differs from the token for JPEG XL.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatId::Jpg => "jpg",
            FormatId::Png => "png",
            FormatId::Webp => "webp",
            FormatId::Avif => "avif",
            FormatId::JpegXl => "jxl",
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            FormatId::Jpg | FormatId::Png | FormatId::Webp | FormatId::Avif => Strategy::Native,
            FormatId::JpegXl => Strategy::ExternalDelegate,
        }
    }

    /// Look up a request token (case-insensitive). `all` is not a format and returns `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        Self::ALL.into_iter().find(|format| format.token() == token)
    }

    /// Derive the source format from a file extension, case-insensitively.
    ///
    /// Returns `None` for anything outside [`SOURCE_EXTENSIONS`].
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(FormatId::Jpg),
            "png" => Some(FormatId::Png),
            "webp" => Some(FormatId::Webp),
            "avif" => Some(FormatId::Avif),
            "jxl" => Some(FormatId::JpegXl),
            _ => None,
        }
    }

    /// Turn the requested tokens into an ordered, duplicate-free format list.
    ///
    /// Any unknown token fails the whole request so nothing gets touched.
    pub fn parse_targets<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<FormatId>, ConvertError> {
        let mut formats = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            let expanded: Vec<FormatId> = if token.trim().eq_ignore_ascii_case(ALL_TOKEN) {
                Self::ALL.to_vec()
            } else {
                vec![Self::from_token(token)
                    .ok_or_else(|| ConvertError::InvalidFormat(token.to_string()))?]
            };

            for format in expanded {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }

        if formats.is_empty() {
            return Err(ConvertError::Validation("at least one target format is required".to_string()));
        }

        Ok(formats)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Whether a path carries one of the source extensions.
pub fn is_source_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
