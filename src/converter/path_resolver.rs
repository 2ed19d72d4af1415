//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output.
//! Evita duplicazione tra ConversionEngine e BatchScheduler.

use crate::error::ConvertError;
use crate::format::FormatId;
use std::path::{Path, PathBuf};

/// Suffix appended to the base name of the lossless intermediate.
const INTERMEDIATE_SUFFIX: &str = "_temp";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// `<output_dir or source dir>/<stem>.<extension>`
    pub fn output_path(
        source: &Path,
        output_dir: Option<&Path>,
        format: FormatId,
    ) -> Result<PathBuf, ConvertError> {
        let stem = Self::base_name(source)?;
        let filename = format!("{}.{}", stem, format.extension());
        Ok(Self::target_dir(source, output_dir).join(filename))
    }

    /// Lossless intermediate handed to the external encoder: `<dir>/<stem>_temp.png`
    pub fn intermediate_path(final_path: &Path) -> Result<PathBuf, ConvertError> {
        let stem = Self::base_name(final_path)?;
        let filename = format!("{}{}.{}", stem, INTERMEDIATE_SUFFIX, FormatId::Png.extension());
        Ok(final_path.with_file_name(filename))
    }

    fn base_name(path: &Path) -> Result<String, ConvertError> {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::InvalidSource(format!("Invalid file name: {}", path.display())))
    }

    fn target_dir(source: &Path, output_dir: Option<&Path>) -> PathBuf {
        match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }
}
