//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione di una conversione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri della conversione
//! - Fornisce validazione dei parametri prima di toccare qualsiasi file
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `formats`: Formati di destinazione, nell'ordine richiesto
//! - `output_dir`: Directory di output (default: None = accanto al file sorgente)
//! - `transform`: Resize, rotazione, grayscale, sRGB
//! - `quality`: Qualità JPEG/AVIF (1-100, default: 80)
//! - `verbose`: Log dettagliati e output dell'encoder esterno
//! - `json_output`: Eventi JSON su stdout per uso programmatico
//!
//! ## Validazione:
//! - Almeno un formato di destinazione
//! - `quality` tra 1 e 100
//! - Dimensioni di resize positive
//! - Rotazione multipla di 90 gradi
//!
//! Nessuna configurazione viene letta o salvata su disco tra un'esecuzione e l'altra.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     formats: vec![FormatId::Webp, FormatId::Avif],
//!     quality: 85,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::codec::EncodeOptions;
use crate::error::ConvertError;
use crate::format::FormatId;
use crate::transform::TransformSpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target formats, in the order they were requested
    pub formats: Vec<FormatId>,
    /// Output directory (None = next to each source file)
    pub output_dir: Option<PathBuf>,
    /// Transform applied once per source file
    pub transform: TransformSpec,
    /// JPEG/AVIF quality (1-100)
    pub quality: u8,
    /// Verbose logging and external encoder output
    pub verbose: bool,
    /// Output outcomes as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formats: vec![FormatId::Png],
            output_dir: None,
            transform: TransformSpec::default(),
            quality: 80,
            verbose: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(anyhow::anyhow!("At least one target format is required"));
        }

        if self.quality == 0 || self.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 1 and 100"));
        }

        self.transform.validate()?;

        // Validate output path if it already exists
        if let Some(ref output_dir) = self.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_dir.display()));
            }
        }

        Ok(())
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions { quality: self.quality }
    }
}

/// Convert a raw resize dimension from the command line.
///
/// Zero and negative values are configuration errors.
pub fn parse_dimension(name: &str, value: Option<i64>) -> Result<Option<u32>, ConvertError> {
    match value {
        None => Ok(None),
        Some(v) if v <= 0 => Err(ConvertError::Validation(format!(
            "{} must be a positive integer, got {}",
            name, v
        ))),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| ConvertError::Validation(format!("{} is too large: {}", name, v))),
    }
}
