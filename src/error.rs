//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ConvertError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/codifica immagini
//! - `InvalidFormat`: Token di formato richiesto non riconosciuto
//! - `Validation`: Errori di validazione configurazione
//! - `UnsupportedFormat`: Estensione sorgente non supportata
//! - `InvalidSource`: Sorgente né file né directory
//! - `NoNativeEncoder`: Formato senza encoder in-process
//! - `ExternalEncoder`: Encoder esterno terminato con errore
//! - `MissingDependency`: Encoder esterno non avviabile
//!
//! ## Esempio:
//! ```rust,ignore
//! if FormatId::from_token(token).is_none() {
//!     return Err(ConvertError::InvalidFormat(token.to_string()));
//! }
//! ```

use crate::format::FormatId;

/// Custom error types for image conversion
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid format '{0}'. Valid formats: jpg, png, webp, avif, jpegxl, all")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Validation(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("No native encoder for {0}")]
    NoNativeEncoder(FormatId),

    #[error("{tool} exited with {}", .code.map(|c| format!("status {}", c)).unwrap_or_else(|| "no status (killed by signal)".to_string()))]
    ExternalEncoder { tool: String, code: Option<i32> },

    #[error("Dependency missing: {0}")]
    MissingDependency(String),
}
