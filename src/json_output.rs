//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico (`--json`).
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout
//! - I log restano su stderr, quindi stdout è sempre parsabile
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio conversione (sorgente, formati, numero di file)
//! - `outcome`: Risultato di una coppia (file, formato)
//! - `aborted`: L'utente ha scelto "quit"
//! - `complete`: Fine processo con statistiche finali
//! - `error`: Errore fatale

use crate::converter::engine::{ConversionOutcome, FailureKind, OutcomeStatus};
use crate::format::FormatId;
use crate::progress::ConversionStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio della conversione
    #[serde(rename = "start")]
    Start {
        source: PathBuf,
        output_dir: Option<PathBuf>,
        formats: Vec<FormatId>,
        total_files: usize,
    },

    /// Risultato di un singolo formato
    #[serde(rename = "outcome")]
    Outcome {
        source: PathBuf,
        format: FormatId,
        output_path: PathBuf,
        /// "written", "declined" o "failed"
        status: String,
        bytes: Option<u64>,
        kind: Option<FailureKind>,
        error: Option<String>,
    },

    /// Conversione interrotta dall'utente
    #[serde(rename = "aborted")]
    Aborted { source: PathBuf },

    /// Processo completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        outputs_written: usize,
        outputs_declined: usize,
        outputs_failed: usize,
        bytes_written: u64,
        aborted: bool,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(
        source: PathBuf,
        output_dir: Option<PathBuf>,
        formats: Vec<FormatId>,
        total_files: usize,
    ) -> Self {
        Self::Start {
            source,
            output_dir,
            formats,
            total_files,
        }
    }

    /// Crea un messaggio di completamento
    pub fn complete(stats: &ConversionStats, aborted: bool, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            outputs_written: stats.outputs_written,
            outputs_declined: stats.outputs_declined,
            outputs_failed: stats.outputs_failed,
            bytes_written: stats.bytes_written,
            aborted,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&ConversionOutcome> for JsonMessage {
    fn from(outcome: &ConversionOutcome) -> Self {
        let (status, bytes, kind, error) = match &outcome.status {
            OutcomeStatus::Written { bytes } => ("written", Some(*bytes), None, None),
            OutcomeStatus::Declined => ("declined", None, None, None),
            OutcomeStatus::Failed { kind, message } => ("failed", None, Some(*kind), Some(message.clone())),
        };

        Self::Outcome {
            source: outcome.source.clone(),
            format: outcome.format,
            output_path: outcome.output_path.clone(),
            status: status.to_string(),
            bytes,
            kind,
            error,
        }
    }
}
