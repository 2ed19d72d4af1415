//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di conversione.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per le conversioni di directory
//! - Tracking statistiche (file processati, output scritti, rifiutati, falliti)
//! - Report finale con statistiche aggregate
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale
//! - `ConversionStats`: Traccia statistiche cumulative
//!
//! ## Statistiche tracciate:
//! - **files_processed**: File sorgente elaborati
//! - **outputs_written**: Output scritti con successo
//! - **outputs_declined**: Output esistenti mantenuti su richiesta dell'utente
//! - **outputs_failed**: Coppie (file, formato) fallite
//! - **bytes_written**: Byte totali scritti
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 12/20 (60%) photo.jpg
//! ```
//!
//! La progress bar è nascosta in modalità verbose e JSON, dove l'output
//! riga per riga ha la precedenza.

use crate::converter::engine::FileConversion;
use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for directory conversions
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A manager that never draws anything
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Known only once the directory has been listed
    pub fn set_length(&self, total_files: u64) {
        self.bar.set_length(total_files);
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Handle to the underlying bar, e.g. to suspend it around a prompt
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }
}

/// Statistics tracker for conversion results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub files_processed: usize,
    pub outputs_written: usize,
    pub outputs_declined: usize,
    pub outputs_failed: usize,
    pub bytes_written: u64,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, conversion: &FileConversion) {
        self.files_processed += 1;

        for outcome in &conversion.outcomes {
            if outcome.is_written() {
                self.outputs_written += 1;
                self.bytes_written += outcome.bytes_written();
            } else if outcome.is_declined() {
                self.outputs_declined += 1;
            } else if outcome.is_failed() {
                self.outputs_failed += 1;
            }
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Written: {} | Kept existing: {} | Errors: {} | Total written: {}",
            self.files_processed,
            self.outputs_written,
            self.outputs_declined,
            self.outputs_failed,
            FileManager::format_size(self.bytes_written),
        )
    }
}
