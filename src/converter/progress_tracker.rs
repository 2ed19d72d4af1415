//! # Progress Tracking Module
//!
//! Unifica ProgressManager, ConversionStats e output JSON in un singolo tracker.
//! La pipeline è sequenziale, quindi nessun lock: il tracker vive sul thread di controllo.

use crate::{
    config::Config,
    converter::engine::FileConversion,
    json_output::JsonMessage,
    progress::{ConversionStats, ProgressManager},
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Tracker progress unificato
pub struct ProgressTracker {
    json_output: bool,
    progress: ProgressManager,
    stats: ConversionStats,
}

impl ProgressTracker {
    /// Crea un nuovo tracker
    pub fn new(json_output: bool, progress: ProgressManager) -> Self {
        Self {
            json_output,
            progress,
            stats: ConversionStats::new(),
        }
    }

    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// Annuncia l'inizio della conversione
    pub fn start(&self, source: &Path, config: &Config, total_files: usize) {
        self.progress.set_length(total_files as u64);

        if self.json_output {
            JsonMessage::start(
                source.to_path_buf(),
                config.output_dir.clone(),
                config.formats.clone(),
                total_files,
            )
            .emit();
            return;
        }

        let formats: Vec<&str> = config.formats.iter().map(|f| f.token()).collect();
        info!("Converting {} to: {}", source.display(), formats.join(", "));
        if let Some(ref output_dir) = config.output_dir {
            info!("Output directory: {}", output_dir.display());
        }
        info!("Found {} image files to process", total_files);
    }

    /// Aggiorna statistiche, progress bar ed eventi JSON
    pub fn handle_file_completion(&mut self, conversion: &FileConversion) {
        self.stats.record(conversion);

        if self.json_output {
            for outcome in &conversion.outcomes {
                JsonMessage::from(outcome).emit();
            }
        }

        let name = conversion
            .source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        self.progress.update(&name);
    }

    /// L'utente ha scelto "quit"
    pub fn handle_abort(&self, source: &Path) {
        if self.json_output {
            JsonMessage::Aborted {
                source: source.to_path_buf(),
            }
            .emit();
        }
        // Shown even when RUST_LOG hides info
        warn!("👋 Conversion aborted by user. Goodbye!");
    }

    /// Finalizza progress bar e stampa il riepilogo
    pub fn finish(&self, aborted: bool, elapsed: Duration) {
        let summary = self.stats.format_summary();
        self.progress.finish(&summary);

        if self.json_output {
            JsonMessage::complete(&self.stats, aborted, elapsed.as_secs_f64()).emit();
        } else {
            info!("{}", summary);
            info!("Completed in {:.2}s", elapsed.as_secs_f64());
        }
    }
}
