//! # Converter Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `engine`: Conversione di un singolo file in tutti i formati richiesti
//! - `batch`: Scheduler sequenziale per le directory
//! - `overwrite`: Policy interattiva per i file di output esistenti
//! - `progress_tracker`: Gestione progress, statistiche e JSON unificata
//! - `path_resolver`: Logica di calcolo path centralizzata
//!
//! `Converter` è l'orchestratore: decide se la sorgente è un file o una
//! directory e possiede lo stato dell'intera esecuzione (policy di overwrite,
//! statistiche).

pub mod batch;
pub mod engine;
pub mod overwrite;
pub mod path_resolver;
pub mod progress_tracker;

pub use batch::BatchScheduler;
pub use engine::{ConversionEngine, ConversionOutcome, FailureKind, FileConversion, OutcomeStatus};
pub use overwrite::{DecisionSource, OverwriteArbiter, ScriptedDecisions, TerminalPrompt};
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;

use crate::{
    config::Config, error::ConvertError, external_encoder::ExternalEncoder,
    progress::{ConversionStats, ProgressManager},
};
use anyhow::Result;
use std::path::Path;
use std::time::Instant;

/// What a whole run produced.
#[derive(Debug)]
pub struct RunReport {
    pub conversions: Vec<FileConversion>,
    pub stats: ConversionStats,
    /// The operator chose quit
    pub aborted: bool,
    /// The operator answered "all" at some prompt
    pub overwrite_all: bool,
}

/// Orchestratore principale
pub struct Converter<E: ExternalEncoder> {
    engine: ConversionEngine<E>,
    arbiter: OverwriteArbiter,
    tracker: ProgressTracker,
}

impl<E: ExternalEncoder> Converter<E> {
    pub fn new(config: Config, encoder: E, decisions: Box<dyn DecisionSource>) -> Self {
        let tracker = ProgressTracker::new(config.json_output, ProgressManager::hidden());
        Self {
            engine: ConversionEngine::new(config, encoder),
            arbiter: OverwriteArbiter::new(decisions),
            tracker,
        }
    }

    /// Report through `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.tracker = ProgressTracker::new(self.engine.config().json_output, progress);
        self
    }

    /// Convert a single file or every image directly inside a directory.
    pub async fn run(&mut self, source: &Path) -> Result<RunReport> {
        let start_time = Instant::now();

        let conversions = if source.is_file() {
            self.tracker.start(source, self.engine.config(), 1);
            let conversion = self.engine.convert(source, &mut self.arbiter).await;
            self.tracker.handle_file_completion(&conversion);
            vec![conversion]
        } else if source.is_dir() {
            BatchScheduler::new(&self.engine)
                .process_directory(source, &mut self.arbiter, &mut self.tracker)
                .await?
        } else {
            return Err(ConvertError::InvalidSource(format!(
                "{} is neither a file nor a directory",
                source.display()
            ))
            .into());
        };

        let aborted = conversions.last().map(|c| c.aborted).unwrap_or(false);
        if let Some(last) = conversions.last().filter(|c| c.aborted) {
            self.tracker.handle_abort(&last.source);
        }

        self.tracker.finish(aborted, start_time.elapsed());

        Ok(RunReport {
            conversions,
            stats: self.tracker.stats().clone(),
            aborted,
            overwrite_all: self.arbiter.overwrite_all(),
        })
    }
}
