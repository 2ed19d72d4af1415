//! # Batch Scheduler
//!
//! Converte tutte le immagini di una directory, **una alla volta**.
//!
//! Ogni file viene completato (tutti i formati, tutti i prompt) prima di
//! passare al successivo: decode ed encode usano molta memoria e CPU, e un
//! solo file in lavorazione mantiene l'uso delle risorse prevedibile anche
//! su directory grandi. Un "quit" ferma la coda: i file non ancora
//! raggiunti non vengono toccati.

use crate::{
    converter::{
        engine::{ConversionEngine, FileConversion},
        overwrite::OverwriteArbiter,
        progress_tracker::ProgressTracker,
    },
    external_encoder::ExternalEncoder,
    file_manager::FileManager,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Drives the engine over a directory, one file at a time
pub struct BatchScheduler<'a, E: ExternalEncoder> {
    engine: &'a ConversionEngine<E>,
}

impl<'a, E: ExternalEncoder> BatchScheduler<'a, E> {
    pub fn new(engine: &'a ConversionEngine<E>) -> Self {
        Self { engine }
    }

    /// List the directory once and convert every source image in it.
    ///
    /// Only a failure to read the directory itself is an error.
    pub async fn process_directory(
        &self,
        dir: &Path,
        arbiter: &mut OverwriteArbiter,
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<FileConversion>> {
        let files = FileManager::find_image_files(dir)?;
        tracker.start(dir, self.engine.config(), files.len());

        if files.is_empty() {
            info!("No images found in {}", dir.display());
            return Ok(Vec::new());
        }

        Ok(self.process_files(&files, arbiter, tracker).await)
    }

    /// Convert `files` in order. Stops at the first file the operator aborted.
    pub async fn process_files(
        &self,
        files: &[PathBuf],
        arbiter: &mut OverwriteArbiter,
        tracker: &mut ProgressTracker,
    ) -> Vec<FileConversion> {
        let mut conversions = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            debug!("[{}/{}] {}", index + 1, files.len(), file.display());

            let conversion = self.engine.convert(file, arbiter).await;
            tracker.handle_file_completion(&conversion);

            let aborted = conversion.aborted;
            conversions.push(conversion);

            if aborted {
                debug!("Stopping batch, {} files not processed", files.len() - index - 1);
                break;
            }
        }

        conversions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::converter::engine::tests::{write_png, FakeEncoder};
    use crate::converter::overwrite::ScriptedDecisions;
    use crate::format::FormatId;
    use crate::progress::ProgressManager;
    use tempfile::TempDir;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(false, ProgressManager::hidden())
    }

    fn engine(formats: Vec<FormatId>) -> ConversionEngine<FakeEncoder> {
        ConversionEngine::new(
            Config {
                formats,
                ..Default::default()
            },
            FakeEncoder::default(),
        )
    }

    fn engine_into(formats: Vec<FormatId>, out_dir: &Path) -> ConversionEngine<FakeEncoder> {
        ConversionEngine::new(
            Config {
                formats,
                output_dir: Some(out_dir.to_path_buf()),
                ..Default::default()
            },
            FakeEncoder::default(),
        )
    }

    #[tokio::test]
    async fn test_only_images_processed_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["c.png", "a.png", "b.png"] {
            write_png(&root.join(name), 8, 8);
        }
        std::fs::write(root.join("readme.md"), b"# hi").unwrap();
        std::fs::write(root.join("data.csv"), b"1,2").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        write_png(&root.join("sub").join("deep.png"), 8, 8);

        let engine = engine(vec![FormatId::Jpg]);
        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::default()));
        let mut tracker = tracker();

        let conversions = BatchScheduler::new(&engine)
            .process_directory(root, &mut arbiter, &mut tracker)
            .await
            .unwrap();

        let order: Vec<_> = conversions
            .iter()
            .map(|c| c.source.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(order, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(tracker.stats().files_processed, 3);
        assert_eq!(tracker.stats().outputs_written, 3);
        assert!(!root.join("sub").join("deep.jpg").exists());
        assert!(!root.join("readme.jpg").exists());
    }

    #[tokio::test]
    async fn test_all_answer_covers_later_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("in");
        let out = temp_dir.path().join("out");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&out).unwrap();
        for name in ["a", "b"] {
            write_png(&root.join(format!("{}.png", name)), 8, 8);
            std::fs::write(out.join(format!("{}.webp", name)), b"old").unwrap();
        }

        let engine = engine_into(vec![FormatId::Webp], &out);
        let script = ScriptedDecisions::new(["all"]);
        let mut arbiter = OverwriteArbiter::new(Box::new(script.clone()));
        let mut tracker = tracker();

        let conversions = BatchScheduler::new(&engine)
            .process_directory(&root, &mut arbiter, &mut tracker)
            .await
            .unwrap();

        assert_eq!(script.asked(), vec![out.join("a.webp")]);
        assert_eq!(conversions.len(), 2);
        assert!(conversions.iter().all(|c| c.outcomes[0].is_written()));
        assert_ne!(std::fs::read(out.join("b.webp")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_quit_leaves_later_files_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("in");
        let out = temp_dir.path().join("out");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&out).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_png(&root.join(name), 8, 8);
        }
        std::fs::write(out.join("b.jpg"), b"old").unwrap();

        let engine = engine_into(vec![FormatId::Jpg], &out);
        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::new(["q"])));
        let mut tracker = tracker();

        let conversions = BatchScheduler::new(&engine)
            .process_directory(&root, &mut arbiter, &mut tracker)
            .await
            .unwrap();

        assert_eq!(conversions.len(), 2);
        assert!(conversions[1].aborted);
        assert!(out.join("a.jpg").exists());
        assert_eq!(std::fs::read(out.join("b.jpg")).unwrap(), b"old");
        assert!(!out.join("c.jpg").exists());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("a.png"), b"garbage").unwrap();
        write_png(&root.join("b.png"), 8, 8);

        let engine = engine(vec![FormatId::Jpg]);
        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::default()));
        let mut tracker = tracker();

        BatchScheduler::new(&engine)
            .process_directory(root, &mut arbiter, &mut tracker)
            .await
            .unwrap();

        assert_eq!(tracker.stats().outputs_failed, 1);
        assert_eq!(tracker.stats().outputs_written, 1);
        assert!(root.join("b.jpg").exists());
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(vec![FormatId::Jpg]);
        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::default()));
        let mut tracker = tracker();

        let result = BatchScheduler::new(&engine)
            .process_directory(&temp_dir.path().join("missing"), &mut arbiter, &mut tracker)
            .await;
        assert!(result.is_err());
    }
}
