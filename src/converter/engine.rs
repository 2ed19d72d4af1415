//! # Conversion Engine
//!
//! Converte un singolo file sorgente in tutti i formati richiesti.
//!
//! ## Flusso per file:
//! 1. Classifica il sorgente (estensione non supportata = warning, nessun decode)
//! 2. Decode una sola volta
//! 3. Trasformazioni applicate una sola volta, condivise da tutti i formati
//! 4. Per ogni formato, nell'ordine richiesto:
//!    - calcola il path di output
//!    - chiede il permesso all'`OverwriteArbiter`
//!    - nativo: encode in memoria + scrittura atomica
//!    - esterno: PNG intermedio + encoder esterno, intermedio rimosso solo in caso di successo
//!
//! Gli errori restano confinati alla coppia (file, formato) che li ha prodotti.

use crate::{
    codec::{self, EncodeOptions},
    config::Config,
    converter::{
        overwrite::{OverwriteArbiter, WritePermission},
        path_resolver::PathResolver,
    },
    error::ConvertError,
    external_encoder::ExternalEncoder,
    file_manager::FileManager,
    format::{FormatId, Strategy},
    transform,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Why a single (file, format) conversion did not produce an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Extension not in the source allow-list
    UnsupportedSource,
    /// Source could not be read
    Source,
    Decode,
    Encode,
    Write,
    /// External encoder exited non-zero or could not be launched
    ExternalEncoder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Written { bytes: u64 },
    /// The operator kept the existing file
    Declined,
    Failed { kind: FailureKind, message: String },
}

/// Result for one (source, format) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub format: FormatId,
    pub output_path: PathBuf,
    pub status: OutcomeStatus,
}

impl ConversionOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, OutcomeStatus::Written { .. })
    }

    pub fn is_declined(&self) -> bool {
        self.status == OutcomeStatus::Declined
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            OutcomeStatus::Failed { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        match self.status {
            OutcomeStatus::Written { bytes } => bytes,
            _ => 0,
        }
    }
}

/// Everything that happened to one source file.
#[derive(Debug, Clone)]
pub struct FileConversion {
    pub source: PathBuf,
    /// One entry per format reached, in request order
    pub outcomes: Vec<ConversionOutcome>,
    /// The operator chose quit while this file was being processed
    pub aborted: bool,
}

impl FileConversion {
    fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            outcomes: Vec::new(),
            aborted: false,
        }
    }
}

/// Converts one source file into every requested format.
pub struct ConversionEngine<E: ExternalEncoder> {
    config: Config,
    encoder: E,
}

impl<E: ExternalEncoder> ConversionEngine<E> {
    pub fn new(config: Config, encoder: E) -> Self {
        Self { config, encoder }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn encode_options(&self) -> EncodeOptions {
        self.config.encode_options()
    }

    fn output_dir(&self) -> Option<&Path> {
        self.config.output_dir.as_deref()
    }

    /// Convert `source` into every configured format.
    ///
    /// Never fails as a whole: problems are recorded per format in the
    /// returned outcomes.
    pub async fn convert(&self, source: &Path, arbiter: &mut OverwriteArbiter) -> FileConversion {
        let mut conversion = FileConversion::new(source);

        let Some(source_format) = FormatId::classify(source) else {
            warn!("Skipping unsupported file: {}", source.display());
            conversion.outcomes = self.fail_all(
                source,
                FailureKind::UnsupportedSource,
                &ConvertError::UnsupportedFormat(source.display().to_string()).to_string(),
            );
            return conversion;
        };

        debug!("Converting {} ({})", source.display(), source_format);

        let bytes = match tokio::fs::read(source).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read {}: {}", source.display(), e);
                conversion.outcomes = self.fail_all(source, FailureKind::Source, &e.to_string());
                return conversion;
            }
        };

        let decoded = match codec::decode(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("Failed to decode {}: {}", source.display(), e);
                conversion.outcomes = self.fail_all(source, FailureKind::Decode, &e.to_string());
                return conversion;
            }
        };
        drop(bytes);

        let (width, height) = decoded.dimensions();
        debug!("Decoded {}x{}, orientation {:?}", width, height, decoded.orientation);

        let image = transform::transform(decoded, &self.config.transform);

        for &format in &self.config.formats {
            let output_path = match PathResolver::output_path(source, self.output_dir(), format) {
                Ok(path) => path,
                Err(e) => {
                    conversion.outcomes.push(Self::failed(
                        source,
                        format,
                        source.to_path_buf(),
                        FailureKind::Write,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            match arbiter.check_write(&output_path) {
                WritePermission::Allowed => {}
                WritePermission::Denied => {
                    info!("Skipped {} (kept existing file)", output_path.display());
                    conversion.outcomes.push(ConversionOutcome {
                        source: source.to_path_buf(),
                        format,
                        output_path,
                        status: OutcomeStatus::Declined,
                    });
                    continue;
                }
                WritePermission::Abort => {
                    conversion.aborted = true;
                    return conversion;
                }
            }

            let outcome = match format.strategy() {
                Strategy::Native => self.write_native(source, &image, format, output_path),
                Strategy::ExternalDelegate => self.write_external(source, &image, format, output_path).await,
            };
            conversion.outcomes.push(outcome);
        }

        conversion
    }

    /// Encode in-process and write atomically.
    fn write_native(
        &self,
        source: &Path,
        image: &DynamicImage,
        format: FormatId,
        output_path: PathBuf,
    ) -> ConversionOutcome {
        let bytes = match codec::encode(image, format, &self.encode_options()) {
            Ok(bytes) => bytes,
            Err(e) => return Self::failed(source, format, output_path, FailureKind::Encode, e.to_string()),
        };

        if let Err(e) = FileManager::write_atomic(&output_path, &bytes) {
            return Self::failed(source, format, output_path, FailureKind::Write, e.to_string());
        }

        debug!(
            "Converted {} -> {} ({})",
            source.display(),
            output_path.display(),
            FileManager::format_size(bytes.len() as u64)
        );

        ConversionOutcome {
            source: source.to_path_buf(),
            format,
            output_path,
            status: OutcomeStatus::Written { bytes: bytes.len() as u64 },
        }
    }

    /// Write a lossless intermediate and hand it to the external encoder.
    async fn write_external(
        &self,
        source: &Path,
        image: &DynamicImage,
        format: FormatId,
        output_path: PathBuf,
    ) -> ConversionOutcome {
        let intermediate = match PathResolver::intermediate_path(&output_path) {
            Ok(path) => path,
            Err(e) => return Self::failed(source, format, output_path, FailureKind::Write, e.to_string()),
        };

        let png = match codec::encode(image, FormatId::Png, &self.encode_options()) {
            Ok(bytes) => bytes,
            Err(e) => return Self::failed(source, format, output_path, FailureKind::Encode, e.to_string()),
        };

        if let Err(e) = FileManager::write_atomic(&intermediate, &png) {
            return Self::failed(source, format, output_path, FailureKind::Write, e.to_string());
        }

        debug!("Intermediate written: {}", intermediate.display());

        let status = match self
            .encoder
            .encode(&intermediate, &output_path, self.config.verbose)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                debug!("Intermediate kept: {}", intermediate.display());
                let e = ConvertError::MissingDependency(format!(
                    "failed to launch {}: {}",
                    self.encoder.name(),
                    e
                ));
                return Self::failed(source, format, output_path, FailureKind::ExternalEncoder, e.to_string());
            }
        };

        if !status.success() {
            debug!("Intermediate kept: {}", intermediate.display());
            let e = ConvertError::ExternalEncoder {
                tool: self.encoder.name().to_string(),
                code: status.code,
            };
            return Self::failed(source, format, output_path, FailureKind::ExternalEncoder, e.to_string());
        }

        if let Err(e) = tokio::fs::remove_file(&intermediate).await {
            warn!("Could not remove intermediate {}: {}", intermediate.display(), e);
        }

        let bytes = tokio::fs::metadata(&output_path)
            .await
            .map(|metadata| metadata.len())
            .unwrap_or(0);

        info!(
            "🎯 {} finished: {} -> {}",
            self.encoder.name(),
            source.display(),
            output_path.display()
        );

        ConversionOutcome {
            source: source.to_path_buf(),
            format,
            output_path,
            status: OutcomeStatus::Written { bytes },
        }
    }

    /// Same failure for every configured format.
    fn fail_all(&self, source: &Path, kind: FailureKind, message: &str) -> Vec<ConversionOutcome> {
        self.config
            .formats
            .iter()
            .map(|&format| {
                let output_path = PathResolver::output_path(source, self.output_dir(), format)
                    .unwrap_or_else(|_| source.to_path_buf());
                ConversionOutcome {
                    source: source.to_path_buf(),
                    format,
                    output_path,
                    status: OutcomeStatus::Failed {
                        kind,
                        message: message.to_string(),
                    },
                }
            })
            .collect()
    }

    fn failed(
        source: &Path,
        format: FormatId,
        output_path: PathBuf,
        kind: FailureKind,
        message: String,
    ) -> ConversionOutcome {
        error!("❌ {} -> {}: {}", source.display(), format, message);
        ConversionOutcome {
            source: source.to_path_buf(),
            format,
            output_path,
            status: OutcomeStatus::Failed { kind, message },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::converter::overwrite::ScriptedDecisions;
    use crate::external_encoder::EncoderStatus;
    use crate::transform::TransformSpec;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use image::{GenericImageView, Rgb, RgbImage};
    use sha2::{Digest, Sha256};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Copies the intermediate to the output and records each call.
    #[derive(Clone, Default)]
    pub(crate) struct FakeEncoder {
        pub exit_code: i32,
        pub calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    }

    impl FakeEncoder {
        pub fn failing(exit_code: i32) -> Self {
            Self {
                exit_code,
                ..Default::default()
            }
        }
    }

    impl ExternalEncoder for FakeEncoder {
        fn name(&self) -> &str {
            "fake-cjxl"
        }

        fn encode<'a>(
            &'a self,
            input: &'a Path,
            output: &'a Path,
            _verbose: bool,
        ) -> BoxFuture<'a, std::io::Result<EncoderStatus>> {
            async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((input.to_path_buf(), output.to_path_buf()));
                if self.exit_code == 0 {
                    tokio::fs::copy(input, output).await?;
                }
                Ok(EncoderStatus { code: Some(self.exit_code) })
            }
            .boxed()
        }
    }

    struct UnlaunchableEncoder;

    impl ExternalEncoder for UnlaunchableEncoder {
        fn name(&self) -> &str {
            "missing-cjxl"
        }

        fn encode<'a>(
            &'a self,
            _input: &'a Path,
            _output: &'a Path,
            _verbose: bool,
        ) -> BoxFuture<'a, std::io::Result<EncoderStatus>> {
            async { Err::<EncoderStatus, _>(std::io::Error::new(std::io::ErrorKind::NotFound, "not found")) }.boxed()
        }
    }

    pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        image.save(path).unwrap();
    }

    fn sha256(path: &Path) -> String {
        hex::encode(Sha256::digest(std::fs::read(path).unwrap()))
    }

    fn config(formats: Vec<FormatId>) -> Config {
        Config {
            formats,
            ..Default::default()
        }
    }

    fn arbiter(answers: &[&str]) -> (OverwriteArbiter, ScriptedDecisions) {
        let script = ScriptedDecisions::new(answers.iter().copied());
        (OverwriteArbiter::new(Box::new(script.clone())), script)
    }

    #[tokio::test]
    async fn test_native_formats_in_request_order() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 40, 20);

        let engine = ConversionEngine::new(
            config(vec![FormatId::Webp, FormatId::Jpg]),
            FakeEncoder::default(),
        );
        let (mut arbiter, script) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert!(!result.aborted);
        let formats: Vec<_> = result.outcomes.iter().map(|o| o.format).collect();
        assert_eq!(formats, vec![FormatId::Webp, FormatId::Jpg]);
        assert!(result.outcomes.iter().all(|o| o.is_written()));
        assert!(temp_dir.path().join("photo.webp").exists());
        assert!(temp_dir.path().join("photo.jpg").exists());
        assert!(script.asked().is_empty());
    }

    #[tokio::test]
    async fn test_transform_shared_by_all_formats() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let source = temp_dir.path().join("wide.png");
        write_png(&source, 100, 50);

        let config = Config {
            formats: vec![FormatId::Png, FormatId::Webp],
            output_dir: Some(out_dir.clone()),
            transform: TransformSpec {
                rotate_degrees: Some(90),
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = ConversionEngine::new(config, FakeEncoder::default());
        let (mut arbiter, _) = arbiter(&[]);
        engine.convert(&source, &mut arbiter).await;

        for name in ["wide.png", "wide.webp"] {
            let image = image::open(out_dir.join(name)).unwrap();
            assert_eq!(image.dimensions(), (50, 100));
        }
    }

    #[tokio::test]
    async fn test_declined_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);
        let existing = temp_dir.path().join("photo.jpg");
        std::fs::write(&existing, b"precious").unwrap();
        let before = sha256(&existing);

        let engine = ConversionEngine::new(
            config(vec![FormatId::Jpg, FormatId::Webp]),
            FakeEncoder::default(),
        );
        let (mut arbiter, script) = arbiter(&["n"]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(sha256(&existing), before);
        assert!(result.outcomes[0].is_declined());
        assert!(result.outcomes[1].is_written());
        assert_eq!(script.asked(), vec![existing]);
    }

    #[tokio::test]
    async fn test_quit_stops_remaining_formats() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);
        std::fs::write(temp_dir.path().join("photo.webp"), b"old").unwrap();

        let engine = ConversionEngine::new(
            config(vec![FormatId::Jpg, FormatId::Webp, FormatId::Avif]),
            FakeEncoder::default(),
        );
        let (mut arbiter, _) = arbiter(&["q"]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert!(result.aborted);
        assert_eq!(result.outcomes.len(), 1);
        assert!(temp_dir.path().join("photo.jpg").exists());
        assert!(!temp_dir.path().join("photo.avif").exists());
        assert_eq!(std::fs::read(temp_dir.path().join("photo.webp")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_unsupported_source_fails_every_format() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("notes.txt");
        std::fs::write(&source, b"not an image").unwrap();

        let engine = ConversionEngine::new(
            config(vec![FormatId::Png, FormatId::Jpg]),
            FakeEncoder::default(),
        );
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(result.outcomes.len(), 2);
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.failure_kind() == Some(FailureKind::UnsupportedSource)));
        assert!(!temp_dir.path().join("notes.png").exists());
    }

    #[tokio::test]
    async fn test_corrupt_source_is_decode_failure() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("broken.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let engine = ConversionEngine::new(config(vec![FormatId::Jpg]), FakeEncoder::default());
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(result.outcomes[0].failure_kind(), Some(FailureKind::Decode));
        assert!(!temp_dir.path().join("broken.jpg").exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_source_failure() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("gone.png");

        let engine = ConversionEngine::new(config(vec![FormatId::Jpg]), FakeEncoder::default());
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(result.outcomes[0].failure_kind(), Some(FailureKind::Source));
    }

    #[tokio::test]
    async fn test_external_success_removes_intermediate() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);

        let encoder = FakeEncoder::default();
        let engine = ConversionEngine::new(config(vec![FormatId::JpegXl]), encoder.clone());
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        let final_path = temp_dir.path().join("photo.jxl");
        let intermediate = temp_dir.path().join("photo_temp.png");
        assert!(result.outcomes[0].is_written());
        assert_eq!(result.outcomes[0].output_path, final_path);
        assert!(final_path.exists());
        assert!(!intermediate.exists());
        assert_eq!(
            encoder.calls.lock().unwrap().clone(),
            vec![(intermediate, final_path)]
        );
    }

    #[tokio::test]
    async fn test_external_failure_is_local_and_keeps_intermediate() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);

        let engine = ConversionEngine::new(
            config(vec![FormatId::JpegXl, FormatId::Webp]),
            FakeEncoder::failing(1),
        );
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(result.outcomes[0].failure_kind(), Some(FailureKind::ExternalEncoder));
        assert!(temp_dir.path().join("photo_temp.png").exists());
        assert!(!temp_dir.path().join("photo.jxl").exists());
        // sibling format unaffected
        assert!(result.outcomes[1].is_written());
    }

    #[tokio::test]
    async fn test_external_launch_failure() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);

        let engine = ConversionEngine::new(config(vec![FormatId::JpegXl]), UnlaunchableEncoder);
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        match &result.outcomes[0].status {
            OutcomeStatus::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::ExternalEncoder);
                assert!(message.contains("missing-cjxl"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_local() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("photo.png");
        write_png(&source, 10, 10);

        let config = Config {
            formats: vec![FormatId::Jpg],
            output_dir: Some(temp_dir.path().join("missing").join("dir")),
            ..Default::default()
        };
        let engine = ConversionEngine::new(config, FakeEncoder::default());
        let (mut arbiter, _) = arbiter(&[]);
        let result = engine.convert(&source, &mut arbiter).await;

        assert_eq!(result.outcomes[0].failure_kind(), Some(FailureKind::Write));
    }
}
