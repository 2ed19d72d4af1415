//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery **non ricorsiva** di immagini sorgente in una directory
//! - Scrittura sicura dei file di output (temp file + rename atomico)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati sorgente:
//! - JPG, JPEG, PNG, WebP, AVIF, JXL (vedi `format::SOURCE_EXTENSIONS`)
//!
//! ## Sicurezza operazioni:
//! - I byte vengono scritti in un file temporaneo nella stessa directory
//! - Solo a scrittura completata il file temporaneo sostituisce l'output
//! - In caso di errore il file temporaneo viene rimosso, l'output non viene toccato
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_image_files(Path::new("/path/to/photos"))?;
//! for file in files {
//!     // convert image
//! }
//! ```

use crate::format;
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find the source images directly inside `dir`, sorted by file name.
    ///
    /// Subdirectories are not descended into.
    pub fn find_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;
            // path().is_file() follows symlinks, file_type() does not
            if entry.path().is_file() && format::is_source_image(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Write `bytes` to `path` without ever leaving a partial file behind.
    pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e.error))?;
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
