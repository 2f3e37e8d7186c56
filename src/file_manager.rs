//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file fuori dal core di compressione.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file video in una directory
//! - Calcolo del path di output (`<stem>_compressed.<ext>`)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati riconosciuti in input:
//! MP4, MOV, AVI, MKV, WebM, M4V
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_video_files(Path::new("/path/to/videos"))?;
//! let output = FileManager::output_path(&files[0], OutputFormat::Webm, None);
//! ```

use crate::params::OutputFormat;
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all video files below a directory, sorted for a stable order
    pub fn find_video_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| Self::is_video(p) && !Self::is_compressed_output(p))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v")
        } else {
            false
        }
    }

    /// Files we produced ourselves are never picked up again
    fn is_compressed_output(path: &Path) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().ends_with("_compressed"))
            .unwrap_or(false)
    }

    /// Output path for a compressed copy of `input`
    pub fn output_path(input: &Path, format: OutputFormat, output_dir: Option<&Path>) -> PathBuf {
        let file_stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let filename = format!("{}_compressed.{}", file_stem, format.as_str());

        match output_dir {
            Some(dir) => dir.join(filename),
            None => input.with_file_name(filename),
        }
    }

    /// Size in megabytes with two decimals, as shown in progress and report messages
    pub fn size_in_mb(size: u64) -> String {
        format!("{:.2}", size as f64 / (1024.0 * 1024.0))
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
