//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `quality_level`: livello di qualità 0-5 (default: 2, bilanciato)
//! - `output_format`: mp4, webm, avi, mkv, mov (default: mp4)
//! - `output_path`: directory di output (default: None = accanto all'originale)
//! - `locale`: lingua dei messaggi (default: en-US, fallback sempre en-US)
//! - `ffmpeg_path`: binario ffmpeg esplicito (default: bundled o di sistema)
//! - `force_mobile`: tratta l'host come dispositivo mobile (default: false)
//! - `json_output`: eventi JSON su stdout al posto dello spinner (default: false)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     quality_level: QualityLevel::new(4)?,
//!     output_format: OutputFormat::Webm,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::locale::Locale;
use crate::params::{OutputFormat, QualityLevel};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub quality_level: QualityLevel,
    pub output_format: OutputFormat,
    /// Output directory for compressed files (None = next to the input)
    pub output_path: Option<PathBuf>,
    pub locale: Locale,
    pub ffmpeg_path: Option<PathBuf>,
    pub force_mobile: bool,
    pub json_output: bool,
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if let Some(ref output_path) = self.output_path {
            if !output_path.exists() {
                return Err(anyhow::anyhow!("Output path does not exist: {}", output_path.display()));
            }
            if !output_path.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_path.display()));
            }
        }

        if let Some(ref ffmpeg_path) = self.ffmpeg_path {
            if !ffmpeg_path.is_file() {
                return Err(anyhow::anyhow!("ffmpeg binary not found: {}", ffmpeg_path.display()));
            }
        }

        Ok(())
    }

    /// Default config location: `~/.panda-compress/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".panda-compress").join("config.json"))
    }

    /// Load configuration from file, defaults if it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
