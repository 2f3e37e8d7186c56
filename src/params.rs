//! # Parameter Resolver Module
//!
//! Traduce le scelte dell'utente (livello di qualità 0-5 e formato di output)
//! nei parametri concreti dell'encoder.
//!
//! ## Responsabilità:
//! - `QualityLevel`: livello discreto, 0 = file più piccolo, 5 = fedeltà massima
//! - `OutputFormat`: MP4, WebM, AVI, MKV, MOV con coppia fissa (codec, container)
//! - `resolve()`: funzione pura e totale, ogni combinazione livello × formato è valida
//!
//! ## Controllo qualità (CRF):
//! Il CRF è la modalità primaria di rate control e scende strettamente al crescere
//! del livello. Il bitrate è solo un suggerimento secondario, non decresce mai.
//!
//! | livello | CRF | bitrate hint |
//! |---------|-----|--------------|
//! | 0       | 40  | 500k         |
//! | 1       | 35  | 800k         |
//! | 2       | 30  | 1200k        |
//! | 3       | 26  | 2000k        |
//! | 4       | 23  | 3000k        |
//! | 5       | 18  | 5000k        |
//!
//! Le etichette leggibili non stanno qui: il resolver espone solo le chiavi
//! di traduzione (`MessageKey`).

use crate::error::CompressError;
use crate::locale::MessageKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// (CRF, bitrate hint in kbit/s) per quality level
const QUALITY_TABLE: [(u8, u32); 6] = [
    (40, 500),
    (35, 800),
    (30, 1200),
    (26, 2000),
    (23, 3000),
    (18, 5000),
];

/// Discrete quality level in [0, 5]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualityLevel(u8);

impl QualityLevel {
    pub const MIN: QualityLevel = QualityLevel(0);
    pub const MAX: QualityLevel = QualityLevel(5);

    pub fn new(level: u8) -> Result<Self, CompressError> {
        Self::try_from(level)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All levels in increasing order
    pub fn all() -> impl Iterator<Item = QualityLevel> {
        (Self::MIN.0..=Self::MAX.0).map(QualityLevel)
    }

    pub fn label_key(&self) -> MessageKey {
        MessageKey::QualityLevel(*self)
    }
}

impl Default for QualityLevel {
    fn default() -> Self {
        QualityLevel(2)
    }
}

impl TryFrom<u8> for QualityLevel {
    type Error = CompressError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if level > Self::MAX.0 {
            return Err(CompressError::Config(format!(
                "Quality level must be between 0 and 5, got {}",
                level
            )));
        }
        Ok(QualityLevel(level))
    }
}

impl From<QualityLevel> for u8 {
    fn from(level: QualityLevel) -> Self {
        level.0
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Avi,
    Mkv,
    Mov,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Mp4,
        OutputFormat::Webm,
        OutputFormat::Avi,
        OutputFormat::Mkv,
        OutputFormat::Mov,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Mov => "mov",
        }
    }

    /// (video codec, audio codec, container muxer)
    fn codecs(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Mp4 => ("libx264", "aac", "mp4"),
            Self::Webm => ("libvpx-vp9", "libopus", "webm"),
            Self::Avi => ("libx264", "libmp3lame", "avi"),
            Self::Mkv => ("libx264", "aac", "matroska"),
            Self::Mov => ("libx264", "aac", "mov"),
        }
    }

    pub fn label_key(&self) -> MessageKey {
        MessageKey::FormatOption(*self)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CompressError::Config(format!("Unsupported output format: {}", s)))
    }
}

/// Engine-ready parameter set for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeSpec {
    pub level: QualityLevel,
    pub format: OutputFormat,
    /// CRF-style quality factor, lower = better
    pub quality_factor: u8,
    /// Secondary bitrate hint in kbit/s
    pub bitrate_hint_kbps: u32,
    pub codec: &'static str,
    pub audio_codec: &'static str,
    pub container: &'static str,
}

impl EncodeSpec {
    pub fn bitrate_label(&self) -> String {
        format!("{}k", self.bitrate_hint_kbps)
    }

    pub fn extension(&self) -> &'static str {
        self.format.as_str()
    }

    pub fn is_vp9(&self) -> bool {
        self.codec == "libvpx-vp9"
    }
}

/// Resolve user selections into encoder parameters
pub fn resolve(level: QualityLevel, format: OutputFormat) -> EncodeSpec {
    let (quality_factor, bitrate_hint_kbps) = QUALITY_TABLE[level.0 as usize];
    let (codec, audio_codec, container) = format.codecs();

    EncodeSpec {
        level,
        format,
        quality_factor,
        bitrate_hint_kbps,
        codec,
        audio_codec,
        container,
    }
}
