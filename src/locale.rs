//! # Localization Module
//!
//! Il core non produce mai testo: fornisce solo una chiave (`MessageKey`) e un
//! contesto di interpolazione. Il rendering è delegato a un `Localizer`.
//!
//! ## Responsabilità:
//! - `MessageKey`: tutte le chiavi di messaggio usate dal core
//! - `LocalizedMessage`: chiave + contesto (`{size}`, `{label}`, `{crf}`, ...)
//! - `Catalog`: catalogo di default en-US / de-DE con fallback su en-US
//!
//! Un argomento del contesto può essere a sua volta una chiave: così l'etichetta
//! del livello di qualità resta nel catalogo e non nel resolver.

use crate::params::{OutputFormat, QualityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every message the core can ask to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    StatusSecureConfigured,
    StatusBlockingEngine,
    EngineInitializing,
    EngineReady,
    ProcessingStarting,
    ProcessingInitializing,
    ProcessingOriginalSize,
    ProcessingQuality,
    ProcessingFinished,
    ProcessingError,
    QualityLevel(QualityLevel),
    FormatOption(OutputFormat),
    NotificationSuccessTitle,
    NotificationSuccessMessage,
    NotificationErrorTitle,
    NotificationErrorMessage,
    MobileNotSupported,
    NoFileTitle,
    NoFileMessage,
}

impl MessageKey {
    /// Dotted path of the key in the translation tables
    pub fn path(&self) -> String {
        let path = match self {
            Self::StatusSecureConfigured => "status.secureConfigured",
            Self::StatusBlockingEngine => "status.blockingFFmpeg",
            Self::EngineInitializing => "ffmpeg.initializing",
            Self::EngineReady => "ffmpeg.ready",
            Self::ProcessingStarting => "processing.starting",
            Self::ProcessingInitializing => "processing.initializing",
            Self::ProcessingOriginalSize => "processing.originalSize",
            Self::ProcessingQuality => "processing.quality",
            Self::ProcessingFinished => "processing.finished",
            Self::ProcessingError => "processing.error",
            Self::QualityLevel(level) => return format!("pandaCompress.quality.levels.{}", level),
            Self::FormatOption(format) => return format!("pandaCompress.format.options.{}", format),
            Self::NotificationSuccessTitle => "notifications.success.title",
            Self::NotificationSuccessMessage => "notifications.success.message",
            Self::NotificationErrorTitle => "notifications.error.title",
            Self::NotificationErrorMessage => "notifications.error.message",
            // en-US path; the de-DE source table files the same text under `status.`
            Self::MobileNotSupported => "notifications.status.mobileNotSupported",
            Self::NoFileTitle => "notifications.noFile.title",
            Self::NoFileMessage => "notifications.noFile.message",
        };
        format!("pandaCompress.{}", path)
    }
}

impl Serialize for MessageKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

/// Interpolation argument
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Arg {
    Text(String),
    Message(MessageKey),
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<MessageKey> for Arg {
    fn from(value: MessageKey) -> Self {
        Arg::Message(value)
    }
}

/// A message key plus its interpolation context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedMessage {
    pub key: MessageKey,
    pub context: BTreeMap<&'static str, Arg>,
}

impl LocalizedMessage {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<Arg>) -> Self {
        self.context.insert(name, value.into());
        self
    }
}

/// Renders messages in the active locale
pub trait Localizer: Send + Sync {
    fn render(&self, message: &LocalizedMessage) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "de-DE")]
    DeDe,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => f.write_str("en-US"),
            Self::DeDe => f.write_str("de-DE"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en-us" | "en" => Ok(Self::EnUs),
            "de-de" | "de" => Ok(Self::DeDe),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}

/// Built-in translation tables with en-US fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    locale: Locale,
}

impl Catalog {
    pub const FALLBACK: Locale = Locale::EnUs;

    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Template for a key, falling back to en-US
    pub fn template(&self, key: MessageKey) -> &'static str {
        Self::table(self.locale, key)
            .or_else(|| Self::table(Self::FALLBACK, key))
            .unwrap_or("")
    }

    fn table(locale: Locale, key: MessageKey) -> Option<&'static str> {
        match locale {
            Locale::EnUs => en_us(key),
            Locale::DeDe => de_de(key),
        }
    }
}

impl Localizer for Catalog {
    fn render(&self, message: &LocalizedMessage) -> String {
        let mut rendered = self.template(message.key).to_string();
        for (name, arg) in &message.context {
            let value = match arg {
                Arg::Text(text) => text.clone(),
                Arg::Message(key) => self.template(*key).to_string(),
            };
            rendered = rendered.replace(&format!("{{{}}}", name), &value);
        }
        rendered
    }
}

fn en_us(key: MessageKey) -> Option<&'static str> {
    let text = match key {
        MessageKey::StatusSecureConfigured => "✓ Browser security configured",
        MessageKey::StatusBlockingEngine => "⚠ Browser blocking FFmpeg - Disable Shields/Blockers",
        MessageKey::EngineInitializing => "Initialize FFmpeg Engine",
        MessageKey::EngineReady => "✅ FFmpeg ready!",
        MessageKey::ProcessingStarting => "Starting compression...",
        MessageKey::ProcessingInitializing => "Initializing FFmpeg...",
        MessageKey::ProcessingOriginalSize => "Original: {size} MB",
        MessageKey::ProcessingQuality => "Quality: {label} (CRF={crf}, {bitrate})",
        MessageKey::ProcessingFinished => "✅ Finished: {size} MB ({savings}% smaller)",
        MessageKey::ProcessingError => "❌ Error: {error}",
        MessageKey::QualityLevel(level) => match level.value() {
            0 => "Minimal (Small)",
            1 => "Low (Small)",
            2 => "Medium (Balanced)",
            3 => "High (Good)",
            4 => "Very High (Very good)",
            _ => "Maximum (Best)",
        },
        MessageKey::FormatOption(format) => match format {
            OutputFormat::Mp4 => "MP4 (H.264) - Universal",
            OutputFormat::Webm => "WebM (VP9) - Web-optimized",
            OutputFormat::Avi => "AVI - Compatible",
            OutputFormat::Mkv => "MKV (Matroska) - Flexible",
            OutputFormat::Mov => "MOV (QuickTime) - Apple",
        },
        MessageKey::NotificationSuccessTitle => "✅ Compression successful!",
        MessageKey::NotificationSuccessMessage => {
            "Original: {original} MB\nCompressed: {compressed} MB\nSavings: {savings}%"
        }
        MessageKey::NotificationErrorTitle => "❌ Error",
        MessageKey::NotificationErrorMessage => "Error: {error}",
        MessageKey::MobileNotSupported => "Video compression is currently not supported on mobile devices.",
        MessageKey::NoFileTitle => "No file",
        MessageKey::NoFileMessage => "Please select a video file first.",
    };
    Some(text)
}

fn de_de(key: MessageKey) -> Option<&'static str> {
    let text = match key {
        MessageKey::StatusSecureConfigured => "✓ Browser-Sicherheit konfiguriert",
        MessageKey::StatusBlockingEngine => "⚠ Browser blockiert FFmpeg - Deaktiviere Shields/Blocker",
        MessageKey::EngineInitializing => "FFmpeg Engine initialisieren",
        MessageKey::EngineReady => "✅ FFmpeg bereit!",
        MessageKey::ProcessingStarting => "Starte Kompression...",
        MessageKey::ProcessingInitializing => "Initialisiere FFmpeg...",
        MessageKey::ProcessingOriginalSize => "Original: {size} MB",
        MessageKey::ProcessingQuality => "Qualität: {label} (CRF={crf}, {bitrate})",
        MessageKey::ProcessingFinished => "✅ Fertig: {size} MB ({savings}% kleiner)",
        MessageKey::ProcessingError => "❌ Fehler: {error}",
        MessageKey::QualityLevel(level) => match level.value() {
            0 => "Minimal (Klein)",
            1 => "Niedrig (Klein)",
            2 => "Mittel (Ausgewogen)",
            3 => "Hoch (Gut)",
            4 => "Sehr Hoch (Sehr gut)",
            _ => "Maximum (Beste)",
        },
        MessageKey::FormatOption(format) => match format {
            OutputFormat::Webm => "WebM (VP9) - Web-optimiert",
            OutputFormat::Avi => "AVI - Kompatibel",
            OutputFormat::Mkv => "MKV (Matroska) - Flexibel",
            // mp4/mov labels are identical in both tables
            _ => return None,
        },
        MessageKey::NotificationSuccessTitle => "✅ Kompression erfolgreich!",
        MessageKey::NotificationSuccessMessage => {
            "Original: {original} MB\nKomprimiert: {compressed} MB\nErsparnis: {savings}%"
        }
        MessageKey::NotificationErrorTitle => "❌ Fehler",
        MessageKey::NotificationErrorMessage => "Fehler: {error}",
        MessageKey::MobileNotSupported => "Video-Kompression auf mobilen Geräten wird derzeit nicht unterstützt.",
        MessageKey::NoFileTitle => "Keine Datei",
        MessageKey::NoFileMessage => "Bitte wähle zuerst eine Videodatei aus.",
    };
    Some(text)
}
