//! # Result Reporter Module
//!
//! Trasforma una sessione terminata in un payload strutturato e localizzabile.
//!
//! ## Responsabilità:
//! - Calcolo statistiche: dimensione originale, compressa, percentuale risparmiata
//! - `savings_percent = round(100 * (1 - compressed / original))`, limitata a [0, 100]
//! - Payload di successo `{original, compressed, savings}` oppure di errore `{error}`
//!
//! Nessun side effect: download del file e notifiche sono compito del chiamante.
//! Nessuna traduzione: il reporter produce solo chiavi e contesti.

use crate::error::{CompressError, SessionError};
use crate::file_manager::FileManager;
use crate::locale::{LocalizedMessage, MessageKey};
use crate::session::{CompressionSession, SessionSnapshot, SessionState};
use serde::Serialize;
use std::path::PathBuf;

/// Percentage saved, never negative
pub fn savings_percent(original_size: u64, compressed_size: u64) -> u8 {
    if original_size == 0 {
        return 0;
    }
    let ratio = compressed_size as f64 / original_size as f64;
    (100.0 * (1.0 - ratio)).round().clamp(0.0, 100.0) as u8
}

/// Size statistics of a successful session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionResult {
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub savings_percent: u8,
}

impl CompressionResult {
    pub fn new(original_size_bytes: u64, compressed_size_bytes: u64) -> Self {
        Self {
            original_size_bytes,
            compressed_size_bytes,
            savings_percent: savings_percent(original_size_bytes, compressed_size_bytes),
        }
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_size_bytes.saturating_sub(self.compressed_size_bytes)
    }
}

/// Structured outcome of a finished session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LocalizedReport {
    Success {
        result: CompressionResult,
        output_path: PathBuf,
    },
    Failure {
        error_message: String,
        error: SessionError,
    },
}

impl LocalizedReport {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn title(&self) -> LocalizedMessage {
        match self {
            Self::Success { .. } => LocalizedMessage::new(MessageKey::NotificationSuccessTitle),
            Self::Failure { .. } => LocalizedMessage::new(MessageKey::NotificationErrorTitle),
        }
    }

    /// Notification body with its interpolation context
    pub fn message(&self) -> LocalizedMessage {
        match self {
            Self::Success { result, .. } => LocalizedMessage::new(MessageKey::NotificationSuccessMessage)
                .with("original", FileManager::size_in_mb(result.original_size_bytes))
                .with("compressed", FileManager::size_in_mb(result.compressed_size_bytes))
                .with("savings", result.savings_percent.to_string()),
            Self::Failure { error_message, .. } => {
                LocalizedMessage::new(MessageKey::NotificationErrorMessage).with("error", error_message.as_str())
            }
        }
    }
}

/// Build the report of a terminal session
pub fn report(session: &CompressionSession) -> Result<LocalizedReport, CompressError> {
    report_snapshot(&session.snapshot())
}

pub fn report_snapshot(snapshot: &SessionSnapshot) -> Result<LocalizedReport, CompressError> {
    match (snapshot.state, &snapshot.input, &snapshot.output, &snapshot.error) {
        (SessionState::Succeeded, Some(input), Some(output), _) => Ok(LocalizedReport::Success {
            result: CompressionResult::new(input.size_bytes, output.size_bytes),
            output_path: output.path.clone(),
        }),
        (SessionState::Failed, _, _, Some(error)) => Ok(LocalizedReport::Failure {
            error_message: error.to_string(),
            error: error.clone(),
        }),
        _ => Err(CompressError::SessionNotTerminal(snapshot.id)),
    }
}

pub(crate) fn original_size_line(size_bytes: u64) -> LocalizedMessage {
    LocalizedMessage::new(MessageKey::ProcessingOriginalSize).with("size", FileManager::size_in_mb(size_bytes))
}

pub(crate) fn finished_line(result: &CompressionResult) -> LocalizedMessage {
    LocalizedMessage::new(MessageKey::ProcessingFinished)
        .with("size", FileManager::size_in_mb(result.compressed_size_bytes))
        .with("savings", result.savings_percent.to_string())
}

pub(crate) fn error_line(error: &SessionError) -> LocalizedMessage {
    LocalizedMessage::new(MessageKey::ProcessingError).with("error", error.to_string())
}
