//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! (una riga JSON per evento su stdout).
//!
//! ## Tipi di messaggi:
//! - `start`: inizio di una sessione (input, formato, livello di qualità)
//! - `progress`: una riga di progresso già localizzata
//! - `complete`: sessione riuscita, con le statistiche del report
//! - `error`: sessione fallita o errore dell'applicazione

use crate::params::{OutputFormat, QualityLevel};
use crate::report::CompressionResult;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        session_id: u64,
        input: PathBuf,
        size: u64,
        quality_level: QualityLevel,
        format: OutputFormat,
    },

    #[serde(rename = "progress")]
    Progress { session_id: u64, line: String },

    #[serde(rename = "complete")]
    Complete {
        session_id: u64,
        output: PathBuf,
        original_size: u64,
        compressed_size: u64,
        savings_percent: u8,
        message: String,
    },

    #[serde(rename = "error")]
    Error {
        session_id: Option<u64>,
        message: String,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(
        session_id: u64,
        input: PathBuf,
        size: u64,
        quality_level: QualityLevel,
        format: OutputFormat,
    ) -> Self {
        Self::Start {
            session_id,
            input,
            size,
            quality_level,
            format,
        }
    }

    pub fn progress(session_id: u64, line: String) -> Self {
        Self::Progress { session_id, line }
    }

    pub fn complete(session_id: u64, output: PathBuf, result: &CompressionResult, message: String) -> Self {
        Self::Complete {
            session_id,
            output,
            original_size: result.original_size_bytes,
            compressed_size: result.compressed_size_bytes,
            savings_percent: result.savings_percent,
            message,
        }
    }

    pub fn error(session_id: Option<u64>, message: String) -> Self {
        Self::Error { session_id, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_message_shape() {
        let result = CompressionResult::new(50_000_000, 20_000_000);
        let message = JsonMessage::complete(4, "out.webm".into(), &result, "done".into());
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "complete");
        assert_eq!(value["session_id"], 4);
        assert_eq!(value["savings_percent"], 60);
    }

    #[test]
    fn test_start_message_shape() {
        let message = JsonMessage::start(1, "in.mov".into(), 10, QualityLevel::MAX, OutputFormat::Webm);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "start");
        assert_eq!(value["quality_level"], 5);
        assert_eq!(value["format"], "webm");
    }
}
