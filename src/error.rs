//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Definisce `SessionError`, la causa di fallimento registrata in una sessione terminata
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Capability`: ambiente non in grado di eseguire l'encoder (mobile, blocker)
//! - `EngineLoad`: caricamento engine fallito (recuperabile solo con `reset()`)
//! - `EngineNotReady`, `SessionAlreadyRunning`, `SessionNotIdle`, `SessionNotTerminal`,
//!   `InvalidInput`: errori d'uso, restituiti subito al chiamante
//! - `Encode` / `EncodeCancelled`: fallimenti terminali di una sessione
//! - `Io`, `Config`: errori di I/O e configurazione
//!
//! ## Esempio:
//! ```rust,ignore
//! if !engine.is_ready() {
//!     return Err(CompressError::EngineNotReady);
//! }
//! ```

use crate::capability::CapabilityVerdict;

/// Custom error types for video compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Environment cannot run the encoder: {0}")]
    Capability(CapabilityVerdict),

    #[error("Engine failed to load: {0}")]
    EngineLoad(String),

    #[error("Engine is not ready")]
    EngineNotReady,

    #[error("Another compression session is already running")]
    SessionAlreadyRunning,

    #[error("Session {0} has already been started")]
    SessionNotIdle(u64),

    #[error("Session {0} has not finished yet")]
    SessionNotTerminal(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Encoding cancelled")]
    EncodeCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure recorded on a session that reached `Failed`.
///
/// Kept separate from [`CompressError`] so snapshots of a session can be
/// cloned and serialized freely.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("{diagnostic}")]
    Encode { diagnostic: String },

    #[error("Encoding cancelled")]
    Cancelled,
}

impl From<SessionError> for CompressError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidInput { reason } => CompressError::InvalidInput(reason),
            SessionError::Encode { diagnostic } => CompressError::Encode(diagnostic),
            SessionError::Cancelled => CompressError::EncodeCancelled,
        }
    }
}
