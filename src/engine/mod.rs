//! # Engine Module
//!
//! L'encoder è trattato come una black box dietro al trait `EncoderRuntime`:
//! - `initialize()`: fetch/verifica della risorsa necessaria all'engine
//! - `encode()`: riceve un `EncodeJob`, emette righe diagnostiche, termina con
//!   un file di output oppure con l'ultima riga diagnostica di errore
//!
//! Sottomoduli:
//! - `lifecycle`: macchina a stati Uninitialized/Loading/Ready/Failed
//! - `ffmpeg`: implementazione nativa basata sul binario `ffmpeg`

pub mod ffmpeg;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

pub use ffmpeg::FfmpegRuntime;
pub use lifecycle::{EngineManager, EngineState};

use crate::params::EncodeSpec;
use futures::future::BoxFuture;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};

/// Channel the runtime writes its diagnostic lines to, in production order
pub type LineSender = mpsc::UnboundedSender<String>;

/// Flips to `true` when the caller wants the encode stopped
pub type CancelSignal = watch::Receiver<bool>;

/// One encode request
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub spec: EncodeSpec,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Output produced by a successful encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutput {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFailure {
    /// Non-zero exit, encode/decode error or unsupported input
    Failed { diagnostic: String },
    Cancelled,
}

/// The embedded encoder as seen by the orchestration layer
pub trait EncoderRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch or verify whatever the engine needs before it can encode
    fn initialize(&self) -> BoxFuture<'_, Result<(), String>>;

    fn encode(
        &self,
        job: EncodeJob,
        lines: LineSender,
        cancel: CancelSignal,
    ) -> BoxFuture<'_, Result<EncodeOutput, EngineFailure>>;
}
