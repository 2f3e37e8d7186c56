//! # Panda Compress Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//!
//! ## Architettura dei moduli:
//! - `capability`: verifica che l'host possa eseguire l'encoder
//! - `engine`: ciclo di vita dell'engine e runtime ffmpeg
//! - `params`: livello di qualità + formato → parametri di encoding
//! - `session` / `compressor`: un run di compressione con progresso in streaming
//! - `report`: statistiche di risparmio e payload localizzabile
//! - `locale`: chiavi dei messaggi e catalogo en-US / de-DE
//! - `config`, `file_manager`, `json_output`, `progress`, `platform`: contorno per la CLI
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use panda_compress::{probe, Compressor, EngineManager, FfmpegRuntime, SystemHost};
//!
//! let engine = Arc::new(EngineManager::new(Arc::new(FfmpegRuntime::new(None))));
//! engine.load(probe(&SystemHost::new(false, None)).await).await?;
//! let compressor = Compressor::new(engine);
//! let session = compressor.create_session();
//! compressor.start(&session, input, QualityLevel::new(2)?, OutputFormat::Webm, sink).await?;
//! let report = panda_compress::report::report(&session)?;
//! ```

pub mod capability;
pub mod compressor;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod locale;
pub mod params;
pub mod platform;
pub mod progress;
pub mod report;
pub mod session;
pub mod tool_resolver;
pub mod utils;

pub use capability::{probe, CapabilityVerdict, HostSignals, SystemHost};
pub use compressor::Compressor;
pub use config::Config;
pub use engine::{EncoderRuntime, EngineManager, EngineState, FfmpegRuntime};
pub use error::{CompressError, SessionError};
pub use locale::{Catalog, Locale, LocalizedMessage, Localizer, MessageKey};
pub use params::{resolve, EncodeSpec, OutputFormat, QualityLevel};
pub use report::{CompressionResult, LocalizedReport};
pub use session::{CompressionSession, InputFile, ProgressEvent, SessionState};
