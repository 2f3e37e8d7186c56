//! # Compressor Orchestrator
//!
//! Orchestratore che collega engine, resolver e sessioni.
//!
//! ## Responsabilità:
//! - Crea sessioni nuove (sempre `Idle`)
//! - Garantisce una sola sessione attiva per engine (semaforo a un permesso)
//! - Esegue le fasi Starting → Initializing → Running in un task tokio
//! - Inoltra le righe dell'engine al sink del chiamante senza riordinarle
//!
//! ## Flusso di `start()`:
//! 1. engine non `Ready` → `EngineNotReady` (la sessione resta `Idle`)
//! 2. un'altra sessione attiva → `SessionAlreadyRunning` (la sessione resta `Idle`);
//!    se la sessione precedente è già terminale (es. cancellata) si attende solo che
//!    l'engine si fermi
//! 3. Starting: validazione input, `InvalidInput` senza mai entrare in Running
//! 4. il resto del run prosegue in background, `wait()` restituisce lo stato finale
//!
//! Nessun retry e nessun timeout interno: un run è un solo tentativo.

use crate::engine::{EncodeJob, EncoderRuntime, EngineFailure, EngineManager};
use crate::error::{CompressError, SessionError};
use crate::file_manager::FileManager;
use crate::locale::{LocalizedMessage, MessageKey};
use crate::params::{resolve, OutputFormat, QualityLevel};
use crate::report::{self, CompressionResult};
use crate::session::{
    CompressionSession, InputFile, OutputFile, ProgressLine, ProgressSink, SessionState,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Runs compression sessions against the shared engine
pub struct Compressor {
    engine: Arc<EngineManager>,
    /// One permit: the engine never runs two encodes at once
    slot: Arc<Semaphore>,
    /// Last session that took the slot. Held across the whole claim so two starts never interleave.
    holder: Mutex<Option<CompressionSession>>,
    next_id: AtomicU64,
    output_dir: Option<PathBuf>,
}

impl Compressor {
    pub fn new(engine: Arc<EngineManager>) -> Self {
        Self {
            engine,
            slot: Arc::new(Semaphore::new(1)),
            holder: Mutex::new(None),
            next_id: AtomicU64::new(1),
            output_dir: None,
        }
    }

    /// Write outputs into `dir` instead of next to the input
    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn engine(&self) -> &Arc<EngineManager> {
        &self.engine
    }

    /// Fresh session in `Idle`
    pub fn create_session(&self) -> CompressionSession {
        CompressionSession::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Start `session`. Returns once the input is validated; the encode continues in background.
    pub async fn start(
        &self,
        session: &CompressionSession,
        input: InputFile,
        level: QualityLevel,
        format: OutputFormat,
        sink: ProgressSink,
    ) -> Result<(), CompressError> {
        let mut holder = self.holder.lock().await;

        if session.state() != SessionState::Idle {
            return Err(CompressError::SessionNotIdle(session.id()));
        }

        let runtime = self.engine.runtime()?;
        let permit = self.claim_slot(holder.as_ref()).await?;

        if !session.begin(sink) {
            return Err(CompressError::SessionNotIdle(session.id()));
        }
        *holder = Some(session.clone());
        drop(holder);

        info!("Session {}: compressing {}", session.id(), input.path.display());
        session.emit(ProgressLine::Status(LocalizedMessage::new(MessageKey::ProcessingStarting)));
        session.emit(ProgressLine::Status(report::original_size_line(input.size_bytes)));
        session.set_input(input.clone());

        if let Err(reason) = validate_input(&input).await {
            warn!("Session {}: invalid input: {}", session.id(), reason);
            let error = SessionError::InvalidInput { reason: reason.clone() };
            session.finish(Err(error), |_, outcome| closing_line(outcome, input.size_bytes));
            return Err(CompressError::InvalidInput(reason));
        }

        let output_path = FileManager::output_path(&input.path, format, self.output_dir.as_deref());
        let session = session.clone();
        tokio::spawn(run_session(session, runtime, permit, input, output_path, level, format));

        Ok(())
    }
}

impl Compressor {
    /// Take the engine slot. A terminal holder only has its engine winding down, so wait for it.
    async fn claim_slot(
        &self,
        holder: Option<&CompressionSession>,
    ) -> Result<OwnedSemaphorePermit, CompressError> {
        if let Ok(permit) = Arc::clone(&self.slot).try_acquire_owned() {
            return Ok(permit);
        }

        match holder {
            Some(previous) if previous.state().is_terminal() => {
                debug!("Session {} is {}, waiting for the engine to stop", previous.id(), previous.state());
                Arc::clone(&self.slot)
                    .acquire_owned()
                    .await
                    .map_err(|_| CompressError::SessionAlreadyRunning)
            }
            _ => Err(CompressError::SessionAlreadyRunning),
        }
    }
}

async fn validate_input(input: &InputFile) -> Result<(), String> {
    if input.size_bytes == 0 {
        return Err(format!("{} is empty", input.path.display()));
    }

    match tokio::fs::File::open(&input.path).await {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("cannot read {}: {}", input.path.display(), e)),
    }
}

/// Initializing and Running phases, on their own task
async fn run_session(
    session: CompressionSession,
    runtime: Arc<dyn EncoderRuntime>,
    permit: OwnedSemaphorePermit,
    input: InputFile,
    output_path: PathBuf,
    level: QualityLevel,
    format: OutputFormat,
) {
    if !session.advance(SessionState::Initializing) {
        return;
    }
    session.emit(ProgressLine::Status(LocalizedMessage::new(MessageKey::ProcessingInitializing)));

    let spec = resolve(level, format);
    session.emit(ProgressLine::Status(
        LocalizedMessage::new(MessageKey::ProcessingQuality)
            .with("label", level.label_key())
            .with("crf", spec.quality_factor.to_string())
            .with("bitrate", spec.bitrate_label()),
    ));
    session.set_spec(spec.clone());

    if !session.advance(SessionState::Running) {
        return;
    }

    let job = EncodeJob {
        spec,
        input: input.path.clone(),
        output: output_path,
    };
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let encode = runtime.encode(job, line_tx, session.cancel_signal());

    let forward = async {
        let mut last_line = None;
        while let Some(line) = line_rx.recv().await {
            session.emit(ProgressLine::Engine(line.clone()));
            last_line = Some(line);
        }
        last_line
    };

    let (result, last_line) = tokio::join!(encode, forward);

    let outcome = match result {
        Ok(output) => Ok(OutputFile {
            path: output.path,
            size_bytes: output.size_bytes,
        }),
        Err(EngineFailure::Failed { diagnostic }) => {
            let diagnostic = match diagnostic.trim() {
                "" => last_line.unwrap_or_else(|| "encoder failed without output".to_string()),
                text => text.to_string(),
            };
            Err(SessionError::Encode { diagnostic })
        }
        Err(EngineFailure::Cancelled) => Err(SessionError::Cancelled),
    };

    if !session.finish(outcome, |_, outcome| closing_line(outcome, input.size_bytes)) {
        debug!("Session {} was already terminal when the engine stopped", session.id());
    }
    drop(permit);
}

fn closing_line(outcome: &Result<OutputFile, SessionError>, original_size: u64) -> ProgressLine {
    match outcome {
        Ok(output) => ProgressLine::Status(report::finished_line(&CompressionResult::new(
            original_size,
            output.size_bytes,
        ))),
        Err(error) => ProgressLine::Status(report::error_line(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityVerdict;
    use crate::engine::testing::ScriptedRuntime;
    use crate::locale::{Catalog, Locale};
    use crate::report::LocalizedReport;
    use crate::session::ProgressEvent;
    use tempfile::NamedTempFile;
    use tokio::sync::Notify;

    async fn ready_compressor(runtime: Arc<ScriptedRuntime>) -> Compressor {
        let engine = Arc::new(EngineManager::new(runtime));
        engine.load(CapabilityVerdict::Supported).await.unwrap();
        Compressor::new(engine)
    }

    fn input_file(declared_size: u64) -> (NamedTempFile, InputFile) {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not really a video").unwrap();
        let input = InputFile::new(file.path(), declared_size);
        (file, input)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<String> {
        let catalog = Catalog::new(Locale::EnUs);
        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            lines.push(event.render(&catalog));
        }
        lines
    }

    #[tokio::test]
    async fn test_webm_scenario() {
        let runtime = Arc::new(ScriptedRuntime::succeeding(20_000_000));
        let compressor = ready_compressor(runtime).await;
        let (_file, input) = input_file(50_000_000);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input, QualityLevel::new(2).unwrap(), OutputFormat::Webm, tx)
            .await
            .unwrap();
        let snapshot = session.wait().await;

        assert_eq!(
            snapshot.history,
            vec![
                SessionState::Idle,
                SessionState::Starting,
                SessionState::Initializing,
                SessionState::Running,
                SessionState::Succeeded,
            ]
        );
        assert_eq!(snapshot.output.as_ref().map(|o| o.size_bytes), Some(20_000_000));
        assert!(snapshot.output.unwrap().path.to_string_lossy().ends_with("_compressed.webm"));
        assert_eq!(snapshot.spec.map(|s| s.codec), Some("libvpx-vp9"));

        match report::report(&session).unwrap() {
            LocalizedReport::Success { result, .. } => assert_eq!(result.savings_percent, 60),
            other => panic!("unexpected report: {:?}", other),
        }

        assert_eq!(
            drain(&mut rx),
            vec![
                "Starting compression...",
                "Original: 47.68 MB",
                "Initializing FFmpeg...",
                "Quality: Medium (Balanced) (CRF=30, 1200k)",
                "frame=1 fps=0.0",
                "frame=2 fps=30.0",
                "✅ Finished: 19.07 MB (60% smaller)",
            ]
        );
    }

    #[tokio::test]
    async fn test_engine_lines_keep_their_order() {
        let lines: Vec<String> = (0..200).map(|i| format!("frame={}", i)).collect();
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let runtime = Arc::new(ScriptedRuntime::succeeding(10).with_lines(&line_refs));
        let compressor = ready_compressor(runtime).await;
        let (_file, input) = input_file(100);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input, QualityLevel::MAX, OutputFormat::Mp4, tx)
            .await
            .unwrap();
        session.wait().await;

        let engine_lines: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event.line {
                ProgressLine::Engine(line) => Some(line),
                ProgressLine::Status(_) => None,
            })
            .collect();
        assert_eq!(engine_lines, lines);
    }

    #[tokio::test]
    async fn test_engine_not_ready() {
        let runtime = Arc::new(ScriptedRuntime::succeeding(10));
        let compressor = Compressor::new(Arc::new(EngineManager::new(runtime.clone())));
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        let err = compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::EngineNotReady));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(runtime.encode_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let hold = Arc::new(Notify::new());
        let runtime = Arc::new(ScriptedRuntime::succeeding(10).held_by(hold.clone()));
        let compressor = ready_compressor(runtime).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = compressor.create_session();
        compressor
            .start(&first, input.clone(), QualityLevel::MIN, OutputFormat::Mp4, tx.clone())
            .await
            .unwrap();

        let second = compressor.create_session();
        let err = compressor
            .start(&second, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::SessionAlreadyRunning));
        assert_eq!(second.state(), SessionState::Idle);
        assert!(first.state().is_active());

        hold.notify_one();
        assert_eq!(first.wait().await.state, SessionState::Succeeded);
    }

    #[tokio::test]
    async fn test_engine_free_after_session_ends() {
        let compressor = ready_compressor(Arc::new(ScriptedRuntime::succeeding(10))).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = compressor.create_session();
        compressor
            .start(&first, input.clone(), QualityLevel::MIN, OutputFormat::Mkv, tx.clone())
            .await
            .unwrap();
        first.wait().await;

        let second = compressor.create_session();
        compressor
            .start(&second, input, QualityLevel::MIN, OutputFormat::Mkv, tx)
            .await
            .unwrap();
        assert_eq!(second.wait().await.state, SessionState::Succeeded);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_session_cannot_be_restarted() {
        let compressor = ready_compressor(Arc::new(ScriptedRuntime::succeeding(10))).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input.clone(), QualityLevel::MIN, OutputFormat::Mp4, tx.clone())
            .await
            .unwrap();
        session.wait().await;

        let err = compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::SessionNotIdle(_)));
    }

    #[tokio::test]
    async fn test_empty_input_never_runs() {
        let runtime = Arc::new(ScriptedRuntime::succeeding(10));
        let compressor = ready_compressor(runtime.clone()).await;
        let (_file, input) = input_file(0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        let err = compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::InvalidInput(_)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(!snapshot.history.contains(&SessionState::Running));
        assert!(matches!(snapshot.error, Some(SessionError::InvalidInput { .. })));
        assert_eq!(runtime.encode_calls(), 0);
        assert!(drain(&mut rx).last().unwrap().starts_with("❌ Error: Invalid input"));

        // the slot was released
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();
        let next = compressor.create_session();
        assert!(compressor
            .start(&next, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_input() {
        let compressor = ready_compressor(Arc::new(ScriptedRuntime::succeeding(10))).await;
        let dir = tempfile::TempDir::new().unwrap();
        let input = InputFile::new(dir.path().join("missing.mp4"), 100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        let err = compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::InvalidInput(ref r) if r.contains("cannot read")));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_encode_failure_keeps_diagnostic() {
        let runtime = Arc::new(ScriptedRuntime::failing("Invalid data found when processing input"));
        let compressor = ready_compressor(runtime).await;
        let (_file, input) = input_file(100);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Avi, tx)
            .await
            .unwrap();
        let snapshot = session.wait().await;

        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(snapshot.output.is_none());
        assert_eq!(
            snapshot.error,
            Some(SessionError::Encode { diagnostic: "Invalid data found when processing input".into() })
        );
        assert_eq!(
            drain(&mut rx).last().map(String::as_str),
            Some("❌ Error: Invalid data found when processing input")
        );
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let hold = Arc::new(Notify::new());
        let runtime = Arc::new(ScriptedRuntime::succeeding(10).held_by(hold));
        let compressor = ready_compressor(runtime).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input, QualityLevel::MIN, OutputFormat::Mov, tx)
            .await
            .unwrap();

        assert_eq!(session.cancel(), SessionState::Failed);
        let after_first = session.snapshot();
        assert_eq!(after_first.error, Some(SessionError::Cancelled));

        assert_eq!(session.cancel(), SessionState::Failed);
        assert_eq!(session.snapshot(), after_first);

        // the engine winding down does not touch the terminal session
        assert_eq!(session.wait().await, after_first);
        tokio::task::yield_now().await;
        assert_eq!(session.snapshot(), after_first);
    }

    #[tokio::test]
    async fn test_start_after_cancel_waits_for_engine() {
        let hold = Arc::new(Notify::new());
        let runtime = Arc::new(ScriptedRuntime::succeeding(10).held_by(hold.clone()));
        let compressor = ready_compressor(runtime.clone()).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = compressor.create_session();
        compressor
            .start(&first, input.clone(), QualityLevel::MIN, OutputFormat::Mp4, tx.clone())
            .await
            .unwrap();
        while runtime.encode_calls() == 0 {
            tokio::task::yield_now().await;
        }

        first.cancel();
        assert_eq!(first.wait().await.state, SessionState::Failed);

        // the engine of the first session may still be stopping here
        let second = compressor.create_session();
        compressor
            .start(&second, input, QualityLevel::MIN, OutputFormat::Mp4, tx)
            .await
            .unwrap();
        assert!(second.state().is_active());

        hold.notify_one();
        assert_eq!(second.wait().await.state, SessionState::Succeeded);
        assert_eq!(runtime.encode_calls(), 2);
        assert_eq!(first.snapshot().error, Some(SessionError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_while_starting() {
        let runtime = Arc::new(ScriptedRuntime::succeeding(10));
        let compressor = ready_compressor(runtime.clone()).await;
        let (_file, input) = input_file(100);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        compressor
            .start(&session, input.clone(), QualityLevel::MIN, OutputFormat::Webm, tx)
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Starting);

        assert_eq!(session.cancel(), SessionState::Failed);
        let snapshot = session.wait().await;
        assert_eq!(snapshot.error, Some(SessionError::Cancelled));
        assert!(snapshot.spec.is_none());

        let (tx, _rx) = mpsc::unbounded_channel();
        let next = compressor.create_session();
        compressor
            .start(&next, input, QualityLevel::MIN, OutputFormat::Webm, tx)
            .await
            .unwrap();
        assert_eq!(next.wait().await.state, SessionState::Succeeded);

        // the cancelled session never reached the engine
        assert_eq!(runtime.encode_calls(), 1);
        assert!(!session.snapshot().history.contains(&SessionState::Initializing));
        assert_eq!(
            drain(&mut rx),
            vec!["Starting compression...", "Original: 0.00 MB", "❌ Error: Encoding cancelled"]
        );
    }

    #[tokio::test]
    async fn test_cancel_while_initializing() {
        let runtime = Arc::new(ScriptedRuntime::succeeding(10));
        let compressor = ready_compressor(runtime.clone()).await;
        let (_file, input) = input_file(100);
        let (tx, _rx) = mpsc::unbounded_channel();

        let session = compressor.create_session();
        session.begin(tx);
        session.advance(SessionState::Initializing);
        assert_eq!(session.cancel(), SessionState::Failed);

        let permit = compressor.claim_slot(None).await.unwrap();
        run_session(
            session.clone(),
            Arc::clone(&runtime) as Arc<dyn EncoderRuntime>,
            permit,
            input,
            PathBuf::from("out.mp4"),
            QualityLevel::MIN,
            OutputFormat::Mp4,
        )
        .await;

        assert_eq!(runtime.encode_calls(), 0);
        assert_eq!(session.snapshot().error, Some(SessionError::Cancelled));
        assert_eq!(compressor.slot.available_permits(), 1);
    }
}
