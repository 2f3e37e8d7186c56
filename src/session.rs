//! # Compression Session Module
//!
//! Una sessione rappresenta un singolo tentativo di compressione.
//!
//! ## Stati:
//! `Idle --start()--> Starting --> Initializing --> Running --> {Succeeded | Failed}`
//!
//! ## Regole:
//! - una sessione terminata è immutabile, un nuovo run richiede una nuova sessione
//! - `output` è presente solo in `Succeeded`, `error` solo in `Failed`
//! - `cancel()` è valido in Starting/Initializing/Running, idempotente, no-op altrimenti
//! - gli eventi di progresso arrivano al sink del chiamante nell'ordine di produzione
//!
//! L'avvio vero e proprio è in `compressor`, che possiede l'engine.

use crate::error::SessionError;
use crate::locale::{LocalizedMessage, Localizer};
use crate::params::EncodeSpec;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    Initializing,
    Running,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// States in which the session holds the engine and can be cancelled
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Initializing | Self::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Input video: a path plus its byte size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Build from a file on disk, reading its size
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let size_bytes = tokio::fs::metadata(path).await?.len();
        Ok(Self::new(path, size_bytes))
    }
}

/// Compressed output: a path plus its byte size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProgressLine {
    /// Session status message, rendered by the localizer
    Status(LocalizedMessage),
    /// Raw diagnostic line from the engine
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub line: ProgressLine,
    pub timestamp: SystemTime,
}

impl ProgressEvent {
    pub fn new(line: ProgressLine) -> Self {
        Self {
            line,
            timestamp: SystemTime::now(),
        }
    }

    /// Text of the line in the active locale
    pub fn render(&self, localizer: &dyn Localizer) -> String {
        match self.line {
            ProgressLine::Status(ref message) => localizer.render(message),
            ProgressLine::Engine(ref raw) => raw.clone(),
        }
    }
}

/// Caller-supplied consumer of progress events
pub type ProgressSink = mpsc::UnboundedSender<ProgressEvent>;

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub state: SessionState,
    pub input: Option<InputFile>,
    pub spec: Option<EncodeSpec>,
    pub output: Option<OutputFile>,
    pub error: Option<SessionError>,
    /// Every state entered, starting with `Idle`
    pub history: Vec<SessionState>,
}

struct SessionRecord {
    snapshot: SessionSnapshot,
    sink: Option<ProgressSink>,
}

impl SessionRecord {
    fn emit(&self, line: ProgressLine) {
        if let Some(ref sink) = self.sink {
            // a dropped receiver only means nobody is watching
            let _ = sink.send(ProgressEvent::new(line));
        }
    }
}

struct SessionShared {
    id: u64,
    record: Mutex<SessionRecord>,
    state_tx: watch::Sender<SessionState>,
    cancel_tx: watch::Sender<bool>,
}

/// Handle to one compression run. Clones share the same session.
#[derive(Clone)]
pub struct CompressionSession {
    shared: Arc<SessionShared>,
}

impl CompressionSession {
    pub(crate) fn new(id: u64) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (cancel_tx, _) = watch::channel(false);

        Self {
            shared: Arc::new(SessionShared {
                id,
                record: Mutex::new(SessionRecord {
                    snapshot: SessionSnapshot {
                        id,
                        state: SessionState::Idle,
                        input: None,
                        spec: None,
                        output: None,
                        error: None,
                        history: vec![SessionState::Idle],
                    },
                    sink: None,
                }),
                state_tx,
                cancel_tx,
            }),
        }
    }

    fn record(&self) -> MutexGuard<'_, SessionRecord> {
        self.shared.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.record().snapshot.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.record().snapshot.clone()
    }

    /// Wait until the session is terminal. Returns at once for an `Idle` session.
    pub async fn wait(&self) -> SessionSnapshot {
        let mut state_rx = self.shared.state_tx.subscribe();
        let _ = state_rx
            .wait_for(|state| state.is_terminal() || *state == SessionState::Idle)
            .await;
        self.snapshot()
    }

    /// Request the engine to stop and fail the session with `Cancelled`.
    ///
    /// Idempotent; on an idle or terminal session nothing changes.
    pub fn cancel(&self) -> SessionState {
        let mut record = self.record();
        let state = record.snapshot.state;
        if !state.is_active() {
            debug!("Cancel ignored for session {} in state {}", self.id(), state);
            return state;
        }

        info!("Cancelling session {}", self.id());
        record.emit(ProgressLine::Status(crate::report::error_line(&SessionError::Cancelled)));
        Self::apply_failure(&mut record, SessionError::Cancelled);
        self.shared.cancel_tx.send_replace(true);
        self.shared.state_tx.send_replace(SessionState::Failed);
        SessionState::Failed
    }

    pub(crate) fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.shared.cancel_tx.subscribe()
    }

    /// Leave `Idle` and attach the sink. False if the session was already used.
    pub(crate) fn begin(&self, sink: ProgressSink) -> bool {
        let mut record = self.record();
        if record.snapshot.state != SessionState::Idle {
            return false;
        }
        record.sink = Some(sink);
        self.enter(&mut record, SessionState::Starting);
        true
    }

    /// Move to a non-terminal state. False once the session is terminal.
    pub(crate) fn advance(&self, to: SessionState) -> bool {
        let mut record = self.record();
        if record.snapshot.state.is_terminal() {
            return false;
        }
        self.enter(&mut record, to);
        true
    }

    fn enter(&self, record: &mut SessionRecord, to: SessionState) {
        debug!("Session {}: {} -> {}", self.id(), record.snapshot.state, to);
        record.snapshot.state = to;
        record.snapshot.history.push(to);
        self.shared.state_tx.send_replace(to);
    }

    /// Emit a line unless the session is already terminal
    pub(crate) fn emit(&self, line: ProgressLine) {
        let record = self.record();
        if !record.snapshot.state.is_terminal() {
            record.emit(line);
        }
    }

    pub(crate) fn set_input(&self, input: InputFile) {
        self.record().snapshot.input = Some(input);
    }

    pub(crate) fn set_spec(&self, spec: EncodeSpec) {
        self.record().snapshot.spec = Some(spec);
    }

    /// Record the terminal outcome with its closing line. False if already terminal.
    pub(crate) fn finish(
        &self,
        outcome: Result<OutputFile, SessionError>,
        closing_line: impl FnOnce(&SessionSnapshot, &Result<OutputFile, SessionError>) -> ProgressLine,
    ) -> bool {
        let mut record = self.record();
        if record.snapshot.state.is_terminal() {
            return false;
        }

        let line = closing_line(&record.snapshot, &outcome);
        let state = match outcome {
            Ok(output) => {
                record.snapshot.output = Some(output);
                record.emit(line);
                record.snapshot.state = SessionState::Succeeded;
                record.snapshot.history.push(SessionState::Succeeded);
                SessionState::Succeeded
            }
            Err(error) => {
                record.emit(line);
                Self::apply_failure(&mut record, error);
                SessionState::Failed
            }
        };

        info!("Session {} {}", self.id(), state);
        self.shared.state_tx.send_replace(state);
        true
    }

    fn apply_failure(record: &mut SessionRecord, error: SessionError) {
        record.snapshot.error = Some(error);
        record.snapshot.output = None;
        record.snapshot.state = SessionState::Failed;
        record.snapshot.history.push(SessionState::Failed);
    }
}

impl fmt::Debug for CompressionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionSession")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
