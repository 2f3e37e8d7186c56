//! # Engine Lifecycle
//!
//! Gestisce lo stato dell'unica istanza di engine del processo.
//!
//! ## Transizioni ammesse:
//! - `Uninitialized --load()--> Loading --ok--> Ready`
//! - `Loading --errore--> Failed`
//! - `Failed --reset()--> Uninitialized`
//!
//! `load()` è idempotente in `Loading` e `Ready`. Con un verdetto diverso da
//! `Supported` fallisce senza mai toccare il runtime. `Ready` è stabile e
//! l'istanza viene riusata da tutte le sessioni.
//!
//! L'istanza viene creata in un punto preciso (l'entry point) e iniettata
//! tramite `Arc`, niente stato globale.

use crate::capability::CapabilityVerdict;
use crate::engine::EncoderRuntime;
use crate::error::CompressError;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct LifecycleInner {
    state: EngineState,
    error: Option<String>,
    transitions: Vec<(EngineState, EngineState)>,
}

impl LifecycleInner {
    fn transition(&mut self, to: EngineState) {
        debug!("Engine state: {} -> {}", self.state, to);
        self.transitions.push((self.state, to));
        self.state = to;
    }
}

/// Owns the engine state machine and the runtime behind it
pub struct EngineManager {
    runtime: Arc<dyn EncoderRuntime>,
    inner: Mutex<LifecycleInner>,
}

impl EngineManager {
    pub fn new(runtime: Arc<dyn EncoderRuntime>) -> Self {
        Self {
            runtime,
            inner: Mutex::new(LifecycleInner {
                state: EngineState::Uninitialized,
                error: None,
                transitions: Vec::new(),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, LifecycleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> EngineState {
        self.inner().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// Error attached by the last failed load
    pub fn last_error(&self) -> Option<String> {
        self.inner().error.clone()
    }

    /// Every transition taken so far, oldest first
    pub fn transitions(&self) -> Vec<(EngineState, EngineState)> {
        self.inner().transitions.clone()
    }

    /// Load the engine. No-op in `Loading`/`Ready`; `Failed` needs `reset()` first.
    pub async fn load(&self, verdict: CapabilityVerdict) -> Result<EngineState, CompressError> {
        {
            let mut inner = self.inner();
            match inner.state {
                EngineState::Loading | EngineState::Ready => return Ok(inner.state),
                EngineState::Failed => {
                    let reason = inner.error.clone().unwrap_or_default();
                    return Err(CompressError::EngineLoad(reason));
                }
                EngineState::Uninitialized => inner.transition(EngineState::Loading),
            }
        }

        if !verdict.is_supported() {
            return Err(self.fail(verdict.to_string()));
        }

        info!("Loading {} engine", self.runtime.name());
        match self.runtime.initialize().await {
            Ok(()) => {
                let mut inner = self.inner();
                inner.transition(EngineState::Ready);
                info!("Engine ready");
                Ok(EngineState::Ready)
            }
            Err(reason) => Err(self.fail(reason)),
        }
    }

    fn fail(&self, reason: String) -> CompressError {
        error!("Engine load failed: {}", reason);
        let mut inner = self.inner();
        inner.error = Some(reason.clone());
        inner.transition(EngineState::Failed);
        CompressError::EngineLoad(reason)
    }

    /// Leave `Failed` so a new `load()` can run. Any other state is returned unchanged.
    pub fn reset(&self) -> EngineState {
        let mut inner = self.inner();
        if inner.state == EngineState::Failed {
            inner.error = None;
            inner.transition(EngineState::Uninitialized);
        }
        inner.state
    }

    /// The runtime, only handed out once the engine is `Ready`
    pub fn runtime(&self) -> Result<Arc<dyn EncoderRuntime>, CompressError> {
        if !self.is_ready() {
            return Err(CompressError::EngineNotReady);
        }
        Ok(Arc::clone(&self.runtime))
    }
}
