//! Scripted runtime standing in for ffmpeg in tests.

use super::{CancelSignal, EncodeJob, EncodeOutput, EncoderRuntime, EngineFailure, LineSender};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) struct ScriptedRuntime {
    lines: Vec<String>,
    outcome: Result<u64, String>,
    init_error: Option<String>,
    hold: Option<Arc<Notify>>,
    init_calls: AtomicUsize,
    encode_calls: AtomicUsize,
}

impl ScriptedRuntime {
    /// Encodes succeed with an output of `output_size` bytes
    pub(crate) fn succeeding(output_size: u64) -> Self {
        Self {
            lines: vec!["frame=1 fps=0.0".to_string(), "frame=2 fps=30.0".to_string()],
            outcome: Ok(output_size),
            init_error: None,
            hold: None,
            init_calls: AtomicUsize::new(0),
            encode_calls: AtomicUsize::new(0),
        }
    }

    /// Encodes fail, the last emitted line being `diagnostic`
    pub(crate) fn failing(diagnostic: &str) -> Self {
        let mut runtime = Self::succeeding(0);
        runtime.lines.push(diagnostic.to_string());
        runtime.outcome = Err(diagnostic.to_string());
        runtime
    }

    pub(crate) fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub(crate) fn with_init_error(mut self, reason: &str) -> Self {
        self.init_error = Some(reason.to_string());
        self
    }

    /// Encodes block after their lines until `notify` fires or they are cancelled
    pub(crate) fn held_by(mut self, notify: Arc<Notify>) -> Self {
        self.hold = Some(notify);
        self
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

impl EncoderRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(&self) -> BoxFuture<'_, Result<(), String>> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match self.init_error {
                Some(ref reason) => Err(reason.clone()),
                None => Ok(()),
            }
        })
    }

    fn encode(
        &self,
        job: EncodeJob,
        lines: LineSender,
        mut cancel: CancelSignal,
    ) -> BoxFuture<'_, Result<EncodeOutput, EngineFailure>> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            for line in &self.lines {
                let _ = lines.send(line.clone());
            }

            if let Some(ref hold) = self.hold {
                tokio::select! {
                    _ = hold.notified() => {}
                    _ = cancel.wait_for(|stop| *stop) => return Err(EngineFailure::Cancelled),
                }
            }

            match self.outcome {
                Ok(size_bytes) => Ok(EncodeOutput {
                    path: job.output,
                    size_bytes,
                }),
                Err(ref diagnostic) => Err(EngineFailure::Failed {
                    diagnostic: diagnostic.clone(),
                }),
            }
        })
    }
}
