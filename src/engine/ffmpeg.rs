//! # FFmpeg Runtime
//!
//! Implementazione nativa di `EncoderRuntime` basata sul binario `ffmpeg`.
//!
//! ## Pipeline di compressione:
//! 1. Costruisce gli argomenti dall'`EncodeSpec` (CRF primario, bitrate come hint)
//! 2. Lancia `ffmpeg` con stderr in pipe e scrive su un file temporaneo
//! 3. Inoltra ogni riga di stderr (le statistiche usano `\r`) nell'ordine in cui arriva
//! 4. In caso di cancellazione termina il processo figlio
//! 5. Copia il file temporaneo nella destinazione finale
//!
//! ## Bitrate hint:
//! - H.264: diventa il tetto VBV (`-maxrate` / `-bufsize`)
//! - VP9: diventa il target della modalità constrained quality (`-b:v`)

use super::{CancelSignal, EncodeJob, EncodeOutput, EncoderRuntime, EngineFailure, LineSender};
use crate::params::EncodeSpec;
use crate::platform::PlatformCommands;
use crate::utils::to_string_vec;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::Builder;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Audio bitrate used for every format
const AUDIO_BITRATE: &str = "128k";

/// Encoder runtime driving an `ffmpeg` child process
pub struct FfmpegRuntime {
    binary: PathBuf,
}

impl FfmpegRuntime {
    /// Use `binary` if given, otherwise the bundled or system `ffmpeg`
    pub fn new(binary: Option<PathBuf>) -> Self {
        let binary = binary.unwrap_or_else(|| PlatformCommands::instance().get_tool_path("ffmpeg"));
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command line for one encode
    pub fn build_args(spec: &EncodeSpec, input: &Path, output: &Path) -> Vec<String> {
        let crf = spec.quality_factor.to_string();
        let bitrate = spec.bitrate_label();

        let mut args = to_string_vec(["-hide_banner", "-nostdin", "-y"]);
        args.extend(to_string_vec(["-i", &*input.to_string_lossy()]));
        args.extend(to_string_vec(["-c:v", spec.codec, "-crf", crf.as_str()]));

        if spec.is_vp9() {
            args.extend(to_string_vec([
                "-b:v", bitrate.as_str(),
                "-deadline", "good",
                "-cpu-used", "4",
                "-row-mt", "1",
            ]));
        } else {
            let bufsize = format!("{}k", spec.bitrate_hint_kbps * 2);
            args.extend(to_string_vec([
                "-preset", "medium",
                "-maxrate", bitrate.as_str(),
                "-bufsize", bufsize.as_str(),
                "-pix_fmt", "yuv420p",
            ]));
        }

        args.extend(to_string_vec(["-c:a", spec.audio_codec, "-b:a", AUDIO_BITRATE]));

        if matches!(spec.container, "mp4" | "mov") {
            args.extend(to_string_vec(["-movflags", "+faststart"]));
        }

        args.extend(to_string_vec(["-f", spec.container, &*output.to_string_lossy()]));
        args
    }

    async fn run_encode(
        &self,
        job: EncodeJob,
        lines: LineSender,
        mut cancel: CancelSignal,
    ) -> Result<EncodeOutput, EngineFailure> {
        let cancelled = *cancel.borrow();
        if cancelled {
            return Err(EngineFailure::Cancelled);
        }

        let temp_file = Builder::new()
            .prefix("panda_")
            .suffix(&format!(".{}", job.spec.extension()))
            .tempfile()
            .map_err(io_failure)?;
        let args = Self::build_args(&job.spec, &job.input, temp_file.path());
        debug!("Spawning {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineFailure::Failed {
                diagnostic: format!("Failed to execute {}: {}", self.binary.display(), e),
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| EngineFailure::Failed {
            diagnostic: "ffmpeg stderr not captured".to_string(),
        })?;

        let mut splitter = LineSplitter::default();
        let mut last_line: Option<String> = None;
        let mut buf = [0u8; 4096];
        let mut cancel_open = true;

        loop {
            tokio::select! {
                read = stderr.read(&mut buf) => {
                    let n = read.map_err(io_failure)?;
                    if n == 0 {
                        break;
                    }
                    for line in splitter.push(&buf[..n]) {
                        let _ = lines.send(line.clone());
                        last_line = Some(line);
                    }
                }
                changed = cancel.changed(), if cancel_open => {
                    let stop = changed.is_ok() && *cancel.borrow();
                    if changed.is_err() {
                        cancel_open = false;
                    } else if stop {
                        warn!("Cancelling encode of {}", job.input.display());
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill ffmpeg: {}", e);
                        }
                        return Err(EngineFailure::Cancelled);
                    }
                }
            }
        }

        if let Some(line) = splitter.finish() {
            let _ = lines.send(line.clone());
            last_line = Some(line);
        }

        let status = child.wait().await.map_err(io_failure)?;
        if !status.success() {
            let diagnostic = last_line.unwrap_or_else(|| format!("ffmpeg exited with {}", status));
            return Err(EngineFailure::Failed { diagnostic });
        }

        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_failure)?;
        }
        tokio::fs::copy(temp_file.path(), &job.output).await.map_err(io_failure)?;
        let size_bytes = tokio::fs::metadata(&job.output).await.map_err(io_failure)?.len();

        Ok(EncodeOutput {
            path: job.output,
            size_bytes,
        })
    }
}

impl EncoderRuntime for FfmpegRuntime {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn initialize(&self) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            let output = Command::new(&self.binary)
                .args(["-hide_banner", "-version"])
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| format!("Failed to execute {}: {}", self.binary.display(), e))?;

            if !output.status.success() {
                return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
            }

            let version = String::from_utf8_lossy(&output.stdout);
            debug!("{}", version.lines().next().unwrap_or_default());
            Ok(())
        })
    }

    fn encode(
        &self,
        job: EncodeJob,
        lines: LineSender,
        cancel: CancelSignal,
    ) -> BoxFuture<'_, Result<EncodeOutput, EngineFailure>> {
        Box::pin(self.run_encode(job, lines, cancel))
    }
}

fn io_failure(e: std::io::Error) -> EngineFailure {
    EngineFailure::Failed {
        diagnostic: e.to_string(),
    }
}

/// Splits a byte stream on `\n` and `\r`, dropping blank lines
#[derive(Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}
