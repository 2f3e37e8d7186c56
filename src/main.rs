//! # Panda Compress - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento configurazione (file JSON + override da CLI)
//! - Creazione dell'unica istanza di engine e del compressor
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, quality, format, output, locale, ...)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Per ogni video: probe dell'ambiente, load dell'engine, sessione, report
//! 4. Ctrl-C cancella la sessione in corso
//!
//! ## Esempio di utilizzo:
//! ```bash
//! panda-compress holiday.mov --quality 2 --format webm --locale de-DE
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use panda_compress::capability::{probe, SystemHost};
use panda_compress::file_manager::FileManager;
use panda_compress::json_output::JsonMessage;
use panda_compress::platform::PlatformCommands;
use panda_compress::progress::{BatchStats, ProgressManager};
use panda_compress::report::{self, LocalizedReport};
use panda_compress::session::{CompressionSession, ProgressEvent, ProgressLine, SessionState};
use panda_compress::{
    Catalog, CompressError, Compressor, Config, EngineManager, FfmpegRuntime, InputFile, Locale,
    LocalizedMessage, Localizer, MessageKey, OutputFormat, QualityLevel,
};

#[derive(Parser)]
#[command(name = "panda-compress")]
#[command(about = "Compress videos locally with quality presets and live encoder output")]
struct Args {
    /// Video file, or directory of videos, to compress
    input: PathBuf,

    /// Quality level (0 = smallest file, 5 = best quality)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Output container format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Message language (en-US, de-DE)
    #[arg(short, long)]
    locale: Option<Locale>,

    /// Configuration file (default: ~/.panda-compress/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Emit JSON lines instead of the progress spinner
    #[arg(long)]
    json: bool,

    /// Store the effective settings in the configuration file
    #[arg(long)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Running on {}", PlatformCommands::system_info());

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args)?;

    if !args.input.exists() {
        return Err(anyhow::anyhow!("Input does not exist: {}", args.input.display()));
    }

    if let Some(ref output_dir) = config.output_path {
        if !output_dir.exists() {
            tokio::fs::create_dir_all(output_dir).await?;
            info!("Created output directory: {}", output_dir.display());
        }
    }
    config.validate()?;

    if args.save_config {
        if let Some(ref path) = config_path {
            config.save_to_file(path).await?;
            info!("Saved configuration to {}", path.display());
        }
    }

    let catalog = Catalog::new(config.locale);
    debug!("Messages in {}", catalog.locale());
    let files = if args.input.is_dir() {
        FileManager::find_video_files(&args.input)?
    } else {
        vec![args.input.clone()]
    };

    if files.is_empty() {
        let message = catalog.render(&LocalizedMessage::new(MessageKey::NoFileMessage));
        return Err(anyhow::anyhow!("{}: {}", catalog.render(&LocalizedMessage::new(MessageKey::NoFileTitle)), message));
    }

    // the one engine instance of this process
    let runtime = Arc::new(FfmpegRuntime::new(config.ffmpeg_path.clone()));
    let engine = Arc::new(EngineManager::new(runtime));
    let compressor = Compressor::new(Arc::clone(&engine)).with_output_dir(config.output_path.clone());
    let host = SystemHost::new(config.force_mobile, config.ffmpeg_path.clone());

    let mut stats = BatchStats::new();
    for path in &files {
        // never cached: the user may fix a blocked engine between files
        let verdict = probe(&host).await;
        if !verdict.is_supported() {
            let message = catalog.render(&LocalizedMessage::new(verdict.message_key()));
            report_app_error(&config, &message);
            debug!("{}", PlatformCommands::instance().get_tools_report());
            return Err(CompressError::Capability(verdict).into());
        }

        if !engine.is_ready() {
            if !config.json_output {
                eprintln!("{}", catalog.render(&LocalizedMessage::new(MessageKey::EngineInitializing)));
            }
            if let Err(e) = engine.load(verdict).await {
                report_app_error(&config, &e.to_string());
                return Err(e.into());
            }
            if !config.json_output {
                eprintln!("{}", catalog.render(&LocalizedMessage::new(MessageKey::EngineReady)));
            }
        }

        match compress_one(&compressor, &config, &catalog, path).await? {
            LocalizedReport::Success { result, .. } => stats.add_success(&result),
            LocalizedReport::Failure { .. } => stats.add_failure(),
        }
    }

    if files.len() > 1 && !config.json_output {
        info!("{}", stats.format_summary());
    }

    if stats.failed > 0 {
        return Err(anyhow::anyhow!("{} of {} videos failed", stats.failed, stats.sessions));
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(level) = args.quality {
        config.quality_level = QualityLevel::new(level)?;
    }
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if let Some(ref output) = args.output {
        config.output_path = Some(output.clone());
    }
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    if let Some(ref ffmpeg) = args.ffmpeg {
        config.ffmpeg_path = Some(ffmpeg.clone());
    }
    if args.json {
        config.json_output = true;
    }
    Ok(())
}

fn report_app_error(config: &Config, message: &str) {
    if config.json_output {
        JsonMessage::error(None, message.to_string()).emit();
    } else {
        eprintln!("{}", message);
    }
}

/// Run one session to completion and print its report
async fn compress_one(
    compressor: &Compressor,
    config: &Config,
    catalog: &Catalog,
    path: &Path,
) -> Result<LocalizedReport> {
    let input = InputFile::from_path(path).await?;
    let session = compressor.create_session();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
    let progress = (!config.json_output).then(|| ProgressManager::new(&file_name));

    if config.json_output {
        JsonMessage::start(
            session.id(),
            input.path.clone(),
            input.size_bytes,
            config.quality_level,
            config.output_format,
        )
        .emit();
    }

    let started = compressor
        .start(&session, input, config.quality_level, config.output_format, tx)
        .await;

    match started {
        Ok(()) => {}
        // invalid input still leaves a failed session to report on
        Err(CompressError::InvalidInput(_)) if session.state() == SessionState::Failed => {}
        Err(e) => return Err(e.into()),
    }

    let mut cancel_requested = false;
    loop {
        tokio::select! {
            Some(event) = rx.recv() => show_event(&event, catalog, progress.as_ref(), &session),
            _ = session.wait() => break,
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                session.cancel();
            }
        }
    }
    while let Ok(event) = rx.try_recv() {
        show_event(&event, catalog, progress.as_ref(), &session);
    }

    let report = report::report(&session)?;
    let title = catalog.render(&report.title());
    let message = catalog.render(&report.message());

    match report {
        LocalizedReport::Success { ref result, ref output_path } => {
            if config.json_output {
                JsonMessage::complete(session.id(), output_path.clone(), result, message).emit();
            } else if let Some(ref progress) = progress {
                progress.finish(&title);
                println!("{}\n{}\n{}", title, message, output_path.display());
            }
        }
        LocalizedReport::Failure { .. } => {
            if config.json_output {
                JsonMessage::error(Some(session.id()), message).emit();
            } else if let Some(ref progress) = progress {
                progress.finish(&title);
                eprintln!("{}\n{}", title, message);
            }
        }
    }

    Ok(report)
}

fn show_event(event: &ProgressEvent, catalog: &Catalog, progress: Option<&ProgressManager>, session: &CompressionSession) {
    let line = event.render(catalog);
    match progress {
        None => JsonMessage::progress(session.id(), line).emit(),
        Some(progress) => match event.line {
            ProgressLine::Engine(_) => progress.set_message(&line),
            ProgressLine::Status(_) => progress.println(&line),
        },
    }
}
