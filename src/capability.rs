//! # Capability Probe Module
//!
//! Decide se l'ambiente corrente può eseguire l'encoder.
//!
//! ## Responsabilità:
//! - Legge i segnali dell'ambiente tramite il trait `HostSignals`
//! - I dispositivi mobile sono sempre esclusi (controllo eseguito per primo)
//! - Verifica che la risorsa richiesta dall'engine (il binario `ffmpeg`) sia raggiungibile
//!
//! Il verdetto non viene mai messo in cache: va ricalcolato a ogni avvio di sessione,
//! perché l'utente può sbloccare la risorsa nel frattempo.

use crate::locale::MessageKey;
use crate::platform::PlatformCommands;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Result of probing the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityVerdict {
    Supported,
    BlockedByFilter,
    UnsupportedDevice,
}

impl CapabilityVerdict {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }

    /// Status banner message for this verdict
    pub fn message_key(&self) -> MessageKey {
        match self {
            Self::Supported => MessageKey::StatusSecureConfigured,
            Self::BlockedByFilter => MessageKey::StatusBlockingEngine,
            Self::UnsupportedDevice => MessageKey::MobileNotSupported,
        }
    }
}

impl fmt::Display for CapabilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => write!(f, "supported"),
            Self::BlockedByFilter => write!(f, "engine resource blocked, disable the content blocker"),
            Self::UnsupportedDevice => write!(f, "mobile devices are not supported"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactor {
    Desktop,
    Mobile,
}

/// Ambient signals the prober reads
pub trait HostSignals: Send + Sync {
    fn form_factor(&self) -> FormFactor;

    /// Lightweight check that the engine resource can be reached
    fn engine_reachable(&self) -> BoxFuture<'_, bool>;
}

/// Probe the environment. Mobile form factor short-circuits every other check.
pub async fn probe(signals: &dyn HostSignals) -> CapabilityVerdict {
    if signals.form_factor() == FormFactor::Mobile {
        debug!("Mobile form factor detected, skipping reachability check");
        return CapabilityVerdict::UnsupportedDevice;
    }

    if !signals.engine_reachable().await {
        debug!("Engine resource not reachable");
        return CapabilityVerdict::BlockedByFilter;
    }

    CapabilityVerdict::Supported
}

/// Signals of the machine we are running on
pub struct SystemHost {
    force_mobile: bool,
    engine_path: Option<PathBuf>,
}

impl SystemHost {
    pub fn new(force_mobile: bool, engine_path: Option<PathBuf>) -> Self {
        Self { force_mobile, engine_path }
    }
}

impl HostSignals for SystemHost {
    fn form_factor(&self) -> FormFactor {
        let info = PlatformCommands::system_info();
        if self.force_mobile || matches!(info.os, "android" | "ios") {
            FormFactor::Mobile
        } else {
            FormFactor::Desktop
        }
    }

    fn engine_reachable(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.engine_path {
                Some(ref path) => tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false),
                None => {
                    let platform = PlatformCommands::instance();
                    let available = platform.is_command_available("ffmpeg").await;
                    if !available {
                        if let Some(hint) = platform.missing_tool_hint("ffmpeg") {
                            warn!("{}", hint);
                        }
                    }
                    available
                }
            }
        })
    }
}
