//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform per trovare il binario
//! dell'engine (bundled o di sistema).

use crate::tool_resolver::ToolPathResolver;
use std::env::consts;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Program used to look a command up on `PATH`
const WHICH: &str = if cfg!(windows) { "where" } else { "which" };

/// Engine binary lookup shared by the whole process
pub struct PlatformCommands {
    tool_resolver: ToolPathResolver,
}

impl PlatformCommands {
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(|| Self {
            tool_resolver: ToolPathResolver::new(),
        })
    }

    /// Executable name of a tool on this platform
    pub fn command_name(base_name: &str) -> String {
        format!("{}{}", base_name, consts::EXE_SUFFIX)
    }

    /// True if the tool is bundled or known to `which`/`where`
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        if self.tool_resolver.is_tool_available(base_name) {
            return true;
        }

        tokio::process::Command::new(WHICH)
            .arg(Self::command_name(base_name))
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Resolved path to a tool, falling back to the bare command name
    pub fn get_tool_path(&self, base_name: &str) -> PathBuf {
        self.tool_resolver
            .resolve_tool(base_name)
            .unwrap_or_else(|| PathBuf::from(Self::command_name(base_name)))
    }

    /// Installation hint for a tool that cannot be found
    pub fn missing_tool_hint(&self, base_name: &str) -> Option<String> {
        self.tool_resolver.check_tool_with_instructions(base_name).err()
    }

    pub fn get_tools_report(&self) -> String {
        self.tool_resolver.get_tools_report()
    }

    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: consts::OS,
            arch: consts::ARCH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_name() {
        assert!(PlatformCommands::command_name("ffmpeg").starts_with("ffmpeg"));
        assert!(PlatformCommands::command_name("ffmpeg").ends_with(consts::EXE_SUFFIX));
    }

    #[test]
    fn test_missing_tool_hint() {
        let platform = PlatformCommands::instance();
        let hint = platform.missing_tool_hint("definitely-not-an-encoder");
        assert!(hint.is_some_and(|h| h.contains("definitely-not-an-encoder")));
    }

    #[test]
    fn test_system_info() {
        let info = PlatformCommands::system_info();
        assert!(!info.os.is_empty());
        assert!(info.to_string().contains(info.arch));
    }
}
