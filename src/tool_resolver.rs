//! # Tool Path Resolver
//!
//! Finds the encoder binaries in the places they can live:
//! - a bundled `tools/` directory next to the executable
//! - a directory given through `PANDA_TOOLS_DIR`
//! - the system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tools the engine runtime needs
pub const ENGINE_TOOLS: [&str; 1] = ["ffmpeg"];

/// Tool path resolver for bundled and system-installed binaries
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    pub fn new() -> Self {
        Self {
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Resolver that only looks in `tools_dir` and `PATH`
    pub fn with_tools_dir(tools_dir: PathBuf) -> Self {
        Self {
            tools_dir: Some(tools_dir),
        }
    }

    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        if let Ok(tools_dir) = env::var("PANDA_TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking PANDA_TOOLS_DIR: {:?}", tools_path);
            if tools_path.exists() {
                return Some(tools_path);
            }
        }

        let exe_path = env::current_exe().ok()?;
        let app_dir = exe_path.parent()?;
        let possible_paths = [
            app_dir.join("tools"),
            app_dir.join("resources").join("tools"),
        ];

        for path in &possible_paths {
            debug!("Checking bundled tools path: {:?}", path);
            if path.exists() {
                return Some(path.clone());
            }
        }

        debug!("No bundled tools directory found");
        None
    }

    /// Resolve the path to a specific tool, bundled copy first
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = Self::bundled_tool_path(tools_dir, tool_name);
            if bundled_path.exists() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        if let Some(system_path) = Self::find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        warn!("Tool not found: {}", tool_name);
        None
    }

    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "macos") { "darwin" } else { env::consts::OS };
        let file_name = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);

        // tools/{platform}/{tool} wins over tools/{tool}
        let platform_path = tools_dir.join(platform).join(&file_name);
        if platform_path.exists() {
            return platform_path;
        }
        tools_dir.join(file_name)
    }

    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let tool_with_ext = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);
        let path_var = env::var_os("PATH")?;

        env::split_paths(&path_var)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Check if a tool is available and provide installation instructions if not
    pub fn check_tool_with_instructions(&self, tool_name: &str) -> Result<PathBuf, String> {
        match self.resolve_tool(tool_name) {
            Some(path) => Ok(path),
            None if cfg!(target_os = "linux") => Err(format!(
                "Tool '{}' not found in PATH.\nTo install on Linux, run:\n  sudo apt-get install ffmpeg",
                tool_name
            )),
            None => Err(format!(
                "Tool '{}' not found. Install ffmpeg or place it in a tools/ directory next to the executable.",
                tool_name
            )),
        }
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("Engine tools:\n");
        for tool in ENGINE_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!("  ❌ {} (not found)\n", tool)),
            }
        }
        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_tool_wins() {
        let dir = TempDir::new().unwrap();
        let bundled = dir.path().join(format!("ffmpeg{}", env::consts::EXE_SUFFIX));
        std::fs::write(&bundled, b"").unwrap();

        let resolver = ToolPathResolver::with_tools_dir(dir.path().to_path_buf());
        assert_eq!(resolver.resolve_tool("ffmpeg"), Some(bundled));
    }

    #[test]
    fn test_missing_tool_has_instructions() {
        let dir = TempDir::new().unwrap();
        let resolver = ToolPathResolver::with_tools_dir(dir.path().to_path_buf());
        let err = resolver
            .check_tool_with_instructions("definitely-not-an-encoder")
            .unwrap_err();
        assert!(err.contains("definitely-not-an-encoder"));
    }
}
