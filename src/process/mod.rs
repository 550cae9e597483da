use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::engine::models::non_blank;
use crate::env::{join_normalized, resolve_against};

const PACKAGE_DESCRIPTOR: &str = "package.json";

/// Side effects the launcher hands off to the operating system.
pub trait ExternalLauncher: Send + Sync {
    /// Start the game executable detached from the launcher.
    fn launch_game(&self, executable: &Path) -> Result<(), String>;

    /// Open a URL or file with the platform's default handler.
    fn open(&self, target: &str) -> Result<(), String>;
}

#[derive(Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ExternalLauncher for ProcessLauncher {
    fn launch_game(&self, executable: &Path) -> Result<(), String> {
        if !executable.is_file() {
            warn!("launch: client not found at {}", executable.display());
            return Err(format!("game client not found at {}", executable.display()));
        }

        let mut cmd = Command::new(executable);
        if let Some(dir) = executable.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            // DETACHED_PROCESS
            cmd.creation_flags(0x00000008);
        }

        debug!("launch: spawning {}", executable.display());
        cmd.spawn()
            .map_err(|e| format!("failed to start game process: {e}"))?;
        info!("launch: process started");
        Ok(())
    }

    fn open(&self, target: &str) -> Result<(), String> {
        debug!("open: {target}");
        open::that_detached(target).map_err(|e| format!("failed to open {target}: {e}"))
    }
}

#[derive(Deserialize)]
struct PackageDescriptor {
    executable: Option<String>,
}

/// Locate the game executable.
///
/// A configured path wins (absolute, or relative to the client directory);
/// otherwise the `executable` key of `<client>/package.json` is used.
pub fn resolve_game_executable(setting: Option<&str>, client_dir: &Path) -> Option<PathBuf> {
    if let Some(setting) = setting.map(str::trim).filter(|s| !s.is_empty()) {
        return Some(resolve_against(client_dir, setting));
    }

    let descriptor = client_dir.join(PACKAGE_DESCRIPTOR);
    let raw = std::fs::read(&descriptor).ok()?;
    match serde_json::from_slice::<PackageDescriptor>(&raw) {
        Ok(package) => {
            non_blank(&package.executable).map(|exe| join_normalized(client_dir, exe))
        }
        Err(err) => {
            warn!("launch: failed to read {}: {err}", descriptor.display());
            None
        }
    }
}
