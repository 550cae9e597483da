use std::env;
use std::path::{Path, PathBuf};

const HOME_OVERRIDE_VAR: &str = "CRYSTAL_LAUNCHER_HOME";
const CONFIG_FILE: &str = "launcher.json";
const TEMPLATE_FILE: &str = "launcher.template.json";

/// Returns the root directory the launcher resolves relative paths against.
///
/// Defaults to the directory holding the launcher executable; the
/// `CRYSTAL_LAUNCHER_HOME` variable overrides it.
pub fn base_dir() -> PathBuf {
    if let Some(home) = env::var_os(HOME_OVERRIDE_VAR).filter(|value| !value.is_empty()) {
        return PathBuf::from(home);
    }

    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir(base: &Path) -> PathBuf {
    base.join("Config")
}

pub fn config_path(base: &Path) -> PathBuf {
    config_dir(base).join(CONFIG_FILE)
}

pub fn template_path(base: &Path) -> PathBuf {
    config_dir(base).join(TEMPLATE_FILE)
}

pub fn default_client_dir(base: &Path) -> PathBuf {
    base.join("Client")
}

/// Join a relative path written with either separator onto `root`.
pub fn join_normalized(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
    {
        path.push(part);
    }
    path
}

/// Resolve `setting` against `root` unless it is already absolute.
pub fn resolve_against(root: &Path, setting: &str) -> PathBuf {
    let candidate = Path::new(setting);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        join_normalized(root, setting)
    }
}
