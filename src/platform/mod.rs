// GitBrowser platform paths
// Config and data directories for Linux, macOS and Windows, selected at compile time.

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
const APP_DIR: &str = "gitbrowser";
#[cfg(not(target_os = "linux"))]
const APP_DIR: &str = "GitBrowser";

fn home() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
}

/// Directory holding `core.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/gitbrowser` or `~/.config/gitbrowser`
/// - **macOS**: `~/Library/Application Support/GitBrowser`
/// - **Windows**: `%APPDATA%/GitBrowser`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
    #[cfg(target_os = "macos")]
    {
        home().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        appdata_dir()
    }
}

/// Directory holding the tab database.
///
/// - **Linux**: `$XDG_DATA_HOME/gitbrowser` or `~/.local/share/gitbrowser`
/// - **macOS**: `~/Library/Application Support/GitBrowser`
/// - **Windows**: `%APPDATA%/GitBrowser`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
    #[cfg(target_os = "macos")]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        appdata_dir()
    }
}

#[cfg(target_os = "linux")]
fn xdg_dir(variable: &str, fallback: &[&str]) -> PathBuf {
    match env::var_os(variable) {
        Some(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => fallback
            .iter()
            .fold(home(), |path, part| path.join(part))
            .join(APP_DIR),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn appdata_dir() -> PathBuf {
    env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| home().join("AppData").join("Roaming"))
        .join(APP_DIR)
}
