//! Browser-binary verification used by `McpSupervisor::start`.
//!
//! Search order mirrors the teacher's `browser_setup::find_browser_executable`:
//! an env-var override, then per-OS well-known install paths, then a `which`
//! lookup on `$PATH`.

use std::path::PathBuf;
use tracing::{info, warn};

const ENV_OVERRIDE: &str = "CHROMIUM_PATH";

fn well_known_paths() -> Vec<&'static str> {
    if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
        ]
    }
}

/// Locate an installed Chrome/Chromium binary, or `None` if nothing was found.
///
/// Does not attempt to install anything; that is `McpSupervisor::start`'s job.
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_OVERRIDE) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(path = %path.display(), "using browser from {ENV_OVERRIDE}");
            return Some(path);
        }
        warn!(path = %path.display(), "{ENV_OVERRIDE} points to a non-existent file");
    }

    for candidate in well_known_paths() {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_when_present() {
        let exe = std::env::current_exe().unwrap();
        // SAFETY: test runs single-threaded w.r.t. this env var.
        unsafe {
            std::env::set_var(ENV_OVERRIDE, &exe);
        }
        let found = find_browser_executable();
        unsafe {
            std::env::remove_var(ENV_OVERRIDE);
        }
        assert_eq!(found, Some(exe));
    }

    #[test]
    fn nonexistent_override_falls_through_without_panicking() {
        unsafe {
            std::env::set_var(ENV_OVERRIDE, "/does/not/exist/chrome");
        }
        let _ = find_browser_executable();
        unsafe {
            std::env::remove_var(ENV_OVERRIDE);
        }
    }
}
