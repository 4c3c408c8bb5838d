//! Default file locations for cmscale
//!
//! # Environment Variables
//!
//! - `CMSCALE_CONFIG_DIR` - Override config directory
//! - `CMSCALE_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CMSCALE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/cmscale` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\cmscale`
//!    - macOS/Linux: `~/.config/cmscale`
//!
//! For state_dir():
//! 1. `CMSCALE_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/cmscale` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\cmscale`
//!    - macOS/Linux: `~/.local/state/cmscale`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CMSCALE_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "CMSCALE_STATE_DIR";

const APP_DIR: &str = "cmscale";

/// Configuration file name inside the config directory.
pub const CONFIG_FILE: &str = "cmscale.conf";

/// Host list file name inside the config directory.
pub const HOSTS_FILE: &str = "hosts.txt";

/// Checkpoint file name inside the state directory.
pub const STATE_FILE: &str = "scale.state";

/// Get the cmscale config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the cmscale state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Resolve an explicit path, or fall back to `name` inside `dir`.
fn resolve(explicit: Option<&str>, dir: fn() -> Result<PathBuf>, name: &str) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(path)),
        None => Ok(dir()?.join(name)),
    }
}

/// Configuration file: `--config`, else `<config_dir>/cmscale.conf`.
pub fn config_file(explicit: Option<&str>) -> Result<PathBuf> {
    resolve(explicit, config_dir, CONFIG_FILE)
}

/// Host list: `--hosts`, else `<config_dir>/hosts.txt`.
pub fn hosts_file(explicit: Option<&str>) -> Result<PathBuf> {
    resolve(explicit, config_dir, HOSTS_FILE)
}

/// Checkpoint file: `--state-file`, else `<state_dir>/scale.state`.
pub fn state_file(explicit: Option<&str>) -> Result<PathBuf> {
    resolve(explicit, state_dir, STATE_FILE)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/cmscale/config", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/cmscale/config"));
        });
    }

    #[test]
    fn test_state_file_under_state_dir() {
        with_env_var(ENV_STATE_DIR, "/custom/cmscale/state", || {
            assert_eq!(
                state_file(None).unwrap(),
                PathBuf::from("/custom/cmscale/state/scale.state")
            );
        });
    }

    #[test]
    fn test_xdg_state_home() {
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-cmscale-state", || {
                assert_eq!(
                    state_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-cmscale-state/cmscale")
                );
            });
        });
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            hosts_file(Some("/srv/inventory/hosts")).unwrap(),
            PathBuf::from("/srv/inventory/hosts")
        );
        assert_eq!(
            config_file(Some("/etc/cmscale.conf")).unwrap(),
            PathBuf::from("/etc/cmscale.conf")
        );
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$CMSCALE_NONEXISTENT_12345/file");
        assert_eq!(result, PathBuf::from("/path/$CMSCALE_NONEXISTENT_12345/file"));
    }
}
