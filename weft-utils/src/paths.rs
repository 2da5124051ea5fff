//! Path utilities for weft
//!
//! Handles XDG Base Directory specification compliance for config,
//! state, and runtime directories.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application identifier for XDG directories
const APP_NAME: &str = "weft";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the runtime directory
///
/// Location: `$XDG_RUNTIME_DIR/weft` or `/tmp/weft-$UID`
pub fn runtime_dir() -> PathBuf {
    if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg_runtime).join(APP_NAME)
    } else {
        // Fallback to /tmp with UID for security
        // SAFETY: getuid() is always safe to call
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
    }
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/weft` or `~/.config/weft`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the engine configuration file path
///
/// Location: `$XDG_CONFIG_HOME/weft/engine.yml`
pub fn engine_config_file() -> PathBuf {
    config_dir().join("engine.yml")
}

/// Get the state directory (persistent state like session data)
///
/// Location: `$XDG_STATE_HOME/weft` or `~/.local/state/weft`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/weft/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Get the directory holding persisted session restore files
///
/// Location: `$XDG_STATE_HOME/weft/sessions`
pub fn restore_dir() -> PathBuf {
    state_dir().join("sessions")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure all required directories exist
pub fn ensure_all_dirs() -> std::io::Result<()> {
    ensure_dir(&runtime_dir())?;
    ensure_dir(&config_dir())?;
    ensure_dir(&state_dir())?;
    ensure_dir(&log_dir())?;
    ensure_dir(&restore_dir())?;
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // ==================== Runtime Dir Tests ====================

    #[test]
    fn test_runtime_dir_contains_weft() {
        let path = runtime_dir();
        assert!(path.to_string_lossy().contains("weft"));
    }

    #[test]
    fn test_runtime_dir_with_xdg_set() {
        let original = env::var("XDG_RUNTIME_DIR").ok();

        env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        let path = runtime_dir();
        assert_eq!(path, PathBuf::from("/run/user/1000/weft"));

        match original {
            Some(val) => env::set_var("XDG_RUNTIME_DIR", val),
            None => env::remove_var("XDG_RUNTIME_DIR"),
        }
    }

    #[test]
    fn test_runtime_dir_fallback() {
        let original = env::var("XDG_RUNTIME_DIR").ok();

        env::remove_var("XDG_RUNTIME_DIR");
        let path = runtime_dir();
        assert!(path.to_string_lossy().starts_with("/tmp/weft-"));

        if let Some(val) = original {
            env::set_var("XDG_RUNTIME_DIR", val);
        }
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_config_dir_contains_weft() {
        let path = config_dir();
        assert!(path.to_string_lossy().contains("weft"));
    }

    #[test]
    fn test_engine_config_file_name() {
        let path = engine_config_file();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "engine.yml");
        assert!(path.starts_with(config_dir()));
    }

    // ==================== State / Log / Restore Tests ====================

    #[test]
    fn test_state_dir_contains_weft() {
        let path = state_dir();
        assert!(path.to_string_lossy().contains("weft"));
    }

    #[test]
    fn test_log_dir_is_under_state() {
        assert!(log_dir().starts_with(state_dir()));
        assert_eq!(log_dir().file_name().unwrap().to_str().unwrap(), "log");
    }

    #[test]
    fn test_restore_dir_is_under_state() {
        assert!(restore_dir().starts_with(state_dir()));
        assert_eq!(
            restore_dir().file_name().unwrap().to_str().unwrap(),
            "sessions"
        );
    }

    // ==================== ensure_dir Tests ====================

    #[test]
    fn test_ensure_dir_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("subdir");

        let result = ensure_dir(&test_dir);
        assert!(result.is_ok());
        assert!(test_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_nested() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("nested").join("deep");

        assert!(ensure_dir(&test_dir).is_ok());
        assert!(test_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_already_exists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("existing");
        std::fs::create_dir_all(&test_dir).unwrap();

        assert!(ensure_dir(&test_dir).is_ok());
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_fallback_config_dir() {
        let path = fallback_config_dir();
        assert!(path.to_string_lossy().contains(".config"));
        assert!(path.to_string_lossy().contains("weft"));
    }

    #[test]
    fn test_fallback_state_dir() {
        let path = fallback_state_dir();
        assert!(path.to_string_lossy().contains(".local/state"));
        assert!(path.to_string_lossy().contains("weft"));
    }
}
