//! Path management for Storyloom configuration and session files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/storyloom/         # Config directory
//! ├── config.toml              # Application configuration
//! └── sessions/                # One <session_id>.json per session record
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "storyloom";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves Storyloom paths from the platform config directory.
pub struct StoryloomPaths;

impl StoryloomPaths {
    /// Returns `~/.config/storyloom/` or the platform equivalent.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_the_config_dir() {
        // Containers without a home directory have no config dir at all.
        let Ok(config_dir) = StoryloomPaths::config_dir() else {
            return;
        };
        assert!(config_dir.ends_with(APP_DIR));
        assert_eq!(
            StoryloomPaths::config_file().unwrap(),
            config_dir.join("config.toml")
        );
        assert_eq!(
            StoryloomPaths::sessions_dir().unwrap(),
            config_dir.join("sessions")
        );
    }
}
