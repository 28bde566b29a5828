//! Configuration file location and path helpers
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/carta-harness/`
//! - macOS: `~/Library/Application Support/carta-harness/`
//! - Windows: `%APPDATA%\carta-harness\`

use std::path::{Path, PathBuf};

/// Project name used for config and data directories
const PROJECT_NAME: &str = "carta-harness";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve `path` against `base` when it is relative
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Locate an executable.
///
/// Paths with a directory component are used as given; bare names are
/// searched for on `PATH`.
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.exists().then(|| program.to_path_buf());
    }
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_in_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_resolve_relative() {
        let base = Path::new("/scenarios");
        assert_eq!(
            resolve_relative(base, Path::new("images/a.fits")),
            PathBuf::from("/scenarios/images/a.fits")
        );
        assert_eq!(
            resolve_relative(base, Path::new("/data/a.fits")),
            PathBuf::from("/data/a.fits")
        );
    }

    #[test]
    fn test_find_executable_missing_path() {
        assert!(find_executable(Path::new("/definitely/not/here/viewer")).is_none());
    }
}
