//! Default paths for lapse components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/lapse/config.toml` or `~/.config/lapse/config.toml`
//! - Data: `$XDG_DATA_HOME/lapse` or `~/.local/share/lapse`
//!
//! The data directory holds the inventory snapshot, the instruction journal
//! and the run history database.

use std::path::{Path, PathBuf};

/// Environment variable for overriding the config file path
pub const LAPSE_CONFIG_ENV: &str = "LAPSE_CONFIG";

/// Environment variable for overriding the data directory
pub const LAPSE_DATA_DIR_ENV: &str = "LAPSE_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "lapse";

const CONFIG_FILENAME: &str = "config.toml";
const INVENTORY_FILENAME: &str = "instances.json";
const JOURNAL_FILENAME: &str = "instructions.ndjson";
const DATABASE_FILENAME: &str = "lapse.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/lapse/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/lapse/config.toml` (fallback)
///
/// `LAPSE_CONFIG` is handled by the CLI argument parser.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$LAPSE_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/lapse` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/lapse` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(LAPSE_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking LAPSE_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Inventory snapshot file inside a data directory
pub fn inventory_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(INVENTORY_FILENAME)
}

/// Instruction journal file inside a data directory
pub fn journal_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(JOURNAL_FILENAME)
}

/// Run history database inside a data directory
pub fn database_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_config_toml() {
        let path = default_config_path();
        assert!(path.ends_with("lapse/config.toml"));
    }

    #[test]
    fn data_dir_contains_lapse() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("lapse"));
    }

    #[test]
    fn data_files_live_in_data_dir() {
        let dir = PathBuf::from("/var/lib/lapse");
        assert_eq!(inventory_path_in(&dir), dir.join("instances.json"));
        assert_eq!(journal_path_in(&dir), dir.join("instructions.ndjson"));
        assert_eq!(database_path_in(&dir), dir.join("lapse.db"));
    }
}
