//! Application settings.
//!
//! Settings are read from a TOML file and provide the defaults for a run plus
//! the location of the persisted category table. Command-line flags override
//! them.
//!
//! # Configuration File Format
//!
//! ```toml
//! categories_path = "/home/me/.config/dirsort/folders_config.json"
//!
//! [organize]
//! create_folders = true
//! include_hidden = false
//! preview = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory settings file.
pub const LOCAL_SETTINGS_FILE: &str = ".dirsortrc.toml";

/// File name of the persisted category table.
pub const CATEGORIES_FILE: &str = "folders_config.json";

/// Errors that can occur while reading or writing configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Reading or writing failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid TOML syntax or structure.
    #[error("Invalid settings in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Invalid or unserializable JSON.
    #[error("Invalid category file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Where the category table is persisted. Defaults to
    /// `~/.config/dirsort/folders_config.json`.
    #[serde(default)]
    pub categories_path: Option<PathBuf>,

    /// Defaults for `organize`.
    #[serde(default)]
    pub organize: RunDefaults,
}

/// Default values for the per-run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default = "default_create_folders")]
    pub create_folders: bool,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub preview: bool,
}

fn default_create_folders() -> bool {
    true
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            create_folders: default_create_folders(),
            include_hidden: false,
            preview: false,
        }
    }
}

impl Settings {
    /// Loads settings, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (it must exist)
    /// 2. `.dirsortrc.toml` in the current directory
    /// 3. `~/.config/dirsort/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly requested) but
    /// cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(LOCAL_SETTINGS_FILE);
        if local.exists() {
            return Self::load_from_file(&local);
        }

        if let Some(dir) = config_dir() {
            let home_config = dir.join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Loads settings from one file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The category table location: the configured path, else the per-user
    /// config directory, else the current directory.
    pub fn categories_path(&self) -> PathBuf {
        match &self.categories_path {
            Some(path) => path.clone(),
            None => config_dir()
                .map(|dir| dir.join(CATEGORIES_FILE))
                .unwrap_or_else(|| PathBuf::from(CATEGORIES_FILE)),
        }
    }
}

/// `~/.config/dirsort`, if `HOME` is set.
fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".config").join("dirsort"))
}
