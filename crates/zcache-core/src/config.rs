//! Configuration for the chunk cache sizing knobs.
//!
//! Supports TOML configuration files with sensible defaults, layered the
//! same way the rest of this codebase loads settings:
//! - Linux: ~/.config/zcache/config.toml
//! - macOS: ~/Library/Application Support/zcache/config.toml
//! - Windows: %APPDATA%/zcache/config.toml
//!
//! This only configures cache *sizing*; which variables exist and how a
//! dataset is opened is out of scope for this crate.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Cache sizing knobs surfaced to users (§6 of the design: byte budget,
/// advisory entry count, preemption, default separator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Default per-variable cache byte budget.
    pub default_cache_bytes: u64,
    /// Advisory entry count hint (not consulted for sizing).
    pub default_cache_nelems: usize,
    /// Default preemption value in `[0, 1]`.
    pub default_preemption: f32,
    /// Default dimension separator (`.` or `/`).
    pub default_separator: char,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_cache_bytes: 16 * 1024 * 1024, // 16MB
            default_cache_nelems: 0,
            default_preemption: 0.0,
            default_separator: '.',
        }
    }
}

impl CacheSettings {
    /// Load settings from the default config path, falling back to defaults
    /// on any error (missing file, parse failure, no config dir).
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("failed to load cache config from {:?}: {}, using defaults", path, e);
                Self::default()
            }),
            None => {
                debug!("no config directory found, using defaults");
                Self::default()
            }
        }
    }

    /// Load settings from a specific TOML file, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("cache config {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let settings: CacheSettings =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        info!("loaded cache config from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a specific TOML file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Default config file path for this platform, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "zcache").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Errors from loading or saving [`CacheSettings`].
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// I/O error reading or writing the config file.
    Io(String),
    /// TOML parse error.
    Parse(String),
    /// TOML serialize error.
    Serialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.default_cache_bytes, 16 * 1024 * 1024);
        assert_eq!(settings.default_separator, '.');
    }

    #[test]
    fn roundtrip_toml() {
        let settings = CacheSettings::default();
        let toml_str = toml::to_string(&settings).unwrap();
        let parsed: CacheSettings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = "default_cache_bytes = 4096\n";
        let settings: CacheSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.default_cache_bytes, 4096);
        assert_eq!(settings.default_preemption, 0.0);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let settings = CacheSettings::load_from(Path::new("/nonexistent/zcache.toml")).unwrap();
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = CacheSettings::default();
        settings.default_cache_bytes = 99_999;
        settings.save_to(&path).unwrap();

        let loaded = CacheSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }
}
