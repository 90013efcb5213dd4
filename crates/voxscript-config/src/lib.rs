use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// The narration script opened when the editor starts without an
    /// explicit path argument.
    pub script_path: PathBuf,
    /// Duration for freshly inserted pause tokens, in milliseconds. The
    /// engine's default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pause_ms: Option<u64>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded script path
        config.script_path = Self::expand_path(&config.script_path).unwrap_or(config.script_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/voxscript");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/voxscript/config.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            script_path: PathBuf::from("/tmp/narration.json"),
            default_pause_ms: Some(700),
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original.script_path, deserialized.script_path);
        assert_eq!(original.default_pause_ms, deserialized.default_pause_ms);
    }

    #[test]
    fn test_default_pause_is_optional() {
        let config: Config = toml::from_str(r#"script_path = "/tmp/s.json""#).unwrap();
        assert_eq!(config.default_pause_ms, None);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/scripts/narration.json");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("scripts/narration.json"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("VOXSCRIPT_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$VOXSCRIPT_TEST_VAR/script.json");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        assert_eq!(
            expanded.unwrap(),
            PathBuf::from("/test/env/path/script.json")
        );

        unsafe {
            env::remove_var("VOXSCRIPT_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path.json");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let loaded = Config::load_from_path(&missing).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_config_rejects_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "script_path = [not toml").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config {
            script_path: PathBuf::from("/tmp/show.json"),
            default_pause_ms: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.script_path, config.script_path);
        assert_eq!(loaded.default_pause_ms, None);
    }
}
