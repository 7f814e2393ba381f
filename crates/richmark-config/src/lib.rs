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

/// Settings shared by every richmark host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persisted document slot.
    pub storage_path: PathBuf,
    /// Signed-in user. Saving and loading are only offered when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Config {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

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

        // Expand shell variables and tilde in the storage path
        config.storage_path =
            Self::expand_path(&config.storage_path).unwrap_or(config.storage_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
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
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/richmark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_expanded() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/richmark/config.toml"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load_from_path(temp_dir.path().join("nonexistent.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/dir/config.toml");
        let config = Config::new("/tmp/richmark-docs").with_user("ada");

        config.save_to_path(&config_file).unwrap();

        assert!(config_file.exists());
        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn user_is_optional() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "storage_path = \"/srv/docs\"\n").unwrap();

        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(loaded, Config::new("/srv/docs"));

        // An absent user is left out when writing back
        loaded.save_to_path(&config_file).unwrap();
        let written = std::fs::read_to_string(&config_file).unwrap();
        assert!(!written.contains("user"));
    }

    #[test]
    fn tilde_in_storage_path_is_expanded() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "storage_path = \"~/richmark\"\n").unwrap();

        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();
        let path = loaded.storage_path.to_string_lossy();
        assert!(!path.starts_with('~'));
        assert!(path.ends_with("richmark"));
    }

    #[test]
    fn env_var_in_storage_path_is_expanded() {
        unsafe {
            env::set_var("RICHMARK_TEST_ROOT", "/custom/root");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "storage_path = \"$RICHMARK_TEST_ROOT/docs\"\nuser = \"ada\"\n",
        )
        .unwrap();

        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(loaded.storage_path, PathBuf::from("/custom/root/docs"));
        assert_eq!(loaded.user.as_deref(), Some("ada"));

        unsafe {
            env::remove_var("RICHMARK_TEST_ROOT");
        }
    }

    #[test]
    fn unexpandable_path_is_kept() {
        let path = PathBuf::from("$RICHMARK_SURELY_UNSET_VAR/docs");
        assert_eq!(Config::expand_path(&path), None);
    }

    #[test]
    fn parse_failure_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "storage_path = 42\n").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn read_failure_is_distinct() {
        let temp_dir = TempDir::new().unwrap();
        // A directory exists but cannot be read as a file
        let error = Config::load_from_path(temp_dir.path()).unwrap_err();
        assert!(matches!(error, ConfigError::ConfigReadError { .. }));
    }
}
