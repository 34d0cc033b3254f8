// TOML config adapter - Configuration file loading and saving

use std::path::{Path, PathBuf};

use crate::config_initialization::AppConfig;
use crate::domain::errors::*;

/// Locations searched when no config file is given explicitly
const DEFAULT_CONFIG_PATHS: &[&str] = &["config/splitx.toml", "splitx.toml"];

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    search_paths: Vec<PathBuf>,
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TomlConfigAdapter {
    /// Create new TOML config adapter with the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Resolve which file to load: the explicit path if it exists, otherwise
    /// the first existing search path
    pub fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => path.exists().then(|| path.to_path_buf()),
            None => self.search_paths.iter().find(|p| p.exists()).cloned(),
        }
    }

    /// Load configuration from file. Missing keys keep their defaults.
    pub fn load(&self, file_path: &Path) -> Result<AppConfig, DomainError> {
        let content = std::fs::read_to_string(file_path).map_err(|e| {
            DomainError::Config(format!(
                "Failed to read config file {}: {}",
                file_path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Deserialize config from TOML string
    pub fn parse(toml_content: &str) -> Result<AppConfig, DomainError> {
        toml::from_str(toml_content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig, file_path: &Path) -> Result<(), DomainError> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::FsFail(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| DomainError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(file_path, content)
            .map_err(|e| DomainError::FsFail(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }
}
