//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI > Env > File > Defaults. The resulting [`AppConfig`] is
//! built once at startup and shared read-only afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::toml_config::TomlConfigAdapter;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ArtifactKind;
use crate::planner::{SamplerLimits, DEFAULT_MIN_SEGMENT};

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub planning: PlanningConfig,
    pub jobs: JobsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Directory layout. Relative folder names are resolved against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub uploads_dir: String,
    pub thumbnails_dir: String,
    pub segments_dir: String,
    pub outputs_dir: String,
    pub public_dir: String,
    pub manifest_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            uploads_dir: "uploads".to_string(),
            thumbnails_dir: "thumbnails".to_string(),
            segments_dir: "segments".to_string(),
            outputs_dir: "outputs".to_string(),
            public_dir: "public".to_string(),
            manifest_file: "manifest.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn uploads_path(&self) -> PathBuf {
        self.root.join(&self.uploads_dir)
    }

    pub fn public_path(&self) -> PathBuf {
        self.root.join(&self.public_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_file)
    }

    /// Folder holding every artifact of `kind`
    pub fn kind_path(&self, kind: ArtifactKind) -> PathBuf {
        let folder = match kind {
            ArtifactKind::Thumbnail => &self.thumbnails_dir,
            ArtifactKind::Segment => &self.segments_dir,
            ArtifactKind::Output => &self.outputs_dir,
        };
        self.root.join(folder)
    }

    /// Create every managed directory
    pub fn ensure_directories(&self) -> DomainResult<()> {
        let mut dirs = vec![self.uploads_path(), self.public_path()];
        dirs.extend(ArtifactKind::ALL.iter().map(|k| self.kind_path(*k)));
        for dir in dirs {
            std::fs::create_dir_all(&dir).map_err(|e| {
                DomainError::FsFail(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

/// External tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub thumbnail_max_width: u32,
    /// Extension of concatenated outputs, without the dot
    pub output_extension: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            thumbnail_max_width: 320,
            output_extension: "mp4".to_string(),
        }
    }
}

/// Sampler and partitioner parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub min_thumbnails: usize,
    pub max_thumbnails: usize,
    pub default_thumbnails: usize,
    pub sample_epsilon: f64,
    pub min_segment: f64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        let limits = SamplerLimits::default();
        Self {
            min_thumbnails: limits.min_count,
            max_thumbnails: limits.max_count,
            default_thumbnails: limits.default_count,
            sample_epsilon: limits.epsilon,
            min_segment: DEFAULT_MIN_SEGMENT,
        }
    }
}

impl PlanningConfig {
    pub fn sampler_limits(&self) -> SamplerLimits {
        SamplerLimits {
            min_count: self.min_thumbnails,
            max_count: self.max_thumbnails,
            default_count: self.default_thumbnails,
            epsilon: self.sample_epsilon,
        }
    }
}

/// Worker pool bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub max_concurrent: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().clamp(4, 8),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 4000,
            max_upload_mb: 2048,
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Reject configurations the components cannot work with
    pub fn validate(&self) -> DomainResult<()> {
        let p = &self.planning;
        if p.min_thumbnails == 0 || p.min_thumbnails > p.max_thumbnails {
            return Err(DomainError::Config(format!(
                "Thumbnail bounds must satisfy 0 < min <= max, got {}..{}",
                p.min_thumbnails, p.max_thumbnails
            )));
        }
        if !(p.sample_epsilon.is_finite() && p.sample_epsilon > 0.0) {
            return Err(DomainError::Config("sample_epsilon must be positive".to_string()));
        }
        if !(p.min_segment.is_finite() && p.min_segment > 0.0) {
            return Err(DomainError::Config("min_segment must be positive".to_string()));
        }
        if !(1..=64).contains(&self.jobs.max_concurrent) {
            return Err(DomainError::Config(format!(
                "jobs.max_concurrent must be within 1..=64, got {}",
                self.jobs.max_concurrent
            )));
        }
        if self.media.thumbnail_max_width == 0 {
            return Err(DomainError::Config("thumbnail_max_width cannot be zero".to_string()));
        }
        if self.media.output_extension.is_empty()
            || !self.media.output_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DomainError::Config(format!(
                "Invalid output extension: {:?}",
                self.media.output_extension
            )));
        }
        parse_level(&self.logging.level)?;
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(DomainError::Config(format!(
                "Invalid log format: {}. Valid formats: pretty, json",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_environment<F>(&mut self, lookup: F) -> DomainResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        let mut take = |name: &str| {
            let value = lookup(name);
            if let Some(v) = &value {
                debug!("Found environment override: {} = {}", name, v);
                applied += 1;
            }
            value
        };

        if let Some(v) = take("SPLITX_ROOT") {
            self.storage.root = PathBuf::from(v);
        }
        if let Some(v) = take("SPLITX_FFMPEG") {
            self.media.ffmpeg_path = v;
        }
        if let Some(v) = take("SPLITX_FFPROBE") {
            self.media.ffprobe_path = v;
        }
        if let Some(v) = take("SPLITX_MAX_JOBS") {
            self.jobs.max_concurrent = parse_env_number("SPLITX_MAX_JOBS", &v)?;
        }
        if let Some(v) = take("SPLITX_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = take("SPLITX_LOG_FORMAT") {
            self.logging.format = v;
        }
        if let Some(v) = take("SPLITX_BIND") {
            self.server.bind = v;
        }
        for name in ["PORT", "SPLITX_PORT"] {
            if let Some(v) = take(name) {
                self.server.port = parse_env_number(name, &v)?;
            }
        }

        Ok(applied)
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, value: &str) -> DomainResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::Config(format!("{} is not a valid number: {}", name, value)))
}

/// Parse a log level name
pub fn parse_level(level: &str) -> DomainResult<tracing::Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(tracing::Level::TRACE),
        "debug" => Ok(tracing::Level::DEBUG),
        "info" => Ok(tracing::Level::INFO),
        "warn" => Ok(tracing::Level::WARN),
        "error" => Ok(tracing::Level::ERROR),
        _ => Err(DomainError::Config(format!(
            "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
            level
        ))),
    }
}

/// Overrides taken from command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub root: Option<PathBuf>,
    pub max_jobs: Option<usize>,
    pub port: Option<u16>,
}

/// Build the effective configuration: defaults, then file, then environment, then CLI
pub fn initialize_configuration_hierarchy(cli: &CliOverrides) -> DomainResult<AppConfig> {
    let adapter = TomlConfigAdapter::new();

    let mut config = match adapter.locate(cli.config_file.as_deref()) {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            adapter.load(&path)?
        }
        None => {
            if let Some(explicit) = &cli.config_file {
                return Err(DomainError::Config(format!(
                    "Config file does not exist: {}",
                    explicit.display()
                )));
            }
            debug!("No configuration file found, using defaults");
            AppConfig::default()
        }
    };

    let env_overrides = config.apply_environment(|name| std::env::var(name).ok())?;
    if env_overrides > 0 {
        debug!("Applied {} environment variable overrides", env_overrides);
    }

    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &CliOverrides) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(root) = &cli.root {
        config.storage.root = root.clone();
    }
    if let Some(jobs) = cli.max_jobs {
        config.jobs.max_concurrent = jobs;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
}

/// Storage layout rooted at `root` with every other setting at its default
pub fn config_rooted_at(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.root = root.to_path_buf();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.planning.sampler_limits(), SamplerLimits::default());
        assert!((4..=8).contains(&config.jobs.max_concurrent));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("SPLITX_ROOT", "/srv/splitx"),
            ("SPLITX_MAX_JOBS", "6"),
            ("PORT", "8080"),
            ("SPLITX_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        let applied = config
            .apply_environment(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(config.storage.root, PathBuf::from("/srv/splitx"));
        assert_eq!(config.jobs.max_concurrent, 6);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_bad_environment_number() {
        let mut config = AppConfig::default();
        let result = config.apply_environment(|name| {
            (name == "SPLITX_MAX_JOBS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(DomainError::Config(_))));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.planning.min_thumbnails = 200;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jobs.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.media.output_extension = "../mp4".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        apply_cli_overrides(
            &mut config,
            &CliOverrides {
                log_level: Some("debug".to_string()),
                max_jobs: Some(3),
                port: Some(9000),
                ..Default::default()
            },
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.jobs.max_concurrent, 3);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_kind_paths() {
        let config = config_rooted_at(Path::new("/data"));
        assert_eq!(
            config.storage.kind_path(ArtifactKind::Thumbnail),
            PathBuf::from("/data/thumbnails")
        );
        assert_eq!(config.storage.manifest_path(), PathBuf::from("/data/manifest.json"));
    }
}
