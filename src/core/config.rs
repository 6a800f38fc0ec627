//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::models::OutputFormat;

/// Prefix for environment overrides, e.g. `YTAC_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "YTAC";

/// Main application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub download: DownloadConfig,
    pub youtube: YoutubeConfig,
    pub metadata: MetadataConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Worker pool and conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Size of the download/convert worker pool
    pub max_workers: usize,
    /// Per-video timeout for download + convert
    pub timeout_seconds: u64,
    pub default_format: OutputFormat,
    /// Drop playlist entries whose info cannot be fetched instead of failing the load
    pub skip_unavailable: bool,
    /// Root for per-session work directories; system temp dir when unset
    pub work_directory: Option<String>,
}

/// yt-dlp / ffmpeg settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub yt_dlp_path: String,
    pub ffmpeg_path: String,
    /// yt-dlp `--audio-quality` value, 0 (best) to 10 (worst) or a bitrate like `192K`
    pub audio_quality: String,
    /// Concurrent info lookups while enumerating a playlist
    pub info_concurrency: usize,
    pub playlist_max_items: Option<usize>,
}

/// Remote metadata lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Initial state of the "Fetch iTunes Metadata" toggle
    pub enabled_by_default: bool,
    pub itunes_base_url: String,
    pub country: String,
    pub timeout_seconds: u64,
    pub artwork_size: u32,
    pub embed_artwork: bool,
    pub lookup_concurrency: usize,
}

/// UI session lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_minutes: u64,
    pub purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String, // "error", "warn", "info", "debug", "trace"
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            timeout_seconds: 600,
            default_format: OutputFormat::Mp3,
            skip_unavailable: true,
            work_directory: None,
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            audio_quality: "0".to_string(),
            info_concurrency: 4,
            playlist_max_items: None,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: true,
            itunes_base_url: "https://itunes.apple.com/search".to_string(),
            country: "US".to_string(),
            timeout_seconds: 10,
            artwork_size: 1000,
            embed_artwork: true,
            lookup_concurrency: 4,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 120,
            purge_interval_seconds: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Load configuration from the default location plus environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path` (optional) layered with `YTAC_*` variables
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to parse configuration")?;

        if path.exists() {
            tracing::info!("Loaded configuration from: {:?}", path);
        } else {
            tracing::info!("No configuration file at {:?}, using defaults", path);
        }
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when missing or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };

        match loaded {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(err) => {
                    tracing::warn!(
                        "Invalid configuration detected ({}), falling back to defaults",
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {}. Using defaults",
                    err
                );
                Self::default()
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = self.export()?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved configuration to: {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "ytaudio", "converter")
            .with_context(|| "Failed to get project directories")?;

        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Root directory for per-session output files
    pub fn work_root(&self) -> PathBuf {
        match self.download.work_directory {
            Some(ref dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::temp_dir().join("yt-audio-converter"),
        }
    }

    /// Export configuration as JSON string
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    /// Parse and validate configuration from a JSON string
    pub fn import(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).with_context(|| "Failed to parse imported configuration")?;

        config
            .validate()
            .with_context(|| "Imported configuration is invalid")?;

        Ok(config)
    }

    /// Reset the stored configuration to defaults
    pub fn reset() -> Result<Self> {
        let config = Self::default();
        config.save()?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port should be between 1 and 65535");
        }

        if self.download.max_workers == 0 || self.download.max_workers > 16 {
            anyhow::bail!("Worker pool size should be between 1 and 16");
        }

        if self.download.timeout_seconds == 0 || self.download.timeout_seconds > 3600 {
            anyhow::bail!("Download timeout should be between 1 and 3600 seconds");
        }

        if self.youtube.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        if self.youtube.ffmpeg_path.trim().is_empty() {
            anyhow::bail!("ffmpeg path must not be empty");
        }

        if self.youtube.info_concurrency == 0 || self.youtube.info_concurrency > 16 {
            anyhow::bail!("Info lookup concurrency should be between 1 and 16");
        }

        if let Some(max_items) = self.youtube.playlist_max_items {
            if max_items == 0 || max_items > 1000 {
                anyhow::bail!("Playlist max items should be between 1 and 1000");
            }
        }

        if self.metadata.timeout_seconds == 0 || self.metadata.timeout_seconds > 120 {
            anyhow::bail!("Metadata timeout should be between 1 and 120 seconds");
        }

        if !(100..=3000).contains(&self.metadata.artwork_size) {
            anyhow::bail!("Artwork size should be between 100 and 3000 pixels");
        }

        if self.metadata.lookup_concurrency == 0 || self.metadata.lookup_concurrency > 16 {
            anyhow::bail!("Metadata lookup concurrency should be between 1 and 16");
        }

        if url::Url::parse(&self.metadata.itunes_base_url).is_err() {
            anyhow::bail!("Invalid iTunes base URL: {}", self.metadata.itunes_base_url);
        }

        if self.session.ttl_minutes == 0 {
            anyhow::bail!("Session TTL must be greater than 0");
        }

        if self.session.purge_interval_seconds == 0 {
            anyhow::bail!("Session purge interval must be greater than 0");
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: must be 'error', 'warn', 'info', 'debug', or 'trace'"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.download.max_workers, 3);
        assert_eq!(config.download.default_format, OutputFormat::Mp3);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = config.export().unwrap();
        let parsed_config = AppConfig::import(&json).unwrap();

        assert_eq!(config.export().unwrap(), parsed_config.export().unwrap());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AppConfig::default();

        config.download.max_workers = 0;
        assert!(config.validate().is_err());

        config.download.max_workers = 17;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.youtube.playlist_max_items = Some(0);
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.metadata.itunes_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "download": { "max_workers": 5 } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.download.max_workers, 5);
        assert_eq!(config.download.timeout_seconds, 600);
        assert_eq!(config.server.port, 8501);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(&dir.path().join("absent.json")));
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "download": { "max_workers": 99 } }"#).unwrap();

        let config = AppConfig::load_or_default(Some(&path));
        assert_eq!(config.download.max_workers, 3);
    }

    #[test]
    fn test_save_to_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.metadata.enabled_by_default = false;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert!(!loaded.metadata.enabled_by_default);
    }

    #[test]
    fn test_work_root() {
        let mut config = AppConfig::default();
        assert!(config.work_root().ends_with("yt-audio-converter"));
        config.download.work_directory = Some("/srv/ytac".to_string());
        assert_eq!(config.work_root(), PathBuf::from("/srv/ytac"));
    }
}
