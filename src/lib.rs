//! YouTube Audio Converter - Core Library
//!
//! This library provides the core functionality for the converter: YouTube
//! listing and audio extraction, metadata lookup, the conversion worker pool,
//! session state and the web surface.

pub mod core;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use core::{
    config::AppConfig,
    converter::ConversionManager,
    metadata::{ItunesClient, MetadataProvider},
    models::{
        AppError, AppResult, BatchReport, OutputFile, OutputFormat, ProgressUpdate,
        SongMetadata, VideoCatalog, VideoRecord,
    },
    session::{SessionSettings, SessionStore},
    tagger::{AudioTagger, FfmpegTagger, FfmpegTaggerConfig},
    youtube::{MediaSource, YtDlp, YtDlpConfig},
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared between request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub converter: Arc<ConversionManager>,
    pub source: Arc<dyn MediaSource>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl AppState {
    /// Wire the yt-dlp source, iTunes client and ffmpeg tagger from `config`
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let source: Arc<dyn MediaSource> =
            Arc::new(YtDlp::new(YtDlpConfig::from_app_config(&config)));
        let metadata: Arc<dyn MetadataProvider> =
            Arc::new(ItunesClient::new(config.metadata.clone())?);
        let tagger: Arc<dyn AudioTagger> = Arc::new(FfmpegTagger::new(FfmpegTaggerConfig {
            ffmpeg_path: PathBuf::from(&config.youtube.ffmpeg_path),
            embed_artwork: config.metadata.embed_artwork,
            artwork_timeout: Duration::from_secs(config.metadata.timeout_seconds),
        })?);

        Ok(Self::with_services(config, source, metadata, Some(tagger)))
    }

    /// Build state around caller supplied services
    pub fn with_services(
        config: AppConfig,
        source: Arc<dyn MediaSource>,
        metadata: Arc<dyn MetadataProvider>,
        tagger: Option<Arc<dyn AudioTagger>>,
    ) -> Self {
        let converter = Arc::new(ConversionManager::new(
            Arc::clone(&source),
            tagger,
            config.download.max_workers,
        ));

        let sessions = Arc::new(SessionStore::new(
            config.work_root().join("sessions"),
            Duration::from_secs(config.session.ttl_minutes.saturating_mul(60)),
            SessionSettings {
                format: config.download.default_format,
                use_metadata: config.metadata.enabled_by_default,
            },
        ));

        Self {
            config: Arc::new(config),
            sessions,
            converter,
            source,
            metadata,
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging at `level` unless `RUST_LOG` says otherwise
pub fn init(level: &str) -> anyhow::Result<()> {
    utils::init_tracing(level);
    tracing::info!("📚 {} v{} initialized", NAME, VERSION);
    Ok(())
}
