//! Audio tag writing
//!
//! Converted files get their song title plus any looked-up artist, album and
//! genre written as container tags, and optionally the cover artwork as an
//! attached picture. ffmpeg does the muxing with stream copy, so audio is
//! never re-encoded here.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::models::{AppError, AppResult, OutputFormat, SongMetadata};

/// Tags for one output file
#[derive(Debug, Clone, PartialEq)]
pub struct SongTags {
    pub title: String,
    pub metadata: Option<SongMetadata>,
}

impl SongTags {
    /// `-metadata key=value` pairs, skipping placeholder values
    pub fn ffmpeg_metadata_args(&self) -> Vec<String> {
        let mut pairs = vec![("title", self.title.as_str())];

        if let Some(ref meta) = self.metadata {
            if !meta.is_unknown() {
                pairs.push(("artist", meta.artist.as_str()));
                pairs.push(("album", meta.album.as_str()));
                pairs.push(("genre", meta.genre.as_str()));
            }
        }

        pairs
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .flat_map(|(key, value)| ["-metadata".to_string(), format!("{}={}", key, value)])
            .collect()
    }

    pub fn artwork_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.artwork_url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Writes tags into a finished audio file in place
#[async_trait]
pub trait AudioTagger: Send + Sync {
    async fn tag(&self, path: &Path, format: OutputFormat, tags: &SongTags) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTaggerConfig {
    pub ffmpeg_path: PathBuf,
    pub embed_artwork: bool,
    pub artwork_timeout: Duration,
}

impl Default for FfmpegTaggerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            embed_artwork: true,
            artwork_timeout: Duration::from_secs(10),
        }
    }
}

/// [`AudioTagger`] shelling out to ffmpeg
pub struct FfmpegTagger {
    config: FfmpegTaggerConfig,
    client: reqwest::Client,
}

impl FfmpegTagger {
    pub fn new(config: FfmpegTaggerConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.artwork_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Fetch cover art next to the audio file; `None` when unavailable
    async fn fetch_artwork(&self, url: &str, audio_path: &Path) -> Option<PathBuf> {
        let response = match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!("Artwork request returned HTTP {} for {}", resp.status(), url);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch artwork {}: {}", url, e);
                return None;
            }
        };

        let bytes = match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return None,
        };

        let cover_path = sidecar_path(audio_path, "cover.jpg");
        match tokio::fs::write(&cover_path, &bytes).await {
            Ok(()) => Some(cover_path),
            Err(e) => {
                warn!("Failed to store artwork {}: {}", cover_path.display(), e);
                None
            }
        }
    }
}

/// Build the ffmpeg argument list that copies `input` into `output` with tags
pub fn build_tag_args(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    tags: &SongTags,
    cover: Option<&Path>,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    if let Some(cover) = cover {
        args.extend([
            "-i".to_string(),
            cover.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:a".to_string(),
            "-map".to_string(),
            "1:0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-disposition:v:0".to_string(),
            "attached_pic".to_string(),
        ]);
    } else {
        args.extend([
            "-map".to_string(),
            "0:a".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ]);
    }

    if format == OutputFormat::Mp3 {
        args.extend(["-id3v2_version".to_string(), "3".to_string()]);
    }

    args.extend(tags.ffmpeg_metadata_args());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// `Song.mp3` -> `.Song.<suffix>`. Output stems never start with a dot, so
/// sidecars cannot land on another video's file.
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    path.with_file_name(format!(".{}.{}", stem, suffix))
}

/// `Song.mp3` -> `.Song.tagging.mp3`, keeping the extension ffmpeg muxes by
fn staging_path(path: &Path, format: OutputFormat) -> PathBuf {
    sidecar_path(path, &format!("tagging.{}", format.extension()))
}

#[async_trait]
impl AudioTagger for FfmpegTagger {
    async fn tag(&self, path: &Path, format: OutputFormat, tags: &SongTags) -> AppResult<()> {
        let cover = match (self.config.embed_artwork, tags.artwork_url()) {
            (true, Some(url)) => self.fetch_artwork(url, path).await,
            _ => None,
        };

        let staging = staging_path(path, format);
        let args = build_tag_args(path, &staging, format, tags, cover.as_deref());
        debug!("Running ffmpeg {:?}", args);

        let output = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Conversion(format!("Failed to run ffmpeg: {}", e)));

        if let Some(ref cover) = cover {
            let _ = tokio::fs::remove_file(cover).await;
        }

        let output = output?;
        if !output.status.success() {
            let _ = tokio::fs::remove_file(&staging).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Conversion(format!(
                "ffmpeg tagging failed: {}",
                stderr.trim()
            )));
        }

        tokio::fs::rename(&staging, path).await?;
        info!("🏷️ Tagged {}", path.display());
        Ok(())
    }
}
