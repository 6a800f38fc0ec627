//! Core data models for the converter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::utils::format_duration;

/// Output container for converted audio
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,

    /// MP4 audio container (the "Save as MP4/M4A" toggle)
    M4a,
}

impl OutputFormat {
    /// Maps the UI toggle onto a format.
    pub fn from_save_as_mp4(save_as_mp4: bool) -> Self {
        if save_as_mp4 {
            Self::M4a
        } else {
            Self::Mp3
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp3 => write!(f, "MP3"),
            Self::M4a => write!(f, "M4A"),
        }
    }
}

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";

/// Song metadata attached by the metadata lookup

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]

pub struct SongMetadata {
    pub artist: String,

    pub album: String,

    pub genre: String,

    pub artwork_url: Option<String>,
}

impl SongMetadata {
    /// Placeholder used when the lookup misses or fails
    pub fn unknown() -> Self {
        Self {
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            genre: UNKNOWN_GENRE.to_string(),
            artwork_url: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.artist == UNKNOWN_ARTIST && self.album == UNKNOWN_ALBUM && self.genre == UNKNOWN_GENRE
    }
}

/// A single video as listed from YouTube

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]

pub struct VideoRecord {
    pub id: String,

    pub title: String,

    /// Duration in seconds
    pub duration: Option<u64>,

    pub url: String,

    pub metadata: Option<SongMetadata>,
}

impl VideoRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration: Option<u64>) -> Self {
        let id = id.into();
        let url = format!("https://www.youtube.com/watch?v={}", id);
        Self {
            id,
            title: title.into(),
            duration,
            url,
            metadata: None,
        }
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration)
    }
}

/// Ordered collection of videos keyed by title.
///
/// Re-inserting an existing title replaces the record but keeps its
/// original position.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<VideoRecord>", into = "Vec<VideoRecord>")]
pub struct VideoCatalog {
    videos: Vec<VideoRecord>,
    index: HashMap<String, usize>,
}

impl VideoCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: VideoRecord) {
        match self.index.get(&record.title) {
            Some(&pos) => self.videos[pos] = record,
            None => {
                self.index.insert(record.title.clone(), self.videos.len());
                self.videos.push(record);
            }
        }
    }

    pub fn get(&self, title: &str) -> Option<&VideoRecord> {
        self.index.get(title).map(|&pos| &self.videos[pos])
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut VideoRecord> {
        match self.index.get(title) {
            Some(&pos) => self.videos.get_mut(pos),
            None => None,
        }
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoRecord> {
        self.videos.iter()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.videos.iter().map(|v| v.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn into_vec(self) -> Vec<VideoRecord> {
        self.videos
    }
}

impl From<Vec<VideoRecord>> for VideoCatalog {
    fn from(videos: Vec<VideoRecord>) -> Self {
        videos.into_iter().collect()
    }
}

impl From<VideoCatalog> for Vec<VideoRecord> {
    fn from(catalog: VideoCatalog) -> Self {
        catalog.videos
    }
}

impl FromIterator<VideoRecord> for VideoCatalog {
    fn from_iter<I: IntoIterator<Item = VideoRecord>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

/// A converted file on local disk

#[derive(Debug, Clone, Serialize, Deserialize)]

pub struct OutputFile {
    pub video_id: String,

    pub title: String,

    pub file_name: String,

    #[serde(skip_serializing, default)]
    pub path: PathBuf,

    pub format: OutputFormat,

    pub size_bytes: u64,
}

/// Per-video conversion state

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,

    Downloading { percent: f64 },

    Converting,

    Tagging,

    Completed { file_name: String },

    Failed { error: String },
}

impl ConversionStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Progress update emitted by the worker pool

#[derive(Debug, Clone, Serialize, Deserialize)]

pub struct ProgressUpdate {
    pub video_id: String,

    pub title: String,

    pub status: ConversionStatus,

    /// Finished items (completed or failed) at emission time
    pub completed: usize,

    pub total: usize,
}

impl ProgressUpdate {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]

pub struct ConversionFailure {
    pub video_id: String,

    pub title: String,

    pub error: String,
}

/// Outcome of one download batch

#[derive(Debug, Clone, Serialize, Deserialize)]

pub struct BatchReport {
    pub format: OutputFormat,

    /// Files in completion order
    pub files: Vec<OutputFile>,

    pub failures: Vec<ConversionFailure>,

    pub started_at: chrono::DateTime<chrono::Utc>,

    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl BatchReport {
    pub fn requested(&self) -> usize {
        self.files.len() + self.failures.len()
    }

    pub fn summary(&self) -> String {
        if self.files.is_empty() {
            "No files were successfully downloaded.".to_string()
        } else {
            format!(
                "Successfully downloaded {} audio files!",
                self.files.len()
            )
        }
    }
}

/// Application error types

#[derive(Debug, thiserror::Error)]

pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YouTube error: {0}")]
    Youtube(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("System error: {0}")]
    System(String),
}

/// Result type alias for application operations

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_mapping() {
        assert_eq!(OutputFormat::from_save_as_mp4(false), OutputFormat::Mp3);
        assert_eq!(OutputFormat::from_save_as_mp4(true), OutputFormat::M4a);
        assert_eq!(OutputFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(OutputFormat::M4a.mime_type(), "audio/mp4");
    }

    #[test]
    fn test_output_format_serde() {
        let json = serde_json::to_string(&OutputFormat::M4a).unwrap();
        assert_eq!(json, "\"m4a\"");
        let parsed: OutputFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(parsed, OutputFormat::Mp3);
    }

    #[test]
    fn test_catalog_keeps_first_position_on_duplicate_title() {
        let mut catalog = VideoCatalog::new();
        catalog.insert(VideoRecord::new("a", "First", Some(10)));
        catalog.insert(VideoRecord::new("b", "Second", Some(20)));
        catalog.insert(VideoRecord::new("c", "First", Some(30)));

        assert_eq!(catalog.len(), 2);
        let titles: Vec<&str> = catalog.titles().collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(catalog.get("First").unwrap().id, "c");
    }

    #[test]
    fn test_catalog_get_mut_updates_record() {
        let mut catalog: VideoCatalog = vec![VideoRecord::new("a", "Song", None)]
            .into_iter()
            .collect();

        catalog.get_mut("Song").unwrap().metadata = Some(SongMetadata::unknown());
        assert!(catalog.get("Song").unwrap().metadata.is_some());
        assert!(catalog.get_mut("Missing").is_none());
    }

    #[test]
    fn test_video_record_urls() {
        let record = VideoRecord::new("dQw4w9WgXcQ", "Never Gonna", Some(212));
        assert_eq!(record.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(record.formatted_duration(), "03:32");
    }

    #[test]
    fn test_unknown_metadata() {
        let meta = SongMetadata::unknown();
        assert!(meta.is_unknown());
        assert_eq!(meta.artist, "Unknown Artist");
    }

    #[test]
    fn test_batch_report_summary() {
        let now = chrono::Utc::now();
        let report = BatchReport {
            format: OutputFormat::Mp3,
            files: vec![],
            failures: vec![ConversionFailure {
                video_id: "x".into(),
                title: "X".into(),
                error: "boom".into(),
            }],
            started_at: now,
            finished_at: now,
        };
        assert_eq!(report.requested(), 1);
        assert_eq!(report.summary(), "No files were successfully downloaded.");
    }
}
