//! YouTube Source Module
//!
//! Video listing and audio extraction for YouTube URLs. The heavy lifting is
//! delegated to the `yt-dlp` binary (with `ffmpeg` for the audio transcode);
//! this module builds the command lines, parses their output, and exposes the
//! result through the [`MediaSource`] trait so the worker pool can be driven
//! by any implementation.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::config::{AppConfig, YoutubeConfig};
use crate::core::models::{
    AppError, AppResult, ConversionStatus, OutputFormat, VideoCatalog, VideoRecord,
};
use crate::utils::validate_url;

/// Progress callback invoked while a single video is downloaded/converted
pub type ProgressCallback = Arc<dyn Fn(ConversionStatus) + Send + Sync>;

/// What a YouTube URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Video,
    Playlist,
}

/// Source of video listings and converted audio
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetch the record for a single video URL
    async fn video_info(&self, url: &str) -> AppResult<VideoRecord>;

    /// Enumerate the watch URLs of a playlist, in playlist order
    async fn playlist_entries(&self, url: &str, max_items: Option<usize>)
        -> AppResult<Vec<String>>;

    /// Download `record` and convert it to `format` as
    /// `dest_dir/<file_stem>.<ext>`, returning the path of the produced file
    async fn download_audio(
        &self,
        record: &VideoRecord,
        format: OutputFormat,
        dest_dir: &Path,
        file_stem: &str,
        progress: Option<ProgressCallback>,
    ) -> AppResult<PathBuf>;
}

/// Settings for the yt-dlp backed source
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub yt_dlp_path: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    pub audio_quality: String,
    pub timeout: Duration,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None,
            audio_quality: "0".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl YtDlpConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let youtube: &YoutubeConfig = &config.youtube;
        // A bare "ffmpeg" is resolved from PATH by yt-dlp itself
        let ffmpeg_path = match youtube.ffmpeg_path.as_str() {
            "" | "ffmpeg" => None,
            path => Some(PathBuf::from(path)),
        };

        Self {
            yt_dlp_path: PathBuf::from(&youtube.yt_dlp_path),
            ffmpeg_path,
            audio_quality: youtube.audio_quality.clone(),
            timeout: Duration::from_secs(config.download.timeout_seconds),
        }
    }
}

/// [`MediaSource`] backed by the yt-dlp command line tool
pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.yt_dlp_path);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run yt-dlp to completion and return stdout
    async fn run_capture(&self, args: &[&str]) -> AppResult<String> {
        debug!("Running yt-dlp {:?}", args);

        let output = tokio::time::timeout(self.config.timeout, self.command().args(args).output())
            .await
            .map_err(|_| {
                AppError::Youtube(format!(
                    "yt-dlp timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::Youtube(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Youtube(describe_ytdlp_failure(&stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn download_args(&self, format: OutputFormat, output_template: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--newline".into(),
            "--no-part".into(),
            "--force-overwrites".into(),
            "-f".into(),
        ];

        args.push(match format {
            OutputFormat::Mp3 => "bestaudio/best".into(),
            OutputFormat::M4a => "bestaudio[ext=m4a]/bestaudio/best".into(),
        });

        args.extend([
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            format.extension().to_string(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
        ]);

        if let Some(ref ffmpeg) = self.config.ffmpeg_path {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        args.push("-o".into());
        args.push(output_template.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn video_info(&self, url: &str) -> AppResult<VideoRecord> {
        debug!("🔍 Fetching video info for URL: {}", url);

        let stdout = self
            .run_capture(&["--dump-json", "--no-warnings", "--no-playlist", url])
            .await?;

        let line = stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| AppError::Youtube(format!("yt-dlp returned no data for {}", url)))?;

        let record = parse_video_info(line)?;
        info!("📋 Fetched video info: {}", record.title);
        Ok(record)
    }

    async fn playlist_entries(
        &self,
        url: &str,
        max_items: Option<usize>,
    ) -> AppResult<Vec<String>> {
        let playlist_end = max_items.map(|max| max.to_string());
        let mut args = vec!["--dump-json", "--no-warnings", "--flat-playlist"];
        if let Some(ref end) = playlist_end {
            args.extend(["--playlist-end", end.as_str()]);
        }
        args.push(url);

        let stdout = self.run_capture(&args).await?;
        let entries = parse_playlist_entries(&stdout);

        info!("📋 Playlist {} has {} entries", url, entries.len());
        Ok(entries)
    }

    async fn download_audio(
        &self,
        record: &VideoRecord,
        format: OutputFormat,
        dest_dir: &Path,
        stem: &str,
        progress: Option<ProgressCallback>,
    ) -> AppResult<PathBuf> {
        // yt-dlp expands `%(...)s` fields in -o, so literal percent signs are doubled
        let template = dest_dir.join(format!("{}.%(ext)s", stem.replace('%', "%%")));
        let expected = dest_dir.join(format!("{}.{}", stem, format.extension()));

        info!(
            "⬇️ Starting YouTube audio download: {} -> {}",
            record.watch_url(),
            expected.display()
        );

        let mut child = self
            .command()
            .args(self.download_args(format, &template))
            .arg(record.watch_url())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Download(format!("Failed to run yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::System("yt-dlp stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::System("yt-dlp stderr not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let run = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(status) = parse_progress_line(&line) {
                    if let Some(ref callback) = progress {
                        callback(status);
                    }
                }
            }
            child.wait().await
        };

        let outcome = tokio::time::timeout(self.config.timeout, run).await;
        let status = match outcome {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(AppError::Download(format!(
                    "Timed out after {}s converting {}",
                    self.config.timeout.as_secs(),
                    record.title
                )));
            }
        };

        let stderr_text = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(AppError::Download(describe_ytdlp_failure(&stderr_text)));
        }

        if tokio::fs::metadata(&expected).await.is_ok() {
            return Ok(expected);
        }

        find_output_file(dest_dir, stem, format).await.ok_or_else(|| {
            AppError::Conversion(format!(
                "yt-dlp finished but no {} file was produced for {}",
                format, record.title
            ))
        })
    }
}

/// Fetch everything a URL refers to and key it by title.
///
/// A single video costs one info call. A playlist is enumerated first and
/// the entries are then looked up concurrently (`concurrency` at a time);
/// with `skip_unavailable` entries whose lookup fails are logged and dropped.
pub async fn load_content(
    source: &dyn MediaSource,
    url: &str,
    skip_unavailable: bool,
    concurrency: usize,
    max_items: Option<usize>,
) -> AppResult<VideoCatalog> {
    let kind = classify_url(url)?;

    let records = match kind {
        UrlKind::Video => {
            let normalized = normalize_video_url(url.trim());
            vec![source.video_info(&normalized).await?]
        }
        UrlKind::Playlist => {
            let entries = source.playlist_entries(url.trim(), max_items).await?;
            if entries.is_empty() {
                return Err(AppError::Youtube(format!(
                    "Playlist contains no videos: {}",
                    url
                )));
            }

            let results: Vec<(String, AppResult<VideoRecord>)> = stream::iter(entries)
                .map(|entry| async move {
                    let result = source.video_info(&entry).await;
                    (entry, result)
                })
                .buffered(concurrency.max(1))
                .collect()
                .await;

            let mut records = Vec::with_capacity(results.len());
            for (entry, result) in results {
                match result {
                    Ok(record) => records.push(record),
                    Err(e) if skip_unavailable => {
                        warn!("⚠️ Skipping unavailable playlist entry {}: {}", entry, e);
                    }
                    Err(e) => return Err(e),
                }
            }
            records
        }
    };

    let catalog: VideoCatalog = records.into_iter().collect();
    if catalog.is_empty() {
        return Err(AppError::Youtube(format!(
            "No videos could be loaded from {}",
            url
        )));
    }

    info!("✅ Loaded {} videos from {}", catalog.len(), url);
    Ok(catalog)
}

// URL helpers

/// Validate if URL is a YouTube URL
pub fn is_youtube_url(url: &str) -> bool {
    match Url::parse(url.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => {
                let host = host.to_ascii_lowercase();
                host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
            }
            None => false,
        },
        Err(_) => false,
    }
}

/// Decide whether a URL is a playlist or a single video
pub fn classify_url(url: &str) -> AppResult<UrlKind> {
    let parsed = validate_url(url)?;
    if !is_youtube_url(parsed.as_str()) {
        return Err(AppError::InvalidInput(format!(
            "Not a YouTube URL: {}",
            url.trim()
        )));
    }

    if url.contains(".com/playlist") {
        Ok(UrlKind::Playlist)
    } else {
        Ok(UrlKind::Video)
    }
}

/// Trim everything from the first `&`, dropping playlist/index/timestamp
/// parameters from a watch URL.
pub fn normalize_video_url(url: &str) -> String {
    url.split('&').next().unwrap_or(url).to_string()
}

pub fn extract_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string());
    }

    if parsed.path() == "/watch" {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.to_string());
    }

    let mut segments = parsed.path_segments()?;
    match segments.next() {
        Some("embed") | Some("shorts") | Some("live") => segments
            .next()
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string()),
        _ => None,
    }
}

pub fn extract_playlist_id(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.to_string())
}

// Parsing

#[derive(Debug, Deserialize)]
struct YtDlpVideoJson {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFlatEntry {
    id: Option<String>,
    url: Option<String>,
}

fn parse_video_info(json: &str) -> AppResult<VideoRecord> {
    let info: YtDlpVideoJson = serde_json::from_str(json)
        .map_err(|e| AppError::Parse(format!("Failed to parse yt-dlp output: {}", e)))?;

    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("YouTube Video {}", info.id));

    let mut record = VideoRecord::new(info.id, title, info.duration.map(|d| d.round() as u64));
    if let Some(url) = info.webpage_url {
        record.url = url;
    }
    Ok(record)
}

fn parse_playlist_entries(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<YtDlpFlatEntry>(line).ok())
        .filter_map(|entry| match (entry.id, entry.url) {
            (Some(id), _) => Some(format!("https://www.youtube.com/watch?v={}", id)),
            (None, Some(url)) if url.starts_with("http") => Some(url),
            _ => None,
        })
        .collect()
}

fn download_percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("valid progress regex")
    })
}

/// Map one line of `yt-dlp --newline` output onto a conversion status
pub fn parse_progress_line(line: &str) -> Option<ConversionStatus> {
    let line = line.trim();

    if let Some(caps) = download_percent_regex().captures(line) {
        let percent: f64 = caps[1].parse().ok()?;
        return Some(ConversionStatus::Downloading {
            percent: percent.clamp(0.0, 100.0),
        });
    }

    if line.starts_with("[ExtractAudio]") {
        return Some(ConversionStatus::Converting);
    }

    None
}

/// Reduce yt-dlp stderr to the message worth showing a user
fn describe_ytdlp_failure(stderr: &str) -> String {
    let error_line = stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .map(|line| line.trim_start_matches("ERROR:").trim());

    match error_line {
        Some(line) if !line.is_empty() => format!("yt-dlp failed: {}", line),
        _ => {
            let tail = stderr.trim();
            if tail.is_empty() {
                "yt-dlp failed without an error message".to_string()
            } else {
                format!("yt-dlp failed: {}", tail.lines().last().unwrap_or(tail))
            }
        }
    }
}

async fn find_output_file(dir: &Path, stem: &str, format: OutputFormat) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let matches_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s == stem)
            .unwrap_or(false);
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(format.extension()))
            .unwrap_or(false);

        if matches_stem && matches_ext {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_is_youtube_url() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://music.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://example.com/video"));
        assert!(!is_youtube_url("https://notyoutube.com/watch?v=x"));
        assert!(!is_youtube_url("not_a_url"));
        assert!(!is_youtube_url(""));
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(
            classify_url("https://www.youtube.com/playlist?list=PL123").unwrap(),
            UrlKind::Playlist
        );
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=abc&list=PL123").unwrap(),
            UrlKind::Video
        );
        assert!(matches!(
            classify_url("https://vimeo.com/123"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(classify_url(""), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_video_url() {
        assert_eq!(
            normalize_video_url("https://www.youtube.com/watch?v=abc&list=PL1&index=2"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            normalize_video_url("https://youtu.be/abc"),
            "https://youtu.be/abc"
        );
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn test_extract_playlist_id() {
        assert_eq!(
            extract_playlist_id(
                "https://www.youtube.com/playlist?list=PLrAXtmRdnEQy6nuLMfCnAp7xfXLPd3BgB"
            ),
            Some("PLrAXtmRdnEQy6nuLMfCnAp7xfXLPd3BgB".to_string())
        );
        assert_eq!(extract_playlist_id("https://example.com/video"), None);
    }

    #[test]
    fn test_parse_video_info() {
        let json = r#"{"id":"abc","title":"Artist - Song","duration":212.4,"webpage_url":"https://www.youtube.com/watch?v=abc","formats":[]}"#;
        let record = parse_video_info(json).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.title, "Artist - Song");
        assert_eq!(record.duration, Some(212));
        assert!(record.metadata.is_none());

        let untitled = parse_video_info(r#"{"id":"xyz","title":"  "}"#).unwrap();
        assert_eq!(untitled.title, "YouTube Video xyz");
        assert_eq!(untitled.duration, None);

        assert!(matches!(parse_video_info("not json"), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_parse_playlist_entries() {
        let output = concat!(
            r#"{"_type":"url","id":"one","url":"https://www.youtube.com/watch?v=one","title":"One"}"#,
            "\n\n",
            r#"{"_type":"url","id":"two","title":"Two"}"#,
            "\n",
            "garbage line\n",
            r#"{"_type":"url","title":"No id"}"#,
            "\n"
        );

        let entries = parse_playlist_entries(output);
        assert_eq!(
            entries,
            vec![
                "https://www.youtube.com/watch?v=one".to_string(),
                "https://www.youtube.com/watch?v=two".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(
            parse_progress_line("[download]  42.3% of 3.45MiB at 1.20MiB/s ETA 00:02"),
            Some(ConversionStatus::Downloading { percent: 42.3 })
        );
        assert_eq!(
            parse_progress_line("[download] 100% of 3.45MiB in 00:03"),
            Some(ConversionStatus::Downloading { percent: 100.0 })
        );
        assert_eq!(
            parse_progress_line("[ExtractAudio] Destination: /tmp/x/Song.mp3"),
            Some(ConversionStatus::Converting)
        );
        assert_eq!(parse_progress_line("[youtube] abc: Downloading webpage"), None);
    }

    #[test]
    fn test_describe_ytdlp_failure() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n";
        assert_eq!(
            describe_ytdlp_failure(stderr),
            "yt-dlp failed: [youtube] abc: Video unavailable"
        );
        assert_eq!(
            describe_ytdlp_failure(""),
            "yt-dlp failed without an error message"
        );
    }

    #[test]
    fn test_download_args() {
        let ytdlp = YtDlp::new(YtDlpConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin")),
            ..YtDlpConfig::default()
        });
        let args = ytdlp.download_args(OutputFormat::M4a, Path::new("/tmp/out/Song.%(ext)s"));

        let pos = args.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(args[pos + 1], "m4a");
        assert!(args.contains(&"--ffmpeg-location".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/out/Song.%(ext)s");
    }

    #[tokio::test]
    async fn test_find_output_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("Song.MP3"), b"x").unwrap();

        let found = find_output_file(dir.path(), "Song", OutputFormat::Mp3).await;
        assert_eq!(found, Some(dir.path().join("Song.MP3")));
        assert!(find_output_file(dir.path(), "Song", OutputFormat::M4a)
            .await
            .is_none());
    }

    struct FakeSource {
        videos: HashMap<String, VideoRecord>,
        playlist: Vec<String>,
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn video_info(&self, url: &str) -> AppResult<VideoRecord> {
            self.videos
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::Youtube(format!("Video unavailable: {}", url)))
        }

        async fn playlist_entries(
            &self,
            _url: &str,
            max_items: Option<usize>,
        ) -> AppResult<Vec<String>> {
            let limit = max_items.unwrap_or(self.playlist.len());
            Ok(self.playlist.iter().take(limit).cloned().collect())
        }

        async fn download_audio(
            &self,
            _record: &VideoRecord,
            _format: OutputFormat,
            _dest_dir: &Path,
            _file_stem: &str,
            _progress: Option<ProgressCallback>,
        ) -> AppResult<PathBuf> {
            Err(AppError::Download("not used".into()))
        }
    }

    fn fake_source() -> FakeSource {
        let mut videos = HashMap::new();
        for (id, title) in [("a", "Song A"), ("b", "Song B")] {
            videos.insert(
                format!("https://www.youtube.com/watch?v={}", id),
                VideoRecord::new(id, title, Some(180)),
            );
        }
        FakeSource {
            videos,
            playlist: vec![
                "https://www.youtube.com/watch?v=a".to_string(),
                "https://www.youtube.com/watch?v=gone".to_string(),
                "https://www.youtube.com/watch?v=b".to_string(),
            ],
        }
    }

    #[tokio::test]
    async fn test_load_single_video_trims_parameters() {
        let source = fake_source();
        let catalog = load_content(
            &source,
            "https://www.youtube.com/watch?v=a&list=PLx&index=3",
            true,
            2,
            None,
        )
        .await
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("Song A"));
    }

    #[tokio::test]
    async fn test_load_playlist_skips_unavailable() {
        let source = fake_source();
        let catalog = load_content(
            &source,
            "https://www.youtube.com/playlist?list=PL1",
            true,
            2,
            None,
        )
        .await
        .unwrap();

        let titles: Vec<&str> = catalog.titles().collect();
        assert_eq!(titles, vec!["Song A", "Song B"]);
    }

    #[tokio::test]
    async fn test_load_playlist_strict_fails() {
        let source = fake_source();
        let result = load_content(
            &source,
            "https://www.youtube.com/playlist?list=PL1",
            false,
            2,
            None,
        )
        .await;

        assert!(matches!(result, Err(AppError::Youtube(_))));
    }

    #[tokio::test]
    async fn test_load_playlist_respects_max_items() {
        let source = fake_source();
        let catalog = load_content(
            &source,
            "https://www.youtube.com/playlist?list=PL1",
            true,
            2,
            Some(1),
        )
        .await
        .unwrap();

        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_url() {
        let source = fake_source();
        let result = load_content(&source, "https://example.com/watch?v=a", true, 2, None).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
