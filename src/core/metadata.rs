//! Song metadata lookup
//!
//! Best-effort enrichment of [`VideoRecord`]s with artist, album, genre and
//! artwork from the iTunes Search API. Lookups never fail a catalog: misses
//! and errors fall back to [`SongMetadata::unknown`].

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::config::MetadataConfig;
use crate::core::models::{AppError, AppResult, SongMetadata, VideoCatalog, VideoRecord};

/// Provider of song metadata for a video
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// `Ok(None)` means the provider had no match
    async fn lookup(&self, record: &VideoRecord) -> AppResult<Option<SongMetadata>>;
}

/// Result counts from [`annotate_catalog`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AnnotationSummary {
    pub matched: usize,
    pub defaulted: usize,
}

/// Annotate every record of `catalog`, `concurrency` lookups at a time
pub async fn annotate_catalog(
    provider: &dyn MetadataProvider,
    catalog: &mut VideoCatalog,
    concurrency: usize,
) -> AnnotationSummary {
    let records: Vec<VideoRecord> = catalog.iter().cloned().collect();

    let results: Vec<(String, Option<SongMetadata>)> = stream::iter(records)
        .map(|record| async move {
            let found = match provider.lookup(&record).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Error getting iTunes data for {}: {}", record.title, e);
                    None
                }
            };
            (record.title, found)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = AnnotationSummary::default();
    for (title, found) in results {
        let metadata = match found {
            Some(meta) => {
                summary.matched += 1;
                meta
            }
            None => {
                summary.defaulted += 1;
                SongMetadata::unknown()
            }
        };

        if let Some(record) = catalog.get_mut(&title) {
            record.metadata = Some(metadata);
        }
    }

    info!(
        "🏷️ Annotated {} videos ({} matched, {} unknown)",
        summary.matched + summary.defaulted,
        summary.matched,
        summary.defaulted
    );
    summary
}

/// iTunes Search API client
pub struct ItunesClient {
    client: reqwest::Client,
    config: MetadataConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesSearchResponse {
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesTrack {
    artist_name: Option<String>,
    collection_name: Option<String>,
    track_name: Option<String>,
    primary_genre_name: Option<String>,
    artwork_url100: Option<String>,
}

impl ItunesClient {
    pub fn new(config: MetadataConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("yt-audio-converter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    async fn search(&self, term: &str) -> AppResult<Vec<ItunesTrack>> {
        let country = self.config.country.clone();
        let response = self
            .client
            .get(&self.config.itunes_base_url)
            .query(&[
                ("term", term),
                ("media", "music"),
                ("entity", "song"),
                ("limit", "10"),
                ("country", country.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Metadata(format!(
                "iTunes search returned HTTP {}",
                response.status()
            )));
        }

        let body: ItunesSearchResponse = response.json().await?;
        Ok(body.results)
    }
}

#[async_trait]
impl MetadataProvider for ItunesClient {
    async fn lookup(&self, record: &VideoRecord) -> AppResult<Option<SongMetadata>> {
        let query = SongQuery::from_title(&record.title);
        if query.term().is_empty() {
            return Ok(None);
        }

        debug!("🔎 iTunes lookup for '{}'", query.term());
        let tracks = self.search(&query.term()).await?;

        Ok(best_match(&query, &tracks).map(|track| to_metadata(track, self.config.artwork_size)))
    }
}

/// Artist/song guess derived from a video title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongQuery {
    pub artist: Option<String>,
    pub song: String,
}

impl SongQuery {
    /// Split "Artist - Song (Official Video)" into its parts
    pub fn from_title(title: &str) -> Self {
        let cleaned = clean_title(title);

        let split = cleaned
            .split_once(" - ")
            .or_else(|| cleaned.split_once(" – "))
            .or_else(|| cleaned.split_once(" | "));

        match split {
            Some((artist, song)) if !artist.trim().is_empty() && !song.trim().is_empty() => Self {
                artist: Some(artist.trim().to_string()),
                song: song.trim().to_string(),
            },
            _ => Self {
                artist: None,
                song: cleaned,
            },
        }
    }

    pub fn term(&self) -> String {
        match self.artist {
            Some(ref artist) => format!("{} {}", artist, self.song),
            None => self.song.clone(),
        }
    }
}

fn noise_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[\(\[][^\)\]]*\b(official|video|audio|lyrics?|lyric video|visuali[sz]er|hd|hq|4k|mv|m/v|remaster(ed)?|live)\b[^\)\]]*[\)\]]",
        )
        .expect("valid noise regex")
    })
}

fn trailing_noise_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+(official\s+(music\s+)?video|official\s+audio|lyrics?|hd|4k)$")
            .expect("valid trailing noise regex")
    })
}

/// Remove bracketed and trailing decorations YouTube uploaders add to titles
pub fn clean_title(title: &str) -> String {
    let stripped = noise_regex().replace_all(title, " ");
    let stripped = trailing_noise_regex().replace(stripped.trim(), "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pick the result agreeing with the title, falling back to the top hit
fn best_match<'a>(query: &SongQuery, tracks: &'a [ItunesTrack]) -> Option<&'a ItunesTrack> {
    let song = normalize(&query.song);
    let artist = query.artist.as_deref().map(normalize);

    let track_matches = |track: &ItunesTrack| {
        track
            .track_name
            .as_deref()
            .map(|name| {
                let name = normalize(name);
                !name.is_empty() && (song.contains(&name) || name.contains(&song))
            })
            .unwrap_or(false)
    };

    let artist_matches = |track: &ItunesTrack| match (&artist, track.artist_name.as_deref()) {
        (Some(wanted), Some(name)) => {
            let name = normalize(name);
            !name.is_empty() && wanted.contains(&name)
        }
        _ => false,
    };

    tracks
        .iter()
        .find(|t| track_matches(t) && artist_matches(t))
        .or_else(|| tracks.iter().find(|t| track_matches(t)))
        .or_else(|| tracks.first())
}

/// Swap the 100px artwork for the requested size
pub fn full_resolution_artwork(url: &str, size: u32) -> String {
    url.replace("100x100bb", &format!("{}x{}bb", size, size))
}

fn to_metadata(track: &ItunesTrack, artwork_size: u32) -> SongMetadata {
    let unknown = SongMetadata::unknown();
    SongMetadata {
        artist: track.artist_name.clone().unwrap_or(unknown.artist),
        album: track.collection_name.clone().unwrap_or(unknown.album),
        genre: track.primary_genre_name.clone().unwrap_or(unknown.genre),
        artwork_url: track
            .artwork_url100
            .as_deref()
            .map(|url| full_resolution_artwork(url, artwork_size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SEARCH_RESPONSE: &str = r#"{
        "resultCount": 2,
        "results": [
            {
                "wrapperType": "track",
                "artistName": "Rick Astley Tribute Band",
                "collectionName": "Covers",
                "trackName": "Never Gonna Give You Up (Cover)",
                "primaryGenreName": "Pop"
            },
            {
                "wrapperType": "track",
                "artistName": "Rick Astley",
                "collectionName": "Whenever You Need Somebody",
                "trackName": "Never Gonna Give You Up",
                "primaryGenreName": "Pop",
                "artworkUrl100": "https://is1-ssl.mzstatic.com/image/thumb/x/100x100bb.jpg"
            }
        ]
    }"#;

    #[test]
    fn test_clean_title() {
        assert_eq!(
            clean_title("Rick Astley - Never Gonna Give You Up (Official Music Video)"),
            "Rick Astley - Never Gonna Give You Up"
        );
        assert_eq!(clean_title("Song [Lyrics]  [HD]"), "Song");
        assert_eq!(clean_title("Band - Track Official Video"), "Band - Track");
        assert_eq!(clean_title("Plain title"), "Plain title");
    }

    #[test]
    fn test_song_query_split() {
        let query = SongQuery::from_title("Daft Punk - One More Time (Official Audio)");
        assert_eq!(query.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(query.song, "One More Time");
        assert_eq!(query.term(), "Daft Punk One More Time");

        let query = SongQuery::from_title("Just A Song");
        assert_eq!(query.artist, None);
        assert_eq!(query.term(), "Just A Song");
    }

    #[test]
    fn test_best_match_prefers_artist_and_track() {
        let response: ItunesSearchResponse = serde_json::from_str(SEARCH_RESPONSE).unwrap();
        let query = SongQuery::from_title("Rick Astley - Never Gonna Give You Up");

        let track = best_match(&query, &response.results).unwrap();
        assert_eq!(track.artist_name.as_deref(), Some("Rick Astley"));

        let meta = to_metadata(track, 1000);
        assert_eq!(meta.album, "Whenever You Need Somebody");
        assert_eq!(meta.genre, "Pop");
        assert_eq!(
            meta.artwork_url.as_deref(),
            Some("https://is1-ssl.mzstatic.com/image/thumb/x/1000x1000bb.jpg")
        );
    }

    #[test]
    fn test_best_match_falls_back_to_first() {
        let response: ItunesSearchResponse = serde_json::from_str(SEARCH_RESPONSE).unwrap();
        let query = SongQuery::from_title("Something Else Entirely");
        let track = best_match(&query, &response.results).unwrap();
        assert_eq!(track.collection_name.as_deref(), Some("Covers"));

        assert!(best_match(&query, &[]).is_none());
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let track: ItunesTrack = serde_json::from_str(r#"{"trackName":"X"}"#).unwrap();
        let meta = to_metadata(&track, 600);
        assert_eq!(meta.artist, "Unknown Artist");
        assert_eq!(meta.album, "Unknown Album");
        assert!(meta.artwork_url.is_none());
    }

    struct MapProvider(HashMap<String, AppResult<Option<SongMetadata>>>);

    #[async_trait]
    impl MetadataProvider for MapProvider {
        async fn lookup(&self, record: &VideoRecord) -> AppResult<Option<SongMetadata>> {
            match self.0.get(&record.title) {
                Some(Ok(found)) => Ok(found.clone()),
                Some(Err(e)) => Err(AppError::Metadata(e.to_string())),
                None => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_annotate_catalog_is_best_effort() {
        let mut catalog: VideoCatalog = vec![
            VideoRecord::new("a", "Hit", Some(100)),
            VideoRecord::new("b", "Broken", Some(100)),
            VideoRecord::new("c", "Obscure", Some(100)),
        ]
        .into_iter()
        .collect();

        let found = SongMetadata {
            artist: "Artist".into(),
            album: "Album".into(),
            genre: "Rock".into(),
            artwork_url: None,
        };
        let mut answers = HashMap::new();
        answers.insert("Hit".to_string(), Ok(Some(found.clone())));
        answers.insert(
            "Broken".to_string(),
            Err(AppError::Metadata("timeout".into())),
        );
        let provider = MapProvider(answers);

        let summary = annotate_catalog(&provider, &mut catalog, 2).await;
        assert_eq!(summary, AnnotationSummary { matched: 1, defaulted: 2 });

        assert_eq!(catalog.get("Hit").unwrap().metadata, Some(found));
        assert!(catalog
            .get("Broken")
            .unwrap()
            .metadata
            .as_ref()
            .unwrap()
            .is_unknown());
        assert!(catalog
            .get("Obscure")
            .unwrap()
            .metadata
            .as_ref()
            .unwrap()
            .is_unknown());
    }

    #[test]
    fn test_client_builds_from_default_config() {
        assert!(ItunesClient::new(MetadataConfig::default()).is_ok());
    }
}
