//! UI session state
//!
//! Every browser tab owns one [`Session`]: the loaded catalog, which videos
//! are ticked, the sidebar settings and the state of the current or last
//! download batch. Sessions live in memory only and are dropped (with their
//! work directory) when removed or idle past the configured TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::models::{
    AppError, AppResult, BatchReport, ConversionStatus, OutputFile, OutputFormat,
    ProgressUpdate, SongMetadata, VideoCatalog, VideoRecord,
};

/// Sidebar toggles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettings {
    pub format: OutputFormat,
    pub use_metadata: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Mp3,
            use_metadata: true,
        }
    }
}

/// Counters of the running or last batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    catalog: VideoCatalog,
    selected: HashSet<String>,
    settings: SessionSettings,
    downloading: bool,
    statuses: HashMap<String, ConversionStatus>,
    progress: Option<BatchProgress>,
    last_report: Option<BatchReport>,
    last_error: Option<String>,
    work_dir: PathBuf,
    created_at: DateTime<Utc>,
    /// Set once the store has dropped the session
    closed: bool,
}

impl Session {
    pub fn new(id: impl Into<String>, work_dir: PathBuf, settings: SessionSettings) -> Self {
        Self {
            id: id.into(),
            catalog: VideoCatalog::new(),
            selected: HashSet::new(),
            settings,
            downloading: false,
            statuses: HashMap::new(),
            progress: None,
            last_report: None,
            last_error: None,
            work_dir,
            created_at: Utc::now(),
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn catalog(&self) -> &VideoCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Where the current batch writes its files
    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("output")
    }

    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Install a freshly loaded catalog, dropping selection and statuses
    pub fn replace_catalog(&mut self, catalog: VideoCatalog) {
        self.catalog = catalog;
        self.selected.clear();
        self.statuses.clear();
        self.progress = None;
        self.last_error = None;
    }

    /// Copy metadata from an annotated copy of the catalog onto matching titles
    pub fn merge_metadata(&mut self, annotated: &VideoCatalog) {
        for record in annotated.iter() {
            if let Some(existing) = self.catalog.get_mut(&record.title) {
                existing.metadata = record.metadata.clone();
            }
        }
    }

    pub fn set_metadata(&mut self, title: &str, metadata: SongMetadata) -> AppResult<()> {
        let record = self
            .catalog
            .get_mut(title)
            .ok_or_else(|| AppError::NotFound(format!("Video not loaded: {}", title)))?;
        record.metadata = Some(metadata);
        Ok(())
    }

    pub fn select(&mut self, title: &str) -> AppResult<()> {
        self.ensure_known(title)?;
        self.selected.insert(title.to_string());
        Ok(())
    }

    pub fn deselect(&mut self, title: &str) -> AppResult<()> {
        self.ensure_known(title)?;
        self.selected.remove(title);
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selected = self.catalog.titles().map(str::to_string).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, title: &str) -> bool {
        self.selected.contains(title)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Ticked videos in catalog order
    pub fn selected_videos(&self) -> Vec<VideoRecord> {
        self.catalog
            .iter()
            .filter(|record| self.selected.contains(&record.title))
            .cloned()
            .collect()
    }

    /// Mark a batch as running and hand out the videos it should convert.
    ///
    /// Metadata is stripped from the records when the metadata toggle is off
    /// so the converter writes no song tags.
    pub fn begin_download(&mut self) -> AppResult<Vec<VideoRecord>> {
        if self.closed {
            return Err(AppError::NotFound(format!("Unknown session: {}", self.id)));
        }
        if self.downloading {
            return Err(AppError::Busy(
                "A download is already running for this session".to_string(),
            ));
        }

        let mut videos = self.selected_videos();
        if videos.is_empty() {
            return Err(AppError::InvalidInput(
                "Please select at least one video to download".to_string(),
            ));
        }

        if !self.settings.use_metadata {
            for video in &mut videos {
                video.metadata = None;
            }
        }

        self.downloading = true;
        self.last_report = None;
        self.last_error = None;
        self.statuses = videos
            .iter()
            .map(|v| (v.title.clone(), ConversionStatus::Pending))
            .collect();
        self.progress = Some(BatchProgress {
            completed: 0,
            total: videos.len(),
        });

        Ok(videos)
    }

    pub fn apply_progress(&mut self, update: &ProgressUpdate) {
        self.statuses
            .insert(update.title.clone(), update.status.clone());
        self.progress = Some(BatchProgress {
            completed: update.completed,
            total: update.total,
        });
    }

    pub fn finish_download(&mut self, result: AppResult<BatchReport>) {
        self.downloading = false;
        match result {
            Ok(report) => {
                for failure in &report.failures {
                    self.statuses.insert(
                        failure.title.clone(),
                        ConversionStatus::Failed {
                            error: failure.error.clone(),
                        },
                    );
                }
                self.progress = Some(BatchProgress {
                    completed: report.requested(),
                    total: report.requested(),
                });
                self.last_report = Some(report);
            }
            Err(e) => {
                warn!("Batch for session {} failed: {}", self.id, e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Look up a produced file of the last batch by its file name
    pub fn find_file(&self, file_name: &str) -> AppResult<&OutputFile> {
        self.last_report
            .as_ref()
            .and_then(|report| report.files.iter().find(|f| f.file_name == file_name))
            .ok_or_else(|| AppError::NotFound(format!("No such file: {}", file_name)))
    }

    pub fn output_files(&self) -> &[OutputFile] {
        self.last_report
            .as_ref()
            .map(|report| report.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let videos = self
            .catalog
            .iter()
            .map(|record| VideoView {
                id: record.id.clone(),
                title: record.title.clone(),
                duration: record.formatted_duration(),
                url: record.url.clone(),
                metadata: record.metadata.clone(),
                selected: self.selected.contains(&record.title),
                status: self.statuses.get(&record.title).cloned(),
            })
            .collect();

        SessionSnapshot {
            id: self.id.clone(),
            settings: self.settings,
            videos,
            selected_count: self.selected.len(),
            downloading: self.downloading,
            progress: self.progress,
            files: self.output_files().to_vec(),
            failures: self
                .last_report
                .as_ref()
                .map(|r| r.failures.clone())
                .unwrap_or_default(),
            message: self
                .last_error
                .clone()
                .or_else(|| self.last_report.as_ref().map(BatchReport::summary)),
            created_at: self.created_at,
        }
    }

    fn ensure_known(&self, title: &str) -> AppResult<()> {
        if self.catalog.contains(title) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Video not loaded: {}", title)))
        }
    }
}

/// One catalog entry as rendered by the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoView {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub url: String,
    pub metadata: Option<SongMetadata>,
    pub selected: bool,
    pub status: Option<ConversionStatus>,
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub settings: SessionSettings,
    pub videos: Vec<VideoView>,
    pub selected_count: usize,
    pub downloading: bool,
    pub progress: Option<BatchProgress>,
    pub files: Vec<OutputFile>,
    pub failures: Vec<crate::core::models::ConversionFailure>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub type SharedSession = Arc<RwLock<Session>>;

struct SessionEntry {
    session: SharedSession,
    /// Unix millis of the last lookup
    last_access: AtomicI64,
}

impl SessionEntry {
    fn touch(&self) {
        self.last_access
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// All live sessions
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    root: PathBuf,
    ttl: chrono::Duration,
    default_settings: SessionSettings,
}

impl SessionStore {
    pub fn new(root: PathBuf, ttl: std::time::Duration, default_settings: SessionSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            root,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(2)),
            default_settings,
        }
    }

    pub fn create(&self) -> (String, SharedSession) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(RwLock::new(Session::new(
            id.clone(),
            self.root.join(&id),
            self.default_settings,
        )));

        self.sessions.insert(
            id.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                last_access: AtomicI64::new(Utc::now().timestamp_millis()),
            },
        );
        info!("🆕 Created session {}", id);
        (id, session)
    }

    pub fn get(&self, id: &str) -> AppResult<SharedSession> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown session: {}", id)))?;
        entry.touch();
        Ok(Arc::clone(&entry.session))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop a session and its work directory.
    ///
    /// A session with a running batch is kept and `Busy` is returned, since
    /// the batch would otherwise write into the deleted directory.
    pub async fn remove(&self, id: &str) -> AppResult<()> {
        let session = self.get(id)?;
        let mut guard = session.write().await;
        if guard.is_downloading() {
            return Err(AppError::Busy(
                "Wait for the running download to finish before closing the session".to_string(),
            ));
        }
        if self.sessions.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Unknown session: {}", id)));
        }
        guard.closed = true;
        let work_dir = guard.work_dir().to_path_buf();
        drop(guard);

        remove_work_dir(&work_dir).await;
        info!("🗑️ Removed session {}", id);
        Ok(())
    }

    /// Remove sessions idle since before `now - ttl`; running batches are kept
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = (now - self.ttl).timestamp_millis();

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.last_access.load(Ordering::Relaxed) < cutoff)
            .filter(|entry| {
                entry
                    .session
                    .try_read()
                    .map(|s| !s.is_downloading())
                    .unwrap_or(false)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut purged = 0;
        for id in expired {
            let Some(session) = self.sessions.get(&id).map(|e| Arc::clone(&e.session)) else {
                continue;
            };
            let mut guard = session.write().await;
            // Re-checked under the lock: a batch may have started meanwhile
            if guard.is_downloading() || self.sessions.remove(&id).is_none() {
                continue;
            }
            guard.closed = true;
            let work_dir = guard.work_dir().to_path_buf();
            drop(guard);

            remove_work_dir(&work_dir).await;
            purged += 1;
        }

        if purged > 0 {
            info!("🧹 Purged {} expired sessions", purged);
        }
        purged
    }
}

async fn remove_work_dir(path: &Path) {
    if tokio::fs::metadata(path).await.is_err() {
        return;
    }
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!("Removed work directory {}", path.display()),
        Err(e) => warn!("Failed to remove work directory {}: {}", path.display(), e),
    }
}
