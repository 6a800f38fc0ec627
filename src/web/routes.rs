//! HTTP handlers
//!
//! The UI talks to a small JSON API keyed by session id. Every handler takes
//! the session lock only for in-memory updates; YouTube, iTunes and the
//! conversion batch run without holding it.

use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, State};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::archive::{build_zip_blocking, ARCHIVE_FILE_NAME};
use crate::core::converter::ConversionManager;
use crate::core::metadata::{annotate_catalog, AnnotationSummary};
use crate::core::models::{AppError, AppResult, OutputFormat, VideoRecord};
use crate::core::session::{SessionSettings, SessionSnapshot, SharedSession};
use crate::core::tools::{check_required_tools, ToolStatus};
use crate::core::youtube::load_content;
use crate::web::responses::{ApiMessage, Attachment};
use crate::AppState;

const INDEX_HTML: &str = include_str!("static/index.html");

#[get("/")]
pub fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub sessions: usize,
    pub max_workers: usize,
    pub tools: Vec<ToolStatus>,
}

#[get("/health")]
pub async fn health(state: &State<AppState>) -> Json<HealthReport> {
    let tools = check_required_tools(&state.config).await;
    let status = if tools.iter().all(|t| t.available) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthReport {
        status,
        name: crate::NAME,
        version: crate::VERSION,
        sessions: state.sessions.len(),
        max_workers: state.converter.max_workers(),
        tools,
    })
}

#[post("/sessions")]
pub async fn create_session(state: &State<AppState>) -> Custom<Json<SessionSnapshot>> {
    let (_, session) = state.sessions.create();
    let snapshot = session.read().await.snapshot();
    Custom(Status::Created, Json(snapshot))
}

#[get("/sessions/<id>")]
pub async fn get_session(state: &State<AppState>, id: &str) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(id)?;
    let snapshot = session.read().await.snapshot();
    Ok(Json(snapshot))
}

#[delete("/sessions/<id>")]
pub async fn delete_session(state: &State<AppState>, id: &str) -> AppResult<Json<ApiMessage>> {
    state.sessions.remove(id).await?;
    Ok(Json(ApiMessage::ok("Session removed")))
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub url: String,
}

#[post("/sessions/<id>/load", data = "<request>")]
pub async fn load_url(
    state: &State<AppState>,
    id: &str,
    request: Json<LoadRequest>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(id)?;
    if session.read().await.is_downloading() {
        return Err(AppError::Busy(
            "Wait for the current download to finish".to_string(),
        ));
    }

    let url = request.url.trim();
    info!("🔗 Session {} loading {}", id, url);

    let catalog = load_content(
        state.source.as_ref(),
        url,
        state.config.download.skip_unavailable,
        state.config.youtube.info_concurrency,
        state.config.youtube.playlist_max_items,
    )
    .await?;

    // A batch may have started while the catalog was loading
    let mut guard = session.write().await;
    if guard.is_downloading() {
        return Err(AppError::Busy(
            "Wait for the current download to finish".to_string(),
        ));
    }
    guard.replace_catalog(catalog);
    Ok(Json(guard.snapshot()))
}

#[derive(Debug, Serialize)]
pub struct AnnotateResponse {
    #[serde(flatten)]
    pub summary: AnnotationSummary,
    pub session: SessionSnapshot,
}

#[post("/sessions/<id>/annotate")]
pub async fn annotate(state: &State<AppState>, id: &str) -> AppResult<Json<AnnotateResponse>> {
    let session = state.sessions.get(id)?;
    let mut catalog = session.read().await.catalog().clone();
    if catalog.is_empty() {
        return Err(AppError::InvalidInput(
            "Load a video or playlist first".to_string(),
        ));
    }

    let summary = annotate_catalog(
        state.metadata.as_ref(),
        &mut catalog,
        state.config.metadata.lookup_concurrency,
    )
    .await;

    let mut guard = session.write().await;
    guard.merge_metadata(&catalog);
    Ok(Json(AnnotateResponse {
        summary,
        session: guard.snapshot(),
    }))
}

/// Partial settings update; `save_as_mp4` mirrors the UI toggle
#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub format: Option<OutputFormat>,
    pub save_as_mp4: Option<bool>,
    pub use_metadata: Option<bool>,
}

impl SettingsRequest {
    fn apply(&self, mut settings: SessionSettings) -> SessionSettings {
        if let Some(save_as_mp4) = self.save_as_mp4 {
            settings.format = OutputFormat::from_save_as_mp4(save_as_mp4);
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(use_metadata) = self.use_metadata {
            settings.use_metadata = use_metadata;
        }
        settings
    }
}

#[put("/sessions/<id>/settings", data = "<request>")]
pub async fn update_settings(
    state: &State<AppState>,
    id: &str,
    request: Json<SettingsRequest>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(id)?;
    let mut guard = session.write().await;
    let settings = request.apply(guard.settings());
    guard.set_settings(settings);
    Ok(Json(guard.snapshot()))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SelectionRequest {
    Select { title: String },
    Deselect { title: String },
    All,
    Clear,
}

#[post("/sessions/<id>/selection", data = "<request>")]
pub async fn update_selection(
    state: &State<AppState>,
    id: &str,
    request: Json<SelectionRequest>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.sessions.get(id)?;
    let mut guard = session.write().await;
    match request.into_inner() {
        SelectionRequest::Select { title } => guard.select(&title)?,
        SelectionRequest::Deselect { title } => guard.deselect(&title)?,
        SelectionRequest::All => guard.select_all(),
        SelectionRequest::Clear => guard.clear_selection(),
    }
    Ok(Json(guard.snapshot()))
}

#[post("/sessions/<id>/download")]
pub async fn start_download(
    state: &State<AppState>,
    id: &str,
) -> AppResult<Custom<Json<SessionSnapshot>>> {
    let session = state.sessions.get(id)?;

    let (videos, format, output_dir, snapshot) = {
        let mut guard = session.write().await;
        let videos = guard.begin_download()?;
        (
            videos,
            guard.settings().format,
            guard.output_dir(),
            guard.snapshot(),
        )
    };

    info!(
        "⬇️ Session {} downloading {} videos as {}",
        id,
        videos.len(),
        format
    );

    tokio::spawn(run_batch(
        Arc::clone(&state.converter),
        session,
        videos,
        format,
        output_dir,
    ));

    Ok(Custom(Status::Accepted, Json(snapshot)))
}

/// Convert `videos` into a fresh `output_dir`, mirroring progress into the session
pub async fn run_batch(
    converter: Arc<ConversionManager>,
    session: SharedSession,
    videos: Vec<VideoRecord>,
    format: OutputFormat,
    output_dir: PathBuf,
) {
    if tokio::fs::metadata(&output_dir).await.is_ok() {
        if let Err(e) = tokio::fs::remove_dir_all(&output_dir).await {
            warn!("Failed to clear {}: {}", output_dir.display(), e);
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress_session = Arc::clone(&session);
    let forwarder = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            progress_session.write().await.apply_progress(&update);
        }
    });

    let result = converter
        .convert_batch(videos, format, &output_dir, Some(tx))
        .await;

    // All senders are gone once the batch returns
    let _ = forwarder.await;
    session.write().await.finish_download(result);
}

#[get("/sessions/<id>/files/<name>")]
pub async fn download_file(state: &State<AppState>, id: &str, name: &str) -> AppResult<Attachment> {
    let session = state.sessions.get(id)?;
    let file = session.read().await.find_file(name)?.clone();

    let bytes = tokio::fs::read(&file.path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::NotFound(format!("File no longer on disk: {}", file.file_name))
        }
        _ => AppError::Io(e),
    })?;

    Ok(Attachment::audio(file.format, &file.file_name, bytes))
}

#[get("/sessions/<id>/archive")]
pub async fn download_archive(state: &State<AppState>, id: &str) -> AppResult<Attachment> {
    let session = state.sessions.get(id)?;
    let files = session.read().await.output_files().to_vec();
    if files.is_empty() {
        return Err(AppError::NotFound(
            "No converted files to archive".to_string(),
        ));
    }

    let bytes = build_zip_blocking(files).await?;
    Ok(Attachment::zip(ARCHIVE_FILE_NAME, bytes))
}
