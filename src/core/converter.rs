//! Conversion worker pool
//!
//! Runs a batch of selected videos through download, conversion and tagging
//! with a bounded number of concurrent workers. A failing video never aborts
//! the batch; it is reported alongside the successful files.

use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::core::models::{
    AppError, AppResult, BatchReport, ConversionFailure, ConversionStatus, OutputFile,
    OutputFormat, ProgressUpdate, VideoRecord,
};
use crate::core::tagger::{AudioTagger, SongTags};
use crate::core::youtube::{MediaSource, ProgressCallback};
use crate::utils::{ensure_dir_exists, sanitize_filename, unique_file_name};

/// Channel receiving per-video progress updates
pub type EventSender = mpsc::UnboundedSender<ProgressUpdate>;

/// Bounded pool converting videos to audio files
pub struct ConversionManager {
    source: Arc<dyn MediaSource>,

    /// Writes song tags after conversion, when metadata is attached
    tagger: Option<Arc<dyn AudioTagger>>,

    /// Shared by every batch so concurrent sessions respect the same limit
    semaphore: Arc<Semaphore>,

    max_workers: usize,
}

/// Everything one worker needs, cloned per task
#[derive(Clone)]
struct WorkerContext {
    source: Arc<dyn MediaSource>,
    tagger: Option<Arc<dyn AudioTagger>>,
    semaphore: Arc<Semaphore>,
    format: OutputFormat,
    dest_dir: PathBuf,
    events: Option<EventSender>,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl WorkerContext {
    fn emit(&self, record: &VideoRecord, status: ConversionStatus) {
        if let Some(ref sender) = self.events {
            let _ = sender.send(ProgressUpdate {
                video_id: record.id.clone(),
                title: record.title.clone(),
                status,
                completed: self.completed.load(Ordering::SeqCst),
                total: self.total,
            });
        }
    }

    fn progress_callback(&self, record: &VideoRecord) -> Option<ProgressCallback> {
        self.events.as_ref()?;
        let ctx = self.clone();
        let record = record.clone();
        Some(Arc::new(move |status: ConversionStatus| {
            ctx.emit(&record, status);
        }))
    }
}

impl ConversionManager {
    pub fn new(
        source: Arc<dyn MediaSource>,
        tagger: Option<Arc<dyn AudioTagger>>,
        max_workers: usize,
    ) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            source,
            tagger,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Workers not currently busy across all batches
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn source(&self) -> Arc<dyn MediaSource> {
        Arc::clone(&self.source)
    }

    /// Convert `videos` into `dest_dir`.
    ///
    /// Files are listed in completion order. Fails only when nothing was
    /// requested or the destination cannot be created.
    pub async fn convert_batch(
        &self,
        videos: Vec<VideoRecord>,
        format: OutputFormat,
        dest_dir: &Path,
        events: Option<EventSender>,
    ) -> AppResult<BatchReport> {
        if videos.is_empty() {
            return Err(AppError::InvalidInput(
                "Please select at least one video to download".to_string(),
            ));
        }

        ensure_dir_exists(dest_dir)?;

        let started_at = Utc::now();
        let total = videos.len();
        info!(
            "🚀 Converting {} videos to {} with {} workers",
            total, format, self.max_workers
        );

        let ctx = WorkerContext {
            source: Arc::clone(&self.source),
            tagger: self.tagger.clone(),
            semaphore: Arc::clone(&self.semaphore),
            format,
            dest_dir: dest_dir.to_path_buf(),
            events,
            completed: Arc::new(AtomicUsize::new(0)),
            total,
        };

        let mut taken = HashSet::new();
        let mut tasks = JoinSet::new();
        for record in videos {
            ctx.emit(&record, ConversionStatus::Pending);
            let stem = reserve_stem(&record.title, format, &mut taken);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = convert_one(&ctx, &record, &stem).await;
                ctx.completed.fetch_add(1, Ordering::SeqCst);
                match result {
                    Ok(ref file) => ctx.emit(
                        &record,
                        ConversionStatus::Completed {
                            file_name: file.file_name.clone(),
                        },
                    ),
                    Err(ref e) => ctx.emit(
                        &record,
                        ConversionStatus::Failed {
                            error: e.to_string(),
                        },
                    ),
                }
                (record, result)
            });
        }

        let mut files = Vec::new();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(file))) => {
                    info!("✅ Converted: {}", file.file_name);
                    files.push(file);
                }
                Ok((record, Err(e))) => {
                    warn!("❌ Failed to convert {}: {}", record.title, e);
                    failures.push(ConversionFailure {
                        video_id: record.id,
                        title: record.title,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Conversion worker aborted: {}", e);
                }
            }
        }

        let report = BatchReport {
            format,
            files,
            failures,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "📊 Batch finished: {} converted, {} failed",
            report.files.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Pick an output stem for `title` that no earlier video in the batch holds.
///
/// Distinct titles can sanitize to the same stem ("AC/DC" and "AC:DC"), so
/// later ones get a ` (n)` suffix.
fn reserve_stem(title: &str, format: OutputFormat, taken: &mut HashSet<String>) -> String {
    let ext = format.extension();
    let name = unique_file_name(&format!("{}.{}", sanitize_filename(title), ext), taken);
    let stem = name
        .strip_suffix(&format!(".{}", ext))
        .unwrap_or(&name)
        .to_string();
    taken.insert(name);
    stem
}

async fn convert_one(
    ctx: &WorkerContext,
    record: &VideoRecord,
    stem: &str,
) -> AppResult<OutputFile> {
    let _permit = Arc::clone(&ctx.semaphore)
        .acquire_owned()
        .await
        .map_err(|e| AppError::System(format!("Worker pool closed: {}", e)))?;

    ctx.emit(record, ConversionStatus::Downloading { percent: 0.0 });

    let path = ctx
        .source
        .download_audio(
            record,
            ctx.format,
            &ctx.dest_dir,
            stem,
            ctx.progress_callback(record),
        )
        .await?;

    if let (Some(tagger), Some(metadata)) = (&ctx.tagger, &record.metadata) {
        ctx.emit(record, ConversionStatus::Tagging);
        let tags = SongTags {
            title: record.title.clone(),
            metadata: Some(metadata.clone()),
        };
        // Untagged audio is still a usable result
        if let Err(e) = tagger.tag(&path, ctx.format, &tags).await {
            warn!("⚠️ Could not tag {}: {}", path.display(), e);
        }
    }

    let size_bytes = tokio::fs::metadata(&path).await?.len();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::Conversion(format!("Invalid output file name: {}", path.display()))
        })?;

    Ok(OutputFile {
        video_id: record.id.clone(),
        title: record.title.clone(),
        file_name,
        path,
        format: ctx.format,
        size_bytes,
    })
}
