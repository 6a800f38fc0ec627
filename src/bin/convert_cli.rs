use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use yt_audio_converter::core::archive::{write_zip, ARCHIVE_FILE_NAME};
use yt_audio_converter::core::metadata::annotate_catalog;
use yt_audio_converter::core::models::{BatchReport, ConversionStatus, ProgressUpdate};
use yt_audio_converter::core::youtube::load_content;
use yt_audio_converter::utils::format_bytes;
use yt_audio_converter::{AppConfig, AppResult, AppState, OutputFormat};

const USAGE: &str = "Usage: convert_cli <url> [output-dir] [--m4a] [--metadata] [--zip]";

struct CliArgs {
    url: String,
    output_dir: PathBuf,
    format: OutputFormat,
    metadata: bool,
    zip: bool,
}

fn parse_args(args: &[String]) -> Option<CliArgs> {
    let mut positional = Vec::new();
    let mut format = OutputFormat::Mp3;
    let mut metadata = false;
    let mut zip = false;

    for arg in args {
        match arg.as_str() {
            "--m4a" => format = OutputFormat::M4a,
            "--metadata" => metadata = true,
            "--zip" => zip = true,
            flag if flag.starts_with("--") => return None,
            value => positional.push(value.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let url = positional.next()?;
    let output_dir = positional
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    Some(CliArgs {
        url,
        output_dir,
        format,
        metadata,
        zip,
    })
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(args) = parse_args(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let config = AppConfig::load_or_default(None);
    yt_audio_converter::utils::init_tracing(&config.logging.level);

    match run(config, &args).await {
        Ok(report) => print_report(&report, &args),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

async fn run(config: AppConfig, args: &CliArgs) -> AppResult<BatchReport> {
    let state = AppState::new(config)?;

    let mut catalog = load_content(
        state.source.as_ref(),
        &args.url,
        state.config.download.skip_unavailable,
        state.config.youtube.info_concurrency,
        state.config.youtube.playlist_max_items,
    )
    .await?;
    println!("Found {} videos", catalog.len());

    if args.metadata {
        let summary = annotate_catalog(
            state.metadata.as_ref(),
            &mut catalog,
            state.config.metadata.lookup_concurrency,
        )
        .await;
        println!(
            "Metadata: {} matched, {} unknown",
            summary.matched, summary.defaulted
        );
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if let Some(line) = describe_update(&update) {
                println!("{line}");
            }
        }
    });

    let converter = Arc::clone(&state.converter);
    let report = converter
        .convert_batch(catalog.into_vec(), args.format, &args.output_dir, Some(tx))
        .await?;
    let _ = printer.await;

    if args.zip && !report.files.is_empty() {
        write_zip(&args.output_dir.join(ARCHIVE_FILE_NAME), &report.files)?;
    }

    Ok(report)
}

/// One console line per finished video
fn describe_update(update: &ProgressUpdate) -> Option<String> {
    match update.status {
        ConversionStatus::Completed { ref file_name } => Some(format!(
            "[{}/{}] ✓ {}",
            update.completed, update.total, file_name
        )),
        ConversionStatus::Failed { ref error } => Some(format!(
            "[{}/{}] ✗ {}: {}",
            update.completed, update.total, update.title, error
        )),
        _ => None,
    }
}

fn print_report(report: &BatchReport, args: &CliArgs) {
    println!("{}", report.summary());
    for file in &report.files {
        println!("  {} ({})", file.path.display(), format_bytes(file.size_bytes));
    }
    for failure in &report.failures {
        println!("  failed: {} - {}", failure.title, failure.error);
    }
    if args.zip && !report.files.is_empty() {
        println!(
            "Archive: {}",
            args.output_dir.join(ARCHIVE_FILE_NAME).display()
        );
    }
}
