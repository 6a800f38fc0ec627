//! ZIP bundling of converted files

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::models::{AppError, AppResult, OutputFile};
use crate::utils::unique_file_name;

/// Download name offered for the bundle
pub const ARCHIVE_FILE_NAME: &str = "youtube_audio_files.zip";

/// Pack `files` into an in-memory ZIP archive.
///
/// Entries are stored flat under their file names; clashing names get a
/// ` (n)` suffix so no entry is shadowed.
pub fn build_zip(files: &[OutputFile]) -> AppResult<Vec<u8>> {
    if files.is_empty() {
        return Err(AppError::InvalidInput(
            "There are no files to archive".to_string(),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut used = HashSet::new();
    for file in files {
        let entry_name = unique_file_name(&file.file_name, &used);
        let bytes = std::fs::read(&file.path)?;
        debug!("Adding {} ({} bytes) to archive", entry_name, bytes.len());

        writer.start_file(entry_name.as_str(), options)?;
        writer.write_all(&bytes)?;
        used.insert(entry_name);
    }

    let buffer = writer.finish()?.into_inner();
    info!("📦 Built archive with {} files ({} bytes)", files.len(), buffer.len());
    Ok(buffer)
}

/// Like [`build_zip`] but off the async runtime
pub async fn build_zip_blocking(files: Vec<OutputFile>) -> AppResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || build_zip(&files))
        .await
        .map_err(|e| AppError::System(format!("Archive task failed: {}", e)))?
}

/// Write the archive for `files` to `path`
pub fn write_zip(path: &Path, files: &[OutputFile]) -> AppResult<()> {
    let bytes = build_zip(files)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::OutputFormat;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn output_file(dir: &Path, sub: &str, name: &str, content: &[u8]) -> OutputFile {
        let folder = dir.join(sub);
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(name);
        std::fs::write(&path, content).unwrap();
        OutputFile {
            video_id: format!("{}-{}", sub, name),
            title: name.to_string(),
            file_name: name.to_string(),
            path,
            format: OutputFormat::Mp3,
            size_bytes: content.len() as u64,
        }
    }

    #[test]
    fn test_archive_contains_every_file() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            output_file(dir.path(), "a", "One.mp3", b"first"),
            output_file(dir.path(), "a", "Two.mp3", b"second"),
        ];

        let bytes = build_zip(&files).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("Two.mp3")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            output_file(dir.path(), "a", "Song.mp3", b"a"),
            output_file(dir.path(), "b", "Song.mp3", b"b"),
        ];

        let bytes = build_zip(&files).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["Song (2).mp3", "Song.mp3"]);
    }

    #[test]
    fn test_empty_archive_rejected() {
        assert!(matches!(build_zip(&[]), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_source_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut file = output_file(dir.path(), "a", "Gone.mp3", b"x");
        std::fs::remove_file(&file.path).unwrap();
        file.size_bytes = 0;

        assert!(matches!(build_zip(&[file]), Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_zip_to_disk() {
        let dir = TempDir::new().unwrap();
        let files = vec![output_file(dir.path(), "a", "One.m4a", b"aac")];
        let target = dir.path().join(ARCHIVE_FILE_NAME);

        tokio_test::assert_ok!(write_zip(&target, &files));
        assert!(target.exists());

        let bytes = build_zip_blocking(files).await.unwrap();
        assert!(!bytes.is_empty());
    }
}
