//! File system utilities

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::models::AppResult;

/// Longest file stem we hand to yt-dlp/ffmpeg
const MAX_STEM_CHARS: usize = 150;

/// Ensure directory exists
pub fn ensure_dir_exists(path: &Path) -> AppResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sanitize a video title into a file stem safe on every platform
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed: String = collapsed
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();

    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

/// Return `name` or `name (n).ext` so that it does not collide with `taken`.
pub fn unique_file_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let ext = path.extension().and_then(|e| e.to_str());

    (2..)
        .map(|n| match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back in Black"), "AC_DC_ Back in Black");
        assert_eq!(sanitize_filename("  spaced   out  "), "spaced out");
        assert_eq!(sanitize_filename("..."), "untitled");
        assert_eq!(sanitize_filename("what?*"), "what__");
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn test_unique_file_name() {
        let mut taken = HashSet::new();
        assert_eq!(unique_file_name("song.mp3", &taken), "song.mp3");

        taken.insert("song.mp3".to_string());
        taken.insert("song (2).mp3".to_string());
        assert_eq!(unique_file_name("song.mp3", &taken), "song (3).mp3");
    }

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
