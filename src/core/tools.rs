//! External tool availability checks

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::core::config::AppConfig;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    /// First line of the version output
    pub version: Option<String>,
}

/// Run `<path> <version_flag>` and report whether it succeeded
pub async fn check_tool(path: impl AsRef<Path>, version_flag: &str) -> ToolStatus {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let output = tokio::process::Command::new(path)
        .arg(version_flag)
        .kill_on_drop(true)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty());
            debug!("{} version: {:?}", name, version);
            ToolStatus {
                name,
                available: true,
                version,
            }
        }
        Ok(output) => {
            debug!("{} exited with {}", name, output.status);
            ToolStatus {
                name,
                available: false,
                version: None,
            }
        }
        Err(e) => {
            debug!("{} could not be started: {}", name, e);
            ToolStatus {
                name,
                available: false,
                version: None,
            }
        }
    }
}

/// yt-dlp and ffmpeg status for the configured paths
pub async fn check_required_tools(config: &AppConfig) -> Vec<ToolStatus> {
    let (yt_dlp, ffmpeg) = tokio::join!(
        check_tool(&config.youtube.yt_dlp_path, "--version"),
        check_tool(&config.youtube.ffmpeg_path, "-version"),
    );
    vec![yt_dlp, ffmpeg]
}

/// Log one line per tool; missing tools only warn
pub fn log_tool_status(statuses: &[ToolStatus]) {
    for status in statuses {
        if status.available {
            info!(
                "✅ {} is available ({})",
                status.name,
                status.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            warn!("⚠️ {} is not available, conversions will fail", status.name);
        }
    }
}
