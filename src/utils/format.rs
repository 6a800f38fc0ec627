//! Human-readable formatting helpers

/// Format a duration in seconds as `MM:SS`.
///
/// Minutes are not wrapped into hours, so a 75 minute video renders as
/// `75:00`. Missing durations render as `Unknown`.
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        Some(total) => format!("{:02}:{:02}", total / 60, total % 60),
        None => "Unknown".to_string(),
    }
}

/// Format a byte count using binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
