//! URL and input validation utilities

use url::Url;

use crate::core::models::{AppError, AppResult};

/// Parse a user supplied URL, accepting only http(s)
pub fn validate_url(url: &str) -> AppResult<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("URL must not be empty".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL format: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AppError::InvalidInput(format!(
            "Unsupported URL scheme: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("  https://youtu.be/abc  ").is_ok());
        assert!(matches!(validate_url(""), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            validate_url("ftp://youtube.com/x"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(validate_url("not a url").is_err());
    }
}
