//! Response types shared by the HTTP handlers

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rocket::http::{ContentType, Header, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::core::models::{AppError, OutputFormat};

/// Plain `{ success, message }` body
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// HTTP status for each error kind
pub fn error_status(error: &AppError) -> Status {
    match error {
        AppError::InvalidInput(_) | AppError::Parse(_) => Status::BadRequest,
        AppError::NotFound(_) => Status::NotFound,
        AppError::Busy(_) => Status::Conflict,
        AppError::Youtube(_)
        | AppError::Download(_)
        | AppError::Metadata(_)
        | AppError::Network(_) => Status::BadGateway,
        _ => Status::InternalServerError,
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = error_status(&self);
        if status.code >= 500 {
            error!("❌ {} {} failed: {}", req.method(), req.uri(), self);
        } else {
            warn!("⚠️ {} {} rejected: {}", req.method(), req.uri(), self);
        }

        Response::build_from(Json(ApiMessage::error(self.to_string())).respond_to(req)?)
            .status(status)
            .ok()
    }
}

/// File body served as a download
#[derive(rocket::Responder)]
pub struct Attachment {
    inner: (ContentType, Vec<u8>),
    disposition: Header<'static>,
}

impl Attachment {
    pub fn new(content_type: ContentType, file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            inner: (content_type, bytes),
            disposition: Header::new("Content-Disposition", content_disposition(file_name)),
        }
    }

    pub fn audio(format: OutputFormat, file_name: &str, bytes: Vec<u8>) -> Self {
        let content_type =
            ContentType::parse_flexible(format.mime_type()).unwrap_or(ContentType::Binary);
        Self::new(content_type, file_name, bytes)
    }

    pub fn zip(file_name: &str, bytes: Vec<u8>) -> Self {
        Self::new(ContentType::ZIP, file_name, bytes)
    }
}

/// Bytes escaped in an RFC 5987 `filename*` value
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", fallback);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(file_name, FILENAME_ENCODE_SET)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&AppError::InvalidInput("x".into())),
            Status::BadRequest
        );
        assert_eq!(error_status(&AppError::NotFound("x".into())), Status::NotFound);
        assert_eq!(error_status(&AppError::Busy("x".into())), Status::Conflict);
        assert_eq!(error_status(&AppError::Youtube("x".into())), Status::BadGateway);
        assert_eq!(
            error_status(&AppError::Conversion("x".into())),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("Song.mp3"),
            "attachment; filename=\"Song.mp3\""
        );
    }

    #[test]
    fn test_content_disposition_unicode() {
        let header = content_disposition("Café.mp3");
        assert!(header.starts_with("attachment; filename=\"Caf_.mp3\""));
        assert!(header.ends_with("filename*=UTF-8''Caf%C3%A9.mp3"));
    }

    #[test]
    fn test_content_disposition_escapes_separators() {
        let header = content_disposition("Ça \"va\"; ok.m4a");
        assert!(header.starts_with("attachment; filename=\"_a _va_; ok.m4a\""));
        assert!(header.ends_with("filename*=UTF-8''%C3%87a%20%22va%22%3B%20ok.m4a"));
    }
}
