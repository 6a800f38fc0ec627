//! Core business logic module
//!
//! Domain models, the YouTube source, metadata lookup, the conversion worker
//! pool and session state for the converter.

pub mod archive;
pub mod config;
pub mod converter;
pub mod metadata;
pub mod models;
pub mod session;
pub mod tagger;
pub mod tools;
pub mod youtube;

// Re-export commonly used types
pub use config::AppConfig;
pub use converter::ConversionManager;
pub use session::{Session, SessionStore};
