//! Retouch Core Library
//!
//! Error taxonomy, configuration and wire models shared by the processing
//! engine and the HTTP surface.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, EngineConfig, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
