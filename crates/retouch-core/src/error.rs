//! Error types module
//!
//! All failures of the engine are unified under [`AppError`]. Each variant
//! self-describes its HTTP presentation through [`ErrorMetadata`], so the API
//! layer only renders what the error says about itself.

/// Level at which the API layer logs an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Bad requests the client can fix: rejected parameters, unknown sessions.
    Debug,
    Info,
    /// Limits hit: oversize uploads, a full session store.
    Warn,
    /// Server-side failures.
    Error,
}

/// How an error presents itself over HTTP.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code clients can match on, e.g. `INVALID_PARAMETER`.
    fn error_code(&self) -> &'static str;

    /// True when retrying, possibly after fixing the input, can succeed.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to return to the client.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their details.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt image data: {0}")]
    CorruptData(String),

    #[error("Payload too large: {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Operation '{operation}' failed: {reason}")]
    ProcessingError { operation: String, reason: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Session capacity exceeded: {limit} sessions are open")]
    SessionCapacityExceeded { limit: usize },

    #[error("Session history is full: {limit} operations since the last reset")]
    HistoryLimitExceeded { limit: usize },

    #[error("Request timed out after {secs}s")]
    RequestTimeout { secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Per-variant presentation: status, code, recoverable, action, sensitive, log level.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::UnsupportedFormat(_) => (
            400,
            "UNSUPPORTED_FORMAT",
            false,
            Some("Upload a PNG, JPEG, BMP, TIFF or WebP image"),
            false,
            LogLevel::Debug,
        ),
        AppError::CorruptData(_) => (
            400,
            "CORRUPT_DATA",
            false,
            Some("Check the file is a valid image and upload it again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Upload the image again to start a new session"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnknownOperation(_) => (
            400,
            "UNKNOWN_OPERATION",
            false,
            Some("List available operations with GET /operations"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidParameter { .. } => (
            400,
            "INVALID_PARAMETER",
            false,
            Some("Check parameter ranges with GET /operations"),
            false,
            LogLevel::Debug,
        ),
        AppError::ProcessingError { .. } => (
            422,
            "PROCESSING_ERROR",
            false,
            Some("Try a different operation or reset the image"),
            false,
            LogLevel::Warn,
        ),
        AppError::NothingToUndo => (
            200,
            "NOTHING_TO_UNDO",
            false,
            None,
            false,
            LogLevel::Info,
        ),
        AppError::SessionCapacityExceeded { .. } => (
            503,
            "SESSION_CAPACITY_EXCEEDED",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::HistoryLimitExceeded { .. } => (
            409,
            "HISTORY_LIMIT_EXCEEDED",
            true,
            Some("Undo or reset before applying more operations"),
            false,
            LogLevel::Info,
        ),
        AppError::RequestTimeout { .. } => (
            408,
            "REQUEST_TIMEOUT",
            true,
            Some("Fetch GET /session/{id}: an edit may have completed after the timeout"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Variant name, shown as `error_type` outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::CorruptData(_) => "CorruptData",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::UnknownOperation(_) => "UnknownOperation",
            AppError::InvalidParameter { .. } => "InvalidParameter",
            AppError::ProcessingError { .. } => "ProcessingError",
            AppError::NothingToUndo => "NothingToUndo",
            AppError::SessionCapacityExceeded { .. } => "SessionCapacityExceeded",
            AppError::HistoryLimitExceeded { .. } => "HistoryLimitExceeded",
            AppError::RequestTimeout { .. } => "RequestTimeout",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Name of the offending parameter, when the error is a parameter rejection.
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            AppError::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Display text followed by the `source()` chain.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}
