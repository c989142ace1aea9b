//! Error types module
//!
//! Every fallible operation in the workspace ends in an `AppError`. Variants follow the
//! ingestion/share taxonomy: validation, configuration, transport, not-found and
//! authorization failures, plus database and internal errors for the plumbing around them.
//!
//! Share-link denials (expired, exhausted, revoked) are *not* errors; see
//! [`crate::models::ShareDenial`].
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Severity an error is logged at by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad input, unknown ids, missing identity.
    Debug,
    /// Operator mistakes: incomplete provider settings.
    Warn,
    /// Backend, database and internal failures.
    Error,
}

/// How an error presents itself to clients and logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable machine code such as `CONFIGURATION_ERROR`.
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same request may succeed.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show a client.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their internal detail in responses.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// Empty or garbage filename, malformed identifier, missing required field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider was selected but is not fully configured, or its driver is unavailable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The storage backend (or the network in front of it) rejected the call.
    /// Carries the backend's raw detail.
    #[error("Storage transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not own the referenced object or link.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Presentation attributes shared by every instance of a variant.
struct VariantInfo {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const DATABASE: VariantInfo = VariantInfo {
    status: 500,
    code: "DATABASE_ERROR",
    recoverable: true,
    action: Some("Retry after a short delay"),
    sensitive: true,
    level: LogLevel::Error,
};

const VALIDATION: VariantInfo = VariantInfo {
    status: 400,
    code: "VALIDATION_ERROR",
    recoverable: false,
    action: Some("Check the file name and request fields"),
    sensitive: false,
    level: LogLevel::Debug,
};

const CONFIGURATION: VariantInfo = VariantInfo {
    status: 409,
    code: "CONFIGURATION_ERROR",
    recoverable: false,
    action: Some("Complete the storage provider settings or select another provider"),
    sensitive: false,
    level: LogLevel::Warn,
};

const TRANSPORT: VariantInfo = VariantInfo {
    status: 502,
    code: "TRANSPORT_ERROR",
    recoverable: true,
    action: Some("Check the storage backend and retry"),
    sensitive: false,
    level: LogLevel::Error,
};

const NOT_FOUND: VariantInfo = VariantInfo {
    status: 404,
    code: "NOT_FOUND",
    recoverable: false,
    action: None,
    sensitive: false,
    level: LogLevel::Debug,
};

const FORBIDDEN: VariantInfo = VariantInfo {
    status: 403,
    code: "FORBIDDEN",
    recoverable: false,
    action: Some("Only the owner of a file can manage it"),
    sensitive: false,
    level: LogLevel::Debug,
};

const UNAUTHORIZED: VariantInfo = VariantInfo {
    status: 401,
    code: "UNAUTHORIZED",
    recoverable: false,
    action: Some("Send the caller id header"),
    sensitive: false,
    level: LogLevel::Debug,
};

const INTERNAL: VariantInfo = VariantInfo {
    status: 500,
    code: "INTERNAL_ERROR",
    recoverable: true,
    action: Some("Retry after a short delay"),
    sensitive: true,
    level: LogLevel::Error,
};

impl AppError {
    fn info(&self) -> &'static VariantInfo {
        match self {
            AppError::Database(_) => &DATABASE,
            AppError::Validation(_) => &VALIDATION,
            AppError::Configuration(_) => &CONFIGURATION,
            AppError::Transport(_) => &TRANSPORT,
            AppError::NotFound(_) => &NOT_FOUND,
            AppError::Forbidden(_) => &FORBIDDEN,
            AppError::Unauthorized(_) => &UNAUTHORIZED,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => &INTERNAL,
        }
    }

    /// Variant name, shown in non-production responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Validation(_) => "Validation",
            AppError::Configuration(_) => "Configuration",
            AppError::Transport(_) => "Transport",
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// `Display` output followed by up to five `source()` causes, one per line.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        const MAX_CAUSES: usize = 5;

        let mut causes = std::iter::successors(self.source(), |err| (*err).source());
        let mut details = self.to_string();
        for cause in causes.by_ref().take(MAX_CAUSES) {
            details.push_str("\n  Caused by: ");
            details.push_str(&cause.to_string());
        }
        if causes.next().is_some() {
            details.push_str("\n  ... (truncated)");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.info().status
    }

    fn error_code(&self) -> &'static str {
        self.info().code
    }

    fn is_recoverable(&self) -> bool {
        self.info().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.info().action
    }

    fn is_sensitive(&self) -> bool {
        self.info().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.info().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access the catalog".to_string(),
            AppError::Transport(msg) => format!("Storage backend error: {}", msg),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::Validation(msg)
            | AppError::Configuration(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
        }
    }
}
