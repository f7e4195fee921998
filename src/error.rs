//! Error types for the doc2pdf library.
//!
//! Three error types reflect three layers:
//!
//! * [`ServiceError`]: a request failed. Each variant knows its HTTP status
//!   ([`ServiceError::status_code`]) and renders itself as a short plain-text
//!   response, so the handler can simply `?` its way through the pipeline.
//!
//! * [`ConversionError`]: the external converter failed. Kept separate so
//!   [`crate::converter::Converter`] implementations don't depend on HTTP
//!   types; the handler wraps it in [`ServiceError::Conversion`].
//!
//! * [`ConfigError`]: [`crate::config::ServiceConfigBuilder::build`]
//!   rejected a setting at startup.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;

/// All errors that end a `/convert` request.
#[derive(Debug, Error)]
pub enum ServiceError {
    // ── Client input errors (400) ─────────────────────────────────────────
    /// The body is not a readable multipart form.
    #[error("Unable to parse form: {detail}")]
    MalformedForm { detail: String },

    /// The body exceeded the configured upload cap.
    #[error("Unable to parse form: upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// The form has no file part named `file`.
    #[error("Unable to retrieve file from form-data: no '{field}' file part")]
    MissingFile { field: &'static str },

    // ── Resource errors (500) ─────────────────────────────────────────────
    /// Creating or writing the scratch input file failed.
    #[error("Unable to copy file to temp location '{path}': {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Conversion errors (500) ───────────────────────────────────────────
    /// The converter could not be run or reported failure.
    #[error("Error converting file to PDF: {0}")]
    Conversion(#[from] ConversionError),

    /// The converter exited cleanly but wrote nothing.
    #[error("Unable to open converted PDF file output: '{path}' was not produced")]
    OutputMissing { path: PathBuf },

    /// The converted file exists but could not be opened.
    #[error("Unable to open converted PDF file output '{path}': {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MalformedForm { .. }
            | ServiceError::PayloadTooLarge { .. }
            | ServiceError::MissingFile { .. } => StatusCode::BAD_REQUEST,
            ServiceError::ScratchWrite { .. }
            | ServiceError::Conversion(_)
            | ServiceError::OutputMissing { .. }
            | ServiceError::OutputOpen { .. }
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::info!("Rejected request: {}", self);
        } else {
            tracing::error!("Request failed: {:#}", self);
        }
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Failure of the external converter process.
///
/// The converter's own diagnostics are forwarded to the log while it runs;
/// these variants only say how the process ended.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The executable could not be started.
    #[error("failed to launch converter '{program}': {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited with a non-zero status.
    #[error("converter exited with status {code}")]
    Exited { code: i32 },

    /// The process was terminated by a signal.
    #[error("converter was terminated by a signal")]
    Killed,

    /// The process exceeded the configured timeout and was killed.
    #[error("converter timed out after {ms}ms")]
    TimedOut { ms: u64 },

    /// Waiting on the process or preparing its environment failed.
    #[error("converter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
