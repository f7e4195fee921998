//! Multipart form parsing.
//!
//! The whole form is read before anything touches the disk, so malformed,
//! oversized, and incomplete requests are rejected without creating scratch
//! files. The size cap itself is enforced by axum's body limit; this module
//! only translates the resulting errors.

use crate::error::ServiceError;
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

/// Name of the form field carrying the document.
pub const FILE_FIELD: &str = "file";

/// The uploaded document.
#[derive(Debug)]
pub struct Upload {
    /// Filename exactly as the client sent it.
    pub filename: String,
    pub data: Bytes,
}

/// Read the form and return its `file` part.
///
/// Unknown fields are drained and ignored. If `file` appears more than once
/// the first occurrence wins. A `file` part without a filename counts as
/// missing, because it is a plain form value rather than an upload.
pub async fn parse_multipart(
    mut multipart: Multipart,
    limit: usize,
) -> Result<Upload, ServiceError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, limit))?
    {
        let is_file = field.name() == Some(FILE_FIELD) && upload.is_none();
        let filename = field.file_name().map(str::to_string);

        // Read every part, wanted or not, so a body over the cap is always
        // detected before we return.
        let data = field.bytes().await.map_err(|e| form_error(e, limit))?;

        match (is_file, filename) {
            (true, Some(filename)) => {
                debug!("Received '{}' ({} bytes)", filename, data.len());
                upload = Some(Upload { filename, data });
            }
            _ => debug!("Ignoring form part ({} bytes)", data.len()),
        }
    }

    upload.ok_or(ServiceError::MissingFile { field: FILE_FIELD })
}

/// Map a multipart read failure onto a client error.
pub(crate) fn form_error(e: MultipartError, limit: usize) -> ServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge { limit }
    } else {
        ServiceError::MalformedForm {
            detail: e.body_text(),
        }
    }
}
