//! The `POST /convert` handler.
//!
//! ```text
//!  multipart ─▶ parse ─▶ write <id>.<ext> ─▶ permit ─▶ convert ─▶ open <id>.pdf ─▶ stream
//!                            │                                                     │
//!                            └──────────── ScratchJob (removed on drop) ───────────┘
//! ```
//!
//! Every step returns [`ServiceError`] through `?`. The [`ScratchJob`] is
//! created right before the input is written and is moved into the response
//! body on success, so the scratch files live exactly as long as the request.

use crate::error::ServiceError;
use crate::scratch::{self, ScratchJob};
use crate::server::AppState;
use crate::upload::{self, Upload};
use axum::body::{Body, Bytes};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::fs::File;
use tokio_stream::Stream;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

/// Filename stem used when the upload's name is empty.
const FALLBACK_STEM: &str = "document";

/// Convert one uploaded document to PDF.
pub async fn convert_document(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    let started = Instant::now();
    let limit = state.config.max_upload_bytes;

    let multipart = multipart.map_err(|e| ServiceError::MalformedForm {
        detail: e.body_text(),
    })?;
    let Upload { filename, data } = upload::parse_multipart(multipart, limit).await?;

    // ── Scratch input ─────────────────────────────────────────────────────
    let ext = scratch::source_extension(&filename);
    let job = ScratchJob::new(&state.config.scratch_dir, state.ids.next_id(), &ext);
    info!(
        "[{}] Converting '{}' ({} bytes)",
        job.id(),
        filename,
        data.len()
    );

    tokio::fs::write(job.input_path(), &data)
        .await
        .map_err(|source| ServiceError::ScratchWrite {
            path: job.input_path().to_path_buf(),
            source,
        })?;
    drop(data);

    // ── Conversion ────────────────────────────────────────────────────────
    {
        let _permit = state
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        debug!(
            "[{}] Permit acquired after {}ms",
            job.id(),
            started.elapsed().as_millis()
        );
        state
            .converter
            .convert(job.input_path(), &state.config.scratch_dir)
            .await?;
    }

    // ── Response ──────────────────────────────────────────────────────────
    let file = match File::open(job.output_path()).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ServiceError::OutputMissing {
                path: job.output_path().to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ServiceError::OutputOpen {
                path: job.output_path().to_path_buf(),
                source,
            })
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    headers.insert(CONTENT_DISPOSITION, disposition);
    if let Ok(meta) = file.metadata().await {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len()));
    }

    let body = Body::from_stream(PdfBody {
        inner: ReaderStream::new(file),
        sent: 0,
        started,
        job,
    });
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Streams the converted PDF and owns the request's scratch files until the
/// body is finished or abandoned.
struct PdfBody {
    inner: ReaderStream<File>,
    sent: u64,
    started: Instant,
    job: ScratchJob,
}

impl Stream for PdfBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                error!(
                    "[{}] Reading converted PDF failed after {} bytes: {}",
                    this.job.id(),
                    this.sent,
                    e
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                info!(
                    "[{}] Sent {} bytes in {:.1}s",
                    this.job.id(),
                    this.sent,
                    this.started.elapsed().as_secs_f64()
                );
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Build the `Content-Disposition` value for an uploaded filename.
///
/// The download name is the upload's last path component with `.pdf`
/// appended. Non-ASCII names get an ASCII fallback in `filename=` and the
/// exact name in an RFC 5987 `filename*` parameter.
pub fn content_disposition(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let base = if base.is_empty() { FALLBACK_STEM } else { base };
    let name = format!("{base}.pdf");

    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if name.is_ascii() {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(&name)
        )
    }
}
