//! # doc2pdf
//!
//! HTTP service that converts uploaded office documents to PDF using
//! LibreOffice running headless.
//!
//! ## Why this crate?
//!
//! LibreOffice already renders Word, OpenDocument, and most other office
//! formats to PDF faithfully, but it is a heavyweight desktop program with a
//! command-line mode. This crate wraps that mode in a small HTTP endpoint:
//! upload a document, get the PDF back. Each request is isolated in its own
//! scratch files, every converter run is time-bounded, and the number of
//! simultaneous LibreOffice processes is capped.
//!
//! ## Request Flow
//!
//! ```text
//! POST /convert (multipart, field "file")
//!  │
//!  ├─ 1. Parse    whole form read under the body cap (400 on failure)
//!  ├─ 2. Scratch  upload written to <scratch>/<id>.<ext>
//!  ├─ 3. Convert  soffice --headless --convert-to pdf (semaphore-limited)
//!  ├─ 4. Respond  <id>.pdf streamed back as application/pdf
//!  └─ 5. Cleanup  both scratch files removed when the response ends
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2pdf::{serve, OfficeConverter, ServiceConfig, UuidV7Generator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // No converter_program set: LibreOffice is located automatically.
//!     let config = ServiceConfig::builder()
//!         .port(8080)
//!         .scratch_dir("/var/tmp/doc2pdf")
//!         .build()?;
//!     let converter = OfficeConverter::from_config(&config)?;
//!     serve(config, Arc::new(converter), Arc::new(UuidV7Generator)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` to embed the router in another axum application:
//! ```toml
//! doc2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod converter;
pub mod error;
pub mod handler;
pub mod id;
pub mod scratch;
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ServiceConfig, ServiceConfigBuilder, DEFAULT_CONVERTER_TIMEOUT, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use converter::{Converter, OfficeConverter};
pub use error::{ConfigError, ConversionError, ServiceError};
pub use id::{IdGenerator, SequentialIds, UuidV7Generator};
pub use scratch::ScratchJob;
pub use server::{router, serve, AppState};
