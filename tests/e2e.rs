//! End-to-end tests against a real LibreOffice installation.
//!
//! These start the full router with [`OfficeConverter`] and convert real
//! documents, so they need `soffice` on the machine and take a few seconds
//! each. They are gated behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Point at a specific install with `SOFFICE_PATH=/path/to/soffice`.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use doc2pdf::{router, AppState, OfficeConverter, ServiceConfig, UuidV7Generator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set and LibreOffice can be found.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match office_locate::locate_office() {
            Ok(p) => p,
            Err(e) => {
                println!("SKIP: {e}");
                return;
            }
        }
    }};
}

fn e2e_server(program: PathBuf, scratch: &std::path::Path) -> TestServer {
    let config = ServiceConfig::builder()
        .scratch_dir(scratch)
        .converter_timeout(Some(Duration::from_secs(180)))
        .max_concurrent_conversions(2)
        .converter_program(program)
        .build()
        .unwrap();
    let converter = OfficeConverter::from_config(&config).unwrap();
    let state = AppState::new(config, Arc::new(converter), Arc::new(UuidV7Generator));
    TestServer::new(router(Arc::new(state))).unwrap()
}

fn assert_pdf(bytes: &[u8], context: &str) {
    assert!(
        bytes.starts_with(b"%PDF-"),
        "[{context}] body is not a PDF (first bytes: {:?})",
        &bytes[..bytes.len().min(16)]
    );
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "[{context}] PDF has no EOF marker"
    );
    println!("[{context}] ✓  {} bytes", bytes.len());
}

// ── Conversions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_plain_text_to_pdf() {
    let program = e2e_skip_unless_ready!();
    let scratch = tempfile::tempdir().unwrap();
    let server = e2e_server(program, scratch.path());

    let text = "Hello from doc2pdf.\n\nSecond paragraph with ünïcödé.\n";
    let form = MultipartForm::new()
        .add_part("file", Part::bytes(text.as_bytes().to_vec()).file_name("hello.txt"));
    let resp = server.post("/convert").multipart(form).await;

    resp.assert_status_ok();
    assert_eq!(
        resp.header("content-disposition"),
        "attachment; filename=\"hello.txt.pdf\""
    );
    assert_pdf(resp.as_bytes(), "hello.txt");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_html_to_pdf() {
    let program = e2e_skip_unless_ready!();
    let scratch = tempfile::tempdir().unwrap();
    let server = e2e_server(program, scratch.path());

    let html = concat!(
        "<html><body><h1>Report</h1>",
        "<table><tr><td>a</td><td>1</td></tr></table>",
        "</body></html>"
    );
    let form = MultipartForm::new()
        .add_part("file", Part::bytes(html.as_bytes().to_vec()).file_name("report.html"));
    let resp = server.post("/convert").multipart(form).await;

    resp.assert_status_ok();
    assert_pdf(resp.as_bytes(), "report.html");
}

#[tokio::test]
async fn test_concurrent_conversions() {
    let program = e2e_skip_unless_ready!();
    let scratch = tempfile::tempdir().unwrap();
    let server = e2e_server(program, scratch.path());

    let first = server.post("/convert").multipart(
        MultipartForm::new()
            .add_part("file", Part::bytes(b"first".to_vec()).file_name("one.txt")),
    );
    let second = server.post("/convert").multipart(
        MultipartForm::new()
            .add_part("file", Part::bytes(b"second".to_vec()).file_name("two.txt")),
    );
    let (a, b) = tokio::join!(
        std::future::IntoFuture::into_future(first),
        std::future::IntoFuture::into_future(second)
    );

    a.assert_status_ok();
    b.assert_status_ok();
    assert_pdf(a.as_bytes(), "one.txt");
    assert_pdf(b.as_bytes(), "two.txt");
}
