//! CLI binary for doc2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, finds the converter, and runs the server.

use anyhow::{Context, Result};
use clap::Parser;
use doc2pdf::{serve, OfficeConverter, ServiceConfig, UuidV7Generator};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"
EXAMPLES:
  # Serve on the default port, converter discovered automatically
  doc2pdf

  # Convert a document once the server is up
  curl -F file=@report.docx -o report.pdf http://localhost:8080/convert

  # Dedicated scratch directory, 50 MiB uploads, at most 2 conversions at once
  doc2pdf --scratch-dir /var/tmp/doc2pdf --max-upload-bytes 52428800 --max-concurrent 2

  # Explicit converter binary with an extra LibreOffice flag
  doc2pdf --converter /opt/libreoffice7.6/program/soffice --converter-arg=--norestore

  # Show which converter would be used
  doc2pdf --locate-only

ENDPOINTS:
  POST /convert   multipart form with a `file` part; responds with the PDF
  GET  /health    responds `ok`

ENVIRONMENT VARIABLES:
  SOFFICE_PATH    Converter executable used by discovery when --converter is not set
  RUST_LOG        Log filter, overrides --verbose / --quiet (e.g. doc2pdf=debug)

CONVERTER DISCOVERY (when --converter is not set):
  1. SOFFICE_PATH
  2. soffice, then libreoffice, on PATH
  3. Standard install locations (/usr/lib/libreoffice, /opt/libreoffice*,
     /Applications/LibreOffice.app, C:\Program Files\LibreOffice, ...)
"#;

/// Convert uploaded office documents to PDF over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "doc2pdf",
    version,
    about = "Convert uploaded office documents to PDF over HTTP",
    long_about = "HTTP service that accepts a document as multipart form data on POST /convert, \
converts it with LibreOffice running headless, and streams the resulting PDF back.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DOC2PDF_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Port to listen on; overrides the port part of --bind.
    #[arg(short, long, env = "DOC2PDF_PORT")]
    port: Option<u16>,

    /// Directory for per-request scratch files.
    #[arg(long, env = "DOC2PDF_SCRATCH_DIR", default_value = ".")]
    scratch_dir: PathBuf,

    /// Maximum request body size in bytes.
    #[arg(
        long,
        env = "DOC2PDF_MAX_UPLOAD_BYTES",
        default_value_t = doc2pdf::DEFAULT_MAX_UPLOAD_BYTES
    )]
    max_upload_bytes: usize,

    /// LibreOffice executable. Discovered automatically when omitted.
    #[arg(long, env = "DOC2PDF_CONVERTER")]
    converter: Option<PathBuf>,

    /// Extra argument passed to the converter before the conversion arguments (repeatable).
    #[arg(long = "converter-arg", value_name = "ARG", allow_hyphen_values = true)]
    converter_args: Vec<String>,

    /// Per-conversion timeout in seconds; 0 disables it.
    #[arg(long, env = "DOC2PDF_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    /// Let all conversions share the default LibreOffice profile.
    #[arg(long)]
    shared_profile: bool,

    /// Maximum number of converter processes running at once.
    /// Defaults to the number of available CPUs.
    #[arg(long, env = "DOC2PDF_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,

    /// Print the converter that would be used, then exit.
    #[arg(long)]
    locate_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Converter discovery ──────────────────────────────────────────────
    let converter = OfficeConverter::from_config(&config)
        .context("Failed to find a LibreOffice executable (set --converter or SOFFICE_PATH)")?;

    if cli.locate_only {
        println!("{}", converter.program().display());
        return Ok(());
    }

    info!(
        "Starting doc2pdf {} with {}",
        env!("CARGO_PKG_VERSION"),
        serde_json::to_string(&config).context("Failed to serialise config")?
    );
    info!("Using converter {}", converter.program().display());

    serve(config, Arc::new(converter), Arc::new(UuidV7Generator))
        .await
        .context("Server failed")?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let timeout = (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs));

    let mut builder = ServiceConfig::builder()
        .bind_addr(cli.bind)
        .scratch_dir(&cli.scratch_dir)
        .max_upload_bytes(cli.max_upload_bytes)
        .converter_args(cli.converter_args.iter().cloned())
        .converter_timeout(timeout)
        .isolate_profile(!cli.shared_profile);

    if let Some(program) = &cli.converter {
        builder = builder.converter_program(program);
    }
    if let Some(port) = cli.port {
        builder = builder.port(port);
    }
    if let Some(n) = cli.max_concurrent {
        builder = builder.max_concurrent_conversions(n);
    }

    builder.build().context("Invalid configuration")
}
