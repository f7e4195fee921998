//! The external converter.
//!
//! [`Converter`] is the seam between the request pipeline and whatever
//! actually produces the PDF. Production uses [`OfficeConverter`], which runs
//! LibreOffice headless; tests substitute stubs that copy bytes or fail on
//! purpose.
//!
//! ## Process handling
//!
//! ```text
//! soffice [extra args] [-env:UserInstallation=…] --headless
//!         --convert-to pdf --outdir <out_dir> <input>
//!    │
//!    ├─ stdout ──▶ tracing INFO  (line by line)
//!    ├─ stderr ──▶ tracing WARN  (line by line)
//!    └─ exit   ──▶ Ok(()) | Exited{code} | Killed | TimedOut
//! ```
//!
//! The child is spawned with `kill_on_drop`, so when the request future is
//! dropped (client went away, server shutting down) the process dies with it
//! instead of running on unobserved.

use crate::config::ServiceConfig;
use crate::error::ConversionError;
use async_trait::async_trait;
use office_locate::LocateError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Turns the document at `input` into `<out_dir>/<input stem>.pdf`.
///
/// Implementations report only how the attempt ended; whether the output
/// file really appeared is checked by the caller.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<(), ConversionError>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "converter"
    }
}

/// LibreOffice (`soffice`) run as a one-shot headless subprocess.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: PathBuf,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
    isolate_profile: bool,
}

impl OfficeConverter {
    /// A converter running `program` with no timeout and a private profile per call.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: None,
            isolate_profile: true,
        }
    }

    /// Build from the converter-related settings of `config`.
    ///
    /// Uses `config.converter_program` when set, otherwise locates a
    /// LibreOffice install with [`office_locate::locate_office`].
    pub fn from_config(config: &ServiceConfig) -> Result<Self, LocateError> {
        let program = match &config.converter_program {
            Some(program) => program.clone(),
            None => office_locate::locate_office()?,
        };
        Ok(Self::new(program)
            .extra_args(config.converter_args.clone())
            .timeout(config.converter_timeout)
            .isolate_profile(config.isolate_profile))
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn isolate_profile(mut self, v: bool) -> Self {
        self.isolate_profile = v;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, input: &Path, out_dir: &Path, profile: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args);
        if let Some(profile) = profile {
            cmd.arg(format!("-env:UserInstallation={}", file_url(profile)));
        }
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Converter for OfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<(), ConversionError> {
        let start = Instant::now();

        // Removed on drop, after the process has exited or been killed.
        let profile = if self.isolate_profile {
            Some(
                tempfile::Builder::new()
                    .prefix("doc2pdf-profile-")
                    .tempdir()?,
            )
        } else {
            None
        };

        let mut cmd = self.command(input, out_dir, profile.as_ref().map(|d| d.path()));
        debug!("Running {:?}", cmd.as_std());

        let mut child = cmd.spawn().map_err(|source| ConversionError::Launch {
            program: self.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let name = self.name();

        let run = async {
            let (status, (), ()) = tokio::join!(
                child.wait(),
                forward_lines(stdout, name, Pipe::Stdout),
                forward_lines(stderr, name, Pipe::Stderr),
            );
            status
        };

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        "{}: no exit after {}ms, killing",
                        name,
                        limit.as_millis()
                    );
                    if let Err(e) = child.kill().await {
                        warn!("{}: kill failed: {}", name, e);
                    }
                    return Err(ConversionError::TimedOut {
                        ms: limit.as_millis() as u64,
                    });
                }
            },
            None => run.await?,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        check_status(status)?;
        info!("{}: {} converted in {}ms", name, input.display(), elapsed_ms);
        Ok(())
    }

    fn name(&self) -> &str {
        "soffice"
    }
}

fn check_status(status: ExitStatus) -> Result<(), ConversionError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ConversionError::Exited { code }),
        None => Err(ConversionError::Killed),
    }
}

#[derive(Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Copy a child pipe into the log until EOF.
///
/// Lines are decoded lossily; the converter's output encoding is not ours
/// to trust and the pipe must keep draining regardless.
async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, name: &str, pipe: Pipe) {
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                match pipe {
                    Pipe::Stdout => info!("{}: {}", name, line),
                    Pipe::Stderr => warn!("{}: {}", name, line),
                }
            }
            Err(e) => {
                debug!("{}: stopped reading output: {}", name, e);
                break;
            }
        }
    }
}

/// `file://` URL for a local directory, as LibreOffice expects for
/// `-env:UserInstallation`.
fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/").replace(' ', "%20");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}
