//! Configuration for the conversion service.
//!
//! Every knob lives in one [`ServiceConfig`], built once at startup via
//! [`ServiceConfigBuilder`] and handed to the router. Nothing reads the
//! environment after that point; the binary maps CLI flags and env vars onto
//! the builder.

use crate::error::ConfigError;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default multipart body cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 << 20;

/// Default converter timeout.
pub const DEFAULT_CONVERTER_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the HTTP conversion service.
///
/// # Example
/// ```rust
/// use doc2pdf::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(9000)
///     .scratch_dir("/var/tmp/doc2pdf")
///     .max_upload_bytes(20 << 20)
///     .build()
///     .unwrap();
/// assert_eq!(config.bind_addr.port(), 9000);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Address the listener binds to. Default: `0.0.0.0:8080`.
    pub bind_addr: SocketAddr,

    /// Directory for per-request scratch files. Default: `.` (working directory).
    ///
    /// Shared by all requests; filenames are partitioned by a per-request id.
    pub scratch_dir: PathBuf,

    /// Maximum request body size in bytes. Default: 10 MiB.
    ///
    /// Bodies over the cap are rejected with 400 before anything is written.
    pub max_upload_bytes: usize,

    /// Converter executable. `None` means "discover at startup".
    pub converter_program: Option<PathBuf>,

    /// Extra arguments placed before the standard conversion arguments.
    pub converter_args: Vec<String>,

    /// Per-conversion time limit. `None` disables it. Default: 120 s.
    #[serde(with = "opt_secs")]
    pub converter_timeout: Option<Duration>,

    /// Give each conversion its own throw-away LibreOffice profile. Default: true.
    ///
    /// LibreOffice locks its user profile; two conversions sharing one profile
    /// either block each other or fail outright.
    pub isolate_profile: bool,

    /// Upper bound on simultaneous converter processes. Default: available parallelism.
    pub max_concurrent_conversions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            scratch_dir: PathBuf::from("."),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            converter_program: None,
            converter_args: Vec::new(),
            converter_timeout: Some(DEFAULT_CONVERTER_TIMEOUT),
            isolate_profile: true,
            max_concurrent_conversions: default_concurrency(),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Keep the bind IP, change only the port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_addr.set_port(port);
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn converter_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.converter_program = Some(program.into());
        self
    }

    pub fn converter_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.converter_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn converter_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.converter_timeout = timeout;
        self
    }

    pub fn isolate_profile(mut self, v: bool) -> Self {
        self.config.isolate_profile = v;
        self
    }

    pub fn max_concurrent_conversions(mut self, n: usize) -> Self {
        self.config.max_concurrent_conversions = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        if c.max_concurrent_conversions == 0 {
            return Err(ConfigError::Invalid(
                "max concurrent conversions must be ≥ 1".into(),
            ));
        }
        if c.converter_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "converter timeout must be > 0 (use None to disable)".into(),
            ));
        }
        if c.scratch_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("scratch directory must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// `Option<Duration>` as whole seconds in the startup log.
mod opt_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }
}
