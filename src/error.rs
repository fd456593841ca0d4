//! Unified error types for Hopper.
//!
//! [`HopperError`] covers process-level failures (config, directory,
//! I/O, CLI-side HTTP). [`DispatchError`] is the taxonomy of the fan-out
//! engine and maps onto the status code returned to the caller.
//! [`BroadcastError`] describes why a line could not be handed to one
//! observer; it never leaves the hub.

use std::path::PathBuf;

use hyper::StatusCode;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub destination: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  {}: {}: {}",
            self.destination, self.field, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HopperError {
    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(StatusCode),

    #[error("Directory error ({backend}): {source}")]
    Directory {
        backend: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Failures of a single dispatch.
///
/// Only the variants concerning the directory lookup or the default
/// destination ever reach the caller. [`DispatchError::InvalidDestinationUrl`]
/// is produced per destination and ends up on the broadcast stream.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no active destinations available")]
    NoEligibleDestinations,

    #[error("no default destination specified")]
    NoDefaultDestination,

    #[error("default destination URL is empty")]
    EmptyDefaultUrl,

    #[error("invalid destination URL '{url}': {reason}")]
    InvalidDestinationUrl { url: String, reason: String },

    #[error("default destination {url} unreachable: {reason}")]
    DefaultDestinationUnreachable { url: String, reason: String },

    #[error("error getting destinations: {0}")]
    Directory(#[from] HopperError),
}

impl DispatchError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NoEligibleDestinations
            | Self::DefaultDestinationUnreachable { .. }
            | Self::InvalidDestinationUrl { .. } => StatusCode::BAD_GATEWAY,
            Self::NoDefaultDestination | Self::EmptyDefaultUrl | Self::Directory(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("subscriber {0} is gone")]
    SubscriberWriteFailure(u64),

    #[error("subscriber {0} queue is full")]
    QueueFull(u64),
}
