use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Every way a fetch, parse, tabulate or render step can fail.
///
/// Nothing in this crate retries; each variant is terminal for the operation
/// that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input detected before any network activity.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, DNS or TLS failure.
    #[error("network failure: {0}")]
    NetworkFailure(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx HTTP status whose body was not a provider envelope.
    #[error("request failed with HTTP {status}")]
    HttpStatus { status: u16 },

    /// Undecodable JSON or a missing/ill-typed field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Well-formed envelope reporting a non-success status.
    #[error("remote request failed ({status}): {}", messages.join("; "))]
    RemoteRequestFailed {
        status: String,
        messages: Vec<String>,
    },

    #[error("invalid value {value:?} for {series_id} {year} {period}")]
    InvalidValue {
        series_id: String,
        year: i32,
        period: String,
        value: String,
    },

    #[error("cannot write {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoFailure {
            path: path.into(),
            source,
        }
    }
}
