//! Error types for pangea-sdk.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::data::{AcceptedResult, ErrorField, ResponseHeader, ResponseStatus};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Api(Box<ApiError>),

    /// The server queued the request. Resume with `poll_result_by_accepted_error`.
    #[error(transparent)]
    Accepted(Box<AcceptedError>),

    /// Polling ran out of time. Carries the last accepted state so the caller can resume.
    #[error("timed out waiting for request {} to complete", .0.request_id())]
    TimedOut(Box<AcceptedError>),

    #[error("operation cancelled")]
    Cancelled,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Server request id, when the error came from an envelope.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Api(e) => Some(&e.header.request_id),
            Error::Accepted(e) | Error::TimedOut(e) => Some(e.request_id()),
            _ => None,
        }
    }

    /// The accepted state carried by `Accepted` and `TimedOut`.
    pub fn accepted(&self) -> Option<&AcceptedError> {
        match self {
            Error::Accepted(e) | Error::TimedOut(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool { matches!(self, Error::Cancelled) }

    pub fn is_timed_out(&self) -> bool { matches!(self, Error::TimedOut(_)) }

    /// Whether repeating the whole call later could succeed.
    ///
    /// True for connection-level failures, throttling and server overload.
    /// `Accepted` is not retryable: poll it instead of resubmitting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_retryable(),
            Error::Api(e) => matches!(e.http_status, 429 | 503),
            _ => false,
        }
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self { Error::Api(Box::new(e)) }
}

impl From<AcceptedError> for Error {
    fn from(e: AcceptedError) -> Self { Error::Accepted(Box::new(e)) }
}

impl From<pangea_verify::VerificationError> for Error {
    fn from(e: pangea_verify::VerificationError) -> Self {
        match e {
            pangea_verify::VerificationError::Io(io) => Error::Io(io),
            other => Error::Io(io::Error::other(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS, refused or reset before any response byte.
    Connect,
    Tls,
    /// The per-attempt deadline fired.
    Timeout,
    /// The connection closed before a response arrived.
    Eof,
    /// The connection dropped while the response body was being read.
    Body,
    /// The peer answered with an HTTP status the caller cannot use.
    Status,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Tls => "TLS",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Eof => "premature EOF",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Status => "status",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind:    TransportErrorKind,
    pub message: String,
    /// HTTP status for `Status` errors.
    pub status:  Option<u16>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind:    TransportErrorKind::Status,
            message: message.into(),
            status:  Some(status),
        }
    }

    /// Connection-level failures, throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            TransportErrorKind::Connect
            | TransportErrorKind::Tls
            | TransportErrorKind::Timeout
            | TransportErrorKind::Eof
            | TransportErrorKind::Body => true,
            TransportErrorKind::Status => self.status.is_some_and(|s| s == 429 || s >= 500),
            TransportErrorKind::Other => false,
        }
    }
}

/// The server answered with a non-success envelope.
#[derive(Debug, Clone, Error)]
#[error("{} (HTTP {}, request {}): {}", .header.status, .http_status, .header.request_id, .header.summary)]
pub struct ApiError {
    pub http_status: u16,
    pub header:      ResponseHeader,
    pub errors:      Vec<ErrorField>,
    pub raw_result:  Option<serde_json::Value>,
}

impl ApiError {
    pub fn request_id(&self) -> &str { &self.header.request_id }

    pub fn status(&self) -> &ResponseStatus { &self.header.status }

    pub fn summary(&self) -> &str { &self.header.summary }
}

/// The server accepted the request and will produce the result later.
#[derive(Debug, Clone, Error)]
#[error("request {} accepted, result pending", .header.request_id)]
pub struct AcceptedError {
    pub http_status:  u16,
    pub header:       ResponseHeader,
    pub result:       AcceptedResult,
    /// The complete envelope as received.
    pub raw_envelope: serde_json::Value,
    /// Config id the originating request was sent with; polls send it too.
    pub config_id:    Option<String>,
}

impl AcceptedError {
    pub fn request_id(&self) -> &str { &self.header.request_id }

    pub fn summary(&self) -> &str { &self.header.summary }
}
