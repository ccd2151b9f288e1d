//! Outcome classification for a single HTTP attempt.

use std::time::Duration;

use crate::error::TransportErrorKind;

/// Which retry rules apply to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Calls to a Pangea service. `replay_safe` is true for GETs and for POSTs
    /// that carry an idempotency key: only those may be retried once the
    /// server could have received them.
    Api { replay_safe: bool },
    /// Transfers to presigned storage URLs: connect failures and 5xx only.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Retryable { retry_after: Option<Duration> },
    Fatal,
}

impl Classification {
    pub fn is_retryable(&self) -> bool { matches!(self, Classification::Retryable { .. }) }
}

/// Classify a received response.
///
/// `api_error_body` is true when the body parses as a Pangea error envelope;
/// such responses are final for API calls unless the server explicitly asked
/// for a retry.
pub fn classify_status(
    policy: RetryPolicy,
    status: u16,
    retry_after: Option<Duration>,
    api_error_body: bool,
) -> Classification {
    if (200..300).contains(&status) {
        return Classification::Success;
    }

    match policy {
        RetryPolicy::Api { replay_safe } => {
            if status == 503 && retry_after.is_some() {
                return Classification::Retryable { retry_after };
            }
            if matches!(status, 408 | 425 | 429) {
                return Classification::Retryable { retry_after };
            }
            if api_error_body {
                return Classification::Fatal;
            }
            if (500..600).contains(&status) && replay_safe {
                return Classification::Retryable { retry_after };
            }
            Classification::Fatal
        }
        RetryPolicy::Upload => {
            if (500..600).contains(&status) {
                Classification::Retryable { retry_after }
            } else {
                Classification::Fatal
            }
        }
    }
}

/// Classify a failed attempt that produced no usable response.
pub fn classify_error(policy: RetryPolicy, kind: TransportErrorKind) -> Classification {
    use TransportErrorKind::*;

    let retryable = match (policy, kind) {
        (_, Connect | Tls | Eof) => true,
        (RetryPolicy::Api { replay_safe }, Timeout | Body) => replay_safe,
        (RetryPolicy::Upload, _) => false,
        (RetryPolicy::Api { .. }, Status | Other) => false,
    };

    if retryable { Classification::Retryable { retry_after: None } } else { Classification::Fatal }
}
