use std::time::Duration;

use tracing::{debug, warn};

use super::context::Context;
use super::http::{HttpClient, HttpRequest, HttpResponse};
use super::response::is_envelope;
use crate::core::{Classification, RetryPolicy, backoff_delay, classify_error, classify_status, parse_retry_after};
use crate::data::RetryConfig;
use crate::error::{Error, Result, TransportError, TransportErrorKind};

/// Runs one logical HTTP exchange as up to `1 + max_retries` attempts.
///
/// Each attempt is bounded by `http_timeout`. The sleeps between attempts
/// are bounded by `http_timeout` too, in total.
#[derive(Debug, Clone, Copy)]
pub struct Retryer {
    retry:        RetryConfig,
    http_timeout: Duration,
}

impl Retryer {
    pub fn new(retry: RetryConfig, http_timeout: Duration) -> Self { Self { retry, http_timeout } }

    /// Send `request`, retrying per `policy`.
    ///
    /// A retryable response that survives the last attempt is returned as is,
    /// so the caller can still read an envelope from it.
    pub async fn send<C: HttpClient>(
        &self,
        client: &C,
        ctx: &Context,
        policy: RetryPolicy,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let max_retries = self.retry.effective_max_retries();
        let mut slept = Duration::ZERO;
        let mut attempt = 0;

        loop {
            ctx.check()?;
            let outcome = ctx
                .run(tokio::time::timeout(self.http_timeout, client.send(request.clone())))
                .await?
                .unwrap_or_else(|_| {
                    Err(TransportError::new(
                        TransportErrorKind::Timeout,
                        format!("no response within {:?}", self.http_timeout),
                    ))
                });

            let (classification, last) = match outcome {
                Ok(response) => {
                    let retry_after = response.header("retry-after").and_then(parse_retry_after);
                    let api_error_body = !response.is_success() && is_envelope(&response);
                    let classification = classify_status(policy, response.status, retry_after, api_error_body);
                    (classification, Ok(response))
                }
                Err(e) => (classify_error(policy, e.kind), Err(e)),
            };

            let Classification::Retryable { retry_after } = classification else {
                return last.map_err(Error::from);
            };
            if attempt >= max_retries {
                if max_retries > 0 {
                    warn!(url = %request.url, attempts = attempt + 1, "retries exhausted");
                }
                return last.map_err(Error::from);
            }

            let remaining = self.http_timeout.saturating_sub(slept);
            if remaining.is_zero() {
                debug!(url = %request.url, attempt, "retry budget spent");
                return last.map_err(Error::from);
            }
            let delay = retry_after.unwrap_or_else(|| backoff_delay(attempt, &self.retry)).min(remaining);

            match &last {
                Ok(response) => debug!(
                    method = %request.method,
                    url = %request.url,
                    attempt,
                    status = response.status,
                    delay_ms = delay.as_millis() as u64,
                    "retrying"
                ),
                Err(e) => debug!(
                    method = %request.method,
                    url = %request.url,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "retrying"
                ),
            }

            ctx.sleep(delay).await?;
            slept += delay;
            attempt += 1;
        }
    }
}
