//! Accepted-result polling: `GET request/{id}` until the result is ready.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::context::Context;
use super::http::{HttpClient, HttpRequest, Method};
use super::response::{Outcome, decode};
use super::transport::Transport;
use crate::core::{HeaderOptions, PollSchedule, RetryPolicy, request_headers, request_path, resolve_url};
use crate::data::PangeaResponse;
use crate::error::{AcceptedError, Error, Result};

impl<C: HttpClient> Transport<C> {
    /// Fetch the result of `request_id` once.
    ///
    /// Fails with `Error::Accepted` while the service is still working on it.
    pub async fn poll_result_by_id<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        request_id: &str,
    ) -> Result<PangeaResponse<T>> {
        self.in_scope(async {
            match self.poll_once(ctx, service, request_id, None).await? {
                Outcome::Done(done) => Ok(done),
                Outcome::Accepted(accepted) => Err(accepted.into()),
            }
        })
        .await
    }

    /// Resume waiting on an accepted request, e.g. after `Error::TimedOut`.
    ///
    /// Polls once right away, then on the regular schedule with a fresh
    /// `poll_result_timeout` budget.
    pub async fn poll_result_by_accepted_error<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        accepted: &AcceptedError,
    ) -> Result<PangeaResponse<T>> {
        self.in_scope(async {
            match self
                .poll_once(ctx, service, accepted.request_id(), accepted.config_id.as_deref())
                .await?
            {
                Outcome::Done(done) => Ok(done),
                Outcome::Accepted(latest) => self.poll_until_done(ctx, service, latest).await,
            }
        })
        .await
    }

    pub(crate) async fn poll_until_done<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        accepted: AcceptedError,
    ) -> Result<PangeaResponse<T>> {
        match self.poll_loop(ctx, service, accepted, |_| false).await? {
            Outcome::Done(done) => Ok(done),
            Outcome::Accepted(accepted) => Err(accepted.into()),
        }
    }

    /// Poll until the accepted state carries a presigned URL.
    pub(crate) async fn wait_for_upload_url(
        &self,
        ctx: &Context,
        service: &str,
        accepted: AcceptedError,
    ) -> Result<AcceptedError> {
        match self
            .poll_loop::<Value>(ctx, service, accepted, |a| a.result.has_presigned_url())
            .await?
        {
            Outcome::Accepted(accepted) => Ok(accepted),
            Outcome::Done(done) => Err(Error::Protocol(format!(
                "request {} completed without handing out an upload URL",
                done.request_id()
            ))),
        }
    }

    /// Poll on the schedule until a result arrives or `ready` accepts the
    /// latest accepted state.
    ///
    /// `poll_result_timeout` bounds the whole loop, polls included. Running
    /// out of it, or losing the connection for good, ends with `TimedOut`
    /// carrying the last state.
    async fn poll_loop<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        accepted: AcceptedError,
        ready: impl Fn(&AcceptedError) -> bool,
    ) -> Result<Outcome<T>> {
        let start = Instant::now();
        let budget = self.config.poll_result_timeout();
        let mut schedule = PollSchedule::new(self.config.poll_initial_delay(), budget);
        let mut latest = accepted;

        loop {
            let Some(delay) = schedule.next_delay(start.elapsed()) else {
                return Err(gave_up(service, schedule.attempts(), latest));
            };
            ctx.sleep(delay).await?;

            let remaining = budget.saturating_sub(start.elapsed());
            let polled = tokio::time::timeout(
                remaining,
                self.poll_once(ctx, service, latest.request_id(), latest.config_id.as_deref()),
            )
            .await;
            let outcome = match polled {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(Error::Transport(e))) if e.is_retryable() => {
                    warn!(service, request_id = latest.request_id(), error = %e, "poll failed");
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(gave_up(service, schedule.attempts(), latest)),
            };

            match outcome {
                Outcome::Done(done) => return Ok(Outcome::Done(done)),
                Outcome::Accepted(next) if ready(&next) => return Ok(Outcome::Accepted(next)),
                Outcome::Accepted(next) => {
                    debug!(
                        service,
                        request_id = next.request_id(),
                        poll = schedule.attempts(),
                        "result not ready"
                    );
                    latest = next;
                }
            }
        }
    }

    async fn poll_once<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        request_id: &str,
        config_id: Option<&str>,
    ) -> Result<Outcome<T>> {
        let url = resolve_url(&self.config, service, &request_path(request_id));
        let headers = request_headers(&self.config, service, HeaderOptions {
            config_id,
            ..Default::default()
        });
        let request = HttpRequest::new(Method::Get, url).headers(headers);
        let response = self
            .retryer
            .send(&self.http, ctx, RetryPolicy::Api { replay_safe: true }, request)
            .await?;
        match decode(response)? {
            Outcome::Accepted(mut accepted) => {
                accepted.config_id = config_id.map(str::to_string);
                Ok(Outcome::Accepted(accepted))
            }
            done => Ok(done),
        }
    }
}

fn gave_up(service: &str, polls: u32, latest: AcceptedError) -> Error {
    warn!(service, request_id = latest.request_id(), polls, "gave up waiting for accepted request");
    Error::TimedOut(Box::new(latest))
}
