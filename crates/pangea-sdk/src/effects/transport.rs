use std::future::Future;
use std::io::{Read, Seek};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use tracing::instrument::WithSubscriber;

use super::context::Context;
use super::http::{FormPart, HttpBody, HttpClient, HttpRequest, Method};
use super::response::{Outcome, decode};
use super::retryer::Retryer;
use super::uploader::Uploader;
use crate::core::headers::{APPLICATION_JSON, OCTET_STREAM};
use crate::core::{
    HeaderOptions, RetryPolicy, config_id_header, has_upload_params, insert_upload_params, query_params,
    request_body, request_headers, resolve_url, user_agent, with_query,
};
use crate::data::{ApiRequest, Config, FileData, PangeaResponse, TransferMethod};
use crate::error::{AcceptedError, Error, Result};

#[cfg(feature = "reqwest")]
use super::http::ReqwestClient;

/// Form part names of an inline `multipart` request.
const REQUEST_PART: &str = "request";
const UPLOAD_PART: &str = "upload";

/// Sends requests to Pangea services and turns envelopes into typed results.
///
/// Safe to share between tasks; all state is the immutable [`Config`] and the
/// clients' connection pools.
#[derive(Debug, Clone)]
pub struct Transport<C> {
    pub(crate) config: Arc<Config>,
    pub(crate) http: C,
    pub(crate) retryer: Retryer,
    uploader: Uploader<C>,
}

#[cfg(feature = "reqwest")]
impl Transport<ReqwestClient> {
    /// A transport with one `reqwest` pool for services and another for
    /// presigned uploads.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_clients(config, ReqwestClient::new()?, ReqwestClient::new()?))
    }
}

impl<C: HttpClient + Clone> Transport<C> {
    /// Use `client` for service calls and uploads alike.
    pub fn with_client(config: Config, client: C) -> Self {
        let upload_client = client.clone();
        Self::with_clients(config, client, upload_client)
    }
}

impl<C: HttpClient> Transport<C> {
    pub fn with_clients(config: Config, client: C, upload_client: C) -> Self {
        let retryer = Retryer::new(*config.retry(), config.http_timeout());
        let uploader = Uploader::new(upload_client, retryer, user_agent(&config));
        Self {
            config: Arc::new(config),
            http: client,
            retryer,
            uploader,
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn uploader(&self) -> &Uploader<C> { &self.uploader }

    /// POST `request` as JSON to `path` on `service`.
    ///
    /// Only connection failures are retried: the server may already have
    /// acted on a request that timed out or failed with 5xx.
    pub async fn post<T, R>(&self, ctx: &Context, service: &str, path: &str, request: &R) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
    {
        self.in_scope(self.post_json(ctx, service, path, request, None)).await
    }

    /// Like [`Transport::post`], with an `X-Idempotency-Key` so that server
    /// errors and timeouts can be retried too.
    pub async fn post_idempotent<T, R>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
    ) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
    {
        let key = uuid::Uuid::new_v4().to_string();
        self.in_scope(self.post_json(ctx, service, path, request, Some(key))).await
    }

    /// GET `path` on `service` with `query` encoded into the URL.
    pub async fn get<T, Q>(&self, ctx: &Context, service: &str, path: &str, query: &Q) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.in_scope(async {
            let query = query_params(query)?;
            let url = with_query(&resolve_url(&self.config, service, path), &query)?;
            debug!(service, path, "GET");

            let request = HttpRequest::new(Method::Get, url)
                .headers(request_headers(&self.config, service, HeaderOptions::default()));
            self.dispatch(ctx, service, RetryPolicy::Api { replay_safe: true }, request).await
        })
        .await
    }

    /// POST `request` and the bytes of `file` together as `multipart/form-data`.
    pub async fn post_multipart<T, R, F>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        self.in_scope(async {
            match request.transfer_method() {
                None | Some(TransferMethod::Multipart) => {}
                Some(other) => {
                    return Err(Error::Validation(format!(
                        "post_multipart needs transfer method multipart, got {other}"
                    )));
                }
            }
            let mut body = request_body(request)?;
            body.entry("transfer_method")
                .or_insert_with(|| Value::from(TransferMethod::Multipart.as_str()));
            let data = file.read_all()?;
            debug!(service, path, size = data.len(), "POST multipart");

            let parts = vec![
                FormPart {
                    name:         REQUEST_PART.to_string(),
                    filename:     None,
                    content_type: Some(APPLICATION_JSON.to_string()),
                    data:         json_bytes(&body)?,
                },
                FormPart::file(UPLOAD_PART, file.name.as_str(), OCTET_STREAM, data),
            ];
            let headers = request_headers(&self.config, service, HeaderOptions {
                config_id: request.config_id(),
                ..Default::default()
            });
            let request = HttpRequest::new(Method::Post, resolve_url(&self.config, service, path))
                .headers(headers)
                .body(HttpBody::Multipart(parts));
            self.dispatch(ctx, service, RetryPolicy::Api { replay_safe: false }, request).await
        })
        .await
    }

    /// Ask `service` for a presigned upload URL.
    ///
    /// The request's transfer method must be `post-url` or `put-url`. For
    /// `post-url`, missing `sha256`, `crc32c` and `size` are computed from
    /// `file` first. When the first answer carries no URL yet, `request/{id}`
    /// is polled until one appears.
    pub async fn request_presigned_url<R, F>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<AcceptedError>
    where
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        self.in_scope(self.presigned_url(ctx, service, path, request, file)).await
    }

    /// Split upload: request a presigned URL, send the bytes there, then wait
    /// for the service to process them.
    ///
    /// With queued retries disabled the caller gets `Error::Accepted` after
    /// the upload and resumes with [`Transport::poll_result_by_accepted_error`].
    pub async fn post_presigned<T, R, F>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        self.in_scope(async {
            let accepted = self.presigned_url(ctx, service, path, request, file).await?;
            let Some((method, url)) = accepted.result.presigned_url() else {
                return Err(Error::Protocol(format!(
                    "request {} has no presigned URL",
                    accepted.request_id()
                )));
            };

            let data = file.read_all()?;
            self.uploader
                .upload_bytes(ctx, url, method, &file.name, &accepted.result.post_form_data, data)
                .await?;
            debug!(service, request_id = accepted.request_id(), "upload complete");

            self.resolve_accepted(ctx, service, accepted).await
        })
        .await
    }

    async fn post_json<T, R>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
        idempotency_key: Option<String>,
    ) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
    {
        let body = request_body(request)?;
        let request = self.json_request(service, path, &body, request.config_id(), idempotency_key.as_deref())?;
        debug!(service, path, idempotent = idempotency_key.is_some(), "POST");
        let policy = RetryPolicy::Api {
            replay_safe: idempotency_key.is_some(),
        };
        self.dispatch(ctx, service, policy, request).await
    }

    async fn presigned_url<R, F>(
        &self,
        ctx: &Context,
        service: &str,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<AcceptedError>
    where
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        let method = request.transfer_method();
        let mut body = request_body(request)?;
        match method {
            Some(TransferMethod::PostUrl) => {
                if !has_upload_params(&body) {
                    let params = pangea_verify::upload_params(&mut file.reader)?;
                    debug!(service, size = params.size, "computed upload parameters");
                    insert_upload_params(&mut body, &params);
                }
            }
            Some(TransferMethod::PutUrl) => {}
            other => {
                return Err(Error::Validation(format!(
                    "presigned uploads need transfer method post-url or put-url, got {}",
                    other.map_or("none", |m| m.as_str())
                )));
            }
        }

        let http_request = self.json_request(service, path, &body, request.config_id(), None)?;
        let config_id = http_request.header(&config_id_header(service)).map(str::to_string);
        debug!(service, path, "requesting presigned URL");
        let response = self
            .retryer
            .send(&self.http, ctx, RetryPolicy::Api { replay_safe: false }, http_request)
            .await?;

        let accepted = match decode::<Value>(response)? {
            Outcome::Accepted(mut accepted) => {
                accepted.config_id = config_id;
                accepted
            }
            Outcome::Done(done) => {
                return Err(Error::Protocol(format!(
                    "request {} completed without handing out an upload URL",
                    done.request_id()
                )));
            }
        };
        if accepted.result.has_presigned_url() {
            return Ok(accepted);
        }
        self.wait_for_upload_url(ctx, service, accepted).await
    }

    fn json_request(
        &self,
        service: &str,
        path: &str,
        body: &Map<String, Value>,
        config_id: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<HttpRequest> {
        let headers = request_headers(&self.config, service, HeaderOptions {
            config_id,
            json_body: true,
            idempotency_key,
        });
        Ok(HttpRequest::new(Method::Post, resolve_url(&self.config, service, path))
            .headers(headers)
            .body(HttpBody::Json(json_bytes(body)?)))
    }

    /// Send, decode, and hand accepted responses to the poller when enabled.
    pub(crate) async fn dispatch<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        policy: RetryPolicy,
        request: HttpRequest,
    ) -> Result<PangeaResponse<T>> {
        let config_id = request.header(&config_id_header(service)).map(str::to_string);
        let response = self.retryer.send(&self.http, ctx, policy, request).await?;
        match decode(response)? {
            Outcome::Done(done) => Ok(done),
            Outcome::Accepted(mut accepted) => {
                accepted.config_id = config_id;
                self.resolve_accepted(ctx, service, accepted).await
            }
        }
    }

    async fn resolve_accepted<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        service: &str,
        accepted: AcceptedError,
    ) -> Result<PangeaResponse<T>> {
        debug!(service, request_id = accepted.request_id(), "request accepted");
        if !self.config.queued_retry_enabled() {
            return Err(accepted.into());
        }
        self.poll_until_done(ctx, service, accepted).await
    }

    /// Run `fut` under the configured log dispatcher, if any.
    pub(crate) async fn in_scope<F: Future>(&self, fut: F) -> F::Output {
        match self.config.logger() {
            Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
            None => fut.await,
        }
    }
}

fn json_bytes(body: &Map<String, Value>) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| Error::Validation(format!("request body does not serialize: {e}")))
}
