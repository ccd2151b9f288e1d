use std::collections::HashSet;
use std::io::{Read, Seek};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::context::Context;
use super::http::HttpClient;
use super::transport::Transport;
use crate::data::{ApiRequest, FileData, PangeaResponse, TransferMethod};
use crate::error::{AcceptedError, Error, Result};

/// The piece every service client embeds: a service name and a transport.
///
/// Service clients call these wrappers with their own paths and types and
/// never build HTTP requests themselves.
#[derive(Debug, Clone)]
pub struct BaseService<C> {
    name:             String,
    transport:        Transport<C>,
    idempotent_paths: HashSet<String>,
}

impl<C: HttpClient> BaseService<C> {
    pub fn new(name: impl Into<String>, transport: Transport<C>) -> Self {
        Self {
            name: name.into(),
            transport,
            idempotent_paths: HashSet::new(),
        }
    }

    /// POST paths the service deduplicates by `X-Idempotency-Key`. Requests to
    /// them are retried on server errors and timeouts.
    #[must_use]
    pub fn with_idempotent_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            let path: String = path.into();
            self.idempotent_paths.insert(normalize(&path).to_string());
        }
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn transport(&self) -> &Transport<C> { &self.transport }

    pub fn is_idempotent(&self, path: &str) -> bool { self.idempotent_paths.contains(normalize(path)) }

    pub async fn post<T, R>(&self, ctx: &Context, path: &str, request: &R) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
    {
        if self.is_idempotent(path) {
            self.transport.post_idempotent(ctx, &self.name, path, request).await
        } else {
            self.transport.post(ctx, &self.name, path, request).await
        }
    }

    pub async fn get<T, Q>(&self, ctx: &Context, path: &str, query: &Q) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.transport.get(ctx, &self.name, path, query).await
    }

    /// POST with a file, routed by the request's transfer method: inline
    /// `multipart` (the default) or a presigned `post-url`/`put-url` upload.
    pub async fn post_with_file<T, R, F>(
        &self,
        ctx: &Context,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<PangeaResponse<T>>
    where
        T: DeserializeOwned,
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        match request.transfer_method() {
            None | Some(TransferMethod::Multipart) => {
                self.transport.post_multipart(ctx, &self.name, path, request, file).await
            }
            Some(TransferMethod::PostUrl | TransferMethod::PutUrl) => {
                self.transport.post_presigned(ctx, &self.name, path, request, file).await
            }
            Some(other) => Err(Error::Validation(format!(
                "transfer method {other} does not upload a file from the caller"
            ))),
        }
    }

    /// See [`Transport::request_presigned_url`].
    pub async fn request_upload_url<R, F>(
        &self,
        ctx: &Context,
        path: &str,
        request: &R,
        file: &mut FileData<F>,
    ) -> Result<AcceptedError>
    where
        R: ApiRequest + ?Sized,
        F: Read + Seek + Send,
    {
        self.transport.request_presigned_url(ctx, &self.name, path, request, file).await
    }

    pub async fn poll_result_by_id<T: DeserializeOwned>(&self, ctx: &Context, request_id: &str) -> Result<PangeaResponse<T>> {
        self.transport.poll_result_by_id(ctx, &self.name, request_id).await
    }

    pub async fn poll_result_by_accepted_error<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        accepted: &AcceptedError,
    ) -> Result<PangeaResponse<T>> {
        self.transport.poll_result_by_accepted_error(ctx, &self.name, accepted).await
    }
}

fn normalize(path: &str) -> &str { path.trim_matches('/') }
