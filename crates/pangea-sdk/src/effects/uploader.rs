use std::io::{Read, Seek};

use bytes::Bytes;
use tracing::debug;

use super::context::Context;
use super::http::{FormPart, HttpBody, HttpClient, HttpRequest, Method};
use super::retryer::Retryer;
use crate::core::RetryPolicy;
use crate::core::headers::{OCTET_STREAM, USER_AGENT};
use crate::data::{FileData, TransferMethod};
use crate::error::{Error, Result, TransportError};

/// Name of the file field in a presigned POST form.
const FILE_FIELD: &str = "file";

/// Sends file bytes to presigned storage URLs.
///
/// Uses its own client and never sends the service token: the target is a
/// storage backend, not a Pangea service.
#[derive(Debug, Clone)]
pub struct Uploader<C> {
    client:     C,
    retryer:    Retryer,
    user_agent: String,
}

impl<C: HttpClient> Uploader<C> {
    pub fn new(client: C, retryer: Retryer, user_agent: String) -> Self {
        Self {
            client,
            retryer,
            user_agent,
        }
    }

    /// Upload `file` to `url`.
    ///
    /// `post-url` sends `file.form_fields` in order, then the file under
    /// `file`. `put-url` sends the raw bytes. The stream is left at the
    /// offset it was handed over at.
    pub async fn upload<R: Read + Seek>(
        &self,
        ctx: &Context,
        url: &str,
        method: TransferMethod,
        file: &mut FileData<R>,
    ) -> Result<()> {
        ensure_presigned(method)?;
        let data = file.read_all()?;
        self.upload_bytes(ctx, url, method, &file.name, &file.form_fields, data).await
    }

    pub(crate) async fn upload_bytes(
        &self,
        ctx: &Context,
        url: &str,
        method: TransferMethod,
        name: &str,
        form_fields: &[(String, String)],
        data: Bytes,
    ) -> Result<()> {
        ensure_presigned(method)?;
        let size = data.len();

        let headers = vec![(USER_AGENT.to_string(), self.user_agent.clone())];
        let request = match method {
            TransferMethod::PostUrl => {
                let mut parts: Vec<FormPart> = form_fields
                    .iter()
                    .map(|(k, v)| FormPart::text(k.as_str(), v.as_str()))
                    .collect();
                parts.push(FormPart::file(FILE_FIELD, name, OCTET_STREAM, data));
                HttpRequest::new(Method::Post, url)
                    .headers(headers)
                    .body(HttpBody::Multipart(parts))
            }
            _ => HttpRequest::new(Method::Put, url)
                .headers(headers)
                .body(HttpBody::Bytes {
                    data,
                    content_type: OCTET_STREAM.to_string(),
                }),
        };

        debug!(transfer_method = %method, size, "uploading to presigned URL");
        let response = self.retryer.send(&self.client, ctx, RetryPolicy::Upload, request).await?;
        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body);
            return Err(TransportError::from_status(
                response.status,
                format!("presigned upload rejected with HTTP {}: {}", response.status, message.trim()),
            )
            .into());
        }
        Ok(())
    }
}

fn ensure_presigned(method: TransferMethod) -> Result<()> {
    if method.is_presigned() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "transfer method {method} cannot be used with a presigned URL"
        )))
    }
}
