use std::fmt;
use std::future::Future;

use bytes::Bytes;

use crate::core::headers;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One part of an outgoing `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name:         String,
    pub filename:     Option<String>,
    pub content_type: Option<String>,
    pub data:         Bytes,
}

impl FormPart {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name:         name.into(),
            filename:     None,
            content_type: None,
            data:         Bytes::from(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content_type: &str, data: Bytes) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.to_string()),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HttpBody {
    #[default]
    Empty,
    /// Serialized JSON; the caller sets `Content-Type`.
    Json(Bytes),
    Bytes {
        data:         Bytes,
        content_type: String,
    },
    /// Parts are sent in order. The client picks the boundary.
    Multipart(Vec<FormPart>),
}

/// A fully buffered request. Cheap to clone, so retries resend the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method:  Method,
    pub url:     String,
    pub headers: Vec<(String, String)>,
    pub body:    HttpBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: HttpBody::Empty,
        }
    }

    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: HttpBody) -> Self {
        self.body = body;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> { headers::find(&self.headers, name) }
}

/// A fully buffered response. Header names are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status:  u16,
    pub headers: Vec<(String, String)>,
    pub body:    Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> { headers::find(&self.headers, name) }

    pub fn content_type(&self) -> Option<&str> { self.header("content-type") }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Asynchronous HTTP client abstraction.
///
/// One call is one attempt: implementations do not retry, do not apply
/// timeouts of their own and do not treat any status as an error. Failures
/// that produced no response are mapped to a [`TransportError`] whose kind
/// the retryer classifies.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - [`MockHttpClient`](super::MockHttpClient): scripted responses for tests
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = std::result::Result<HttpResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use crate::error::TransportErrorKind;
    use reqwest::multipart;

    /// Production HTTP client implementation using reqwest.
    ///
    /// Clones share one connection pool.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self, TransportError> {
            let client = reqwest::Client::builder().build().map_err(map_error)?;
            Ok(Self { client })
        }

        /// Wrap an already configured client (proxies, custom roots).
        pub fn from_client(client: reqwest::Client) -> Self { Self { client } }
    }

    impl HttpClient for ReqwestClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
            };

            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            builder = match request.body {
                HttpBody::Empty => builder,
                HttpBody::Json(data) => builder.body(data),
                HttpBody::Bytes { data, content_type } => builder
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data),
                HttpBody::Multipart(parts) => builder.multipart(build_form(parts)?),
            };

            let response = builder.send().await.map_err(map_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = response.bytes().await.map_err(|e| {
                TransportError::new(TransportErrorKind::Body, format!("reading response body: {e}"))
            })?;

            Ok(HttpResponse { status, headers, body })
        }
    }

    fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form, TransportError> {
        let mut form = multipart::Form::new();
        for part in parts {
            let len = part.data.len() as u64;
            let mut field = multipart::Part::stream_with_length(reqwest::Body::from(part.data), len);
            if let Some(filename) = part.filename {
                field = field.file_name(filename);
            }
            if let Some(content_type) = part.content_type {
                field = field.mime_str(&content_type).map_err(map_error)?;
            }
            form = form.part(part.name, field);
        }
        Ok(form)
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        let message = error_chain(&e);
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            let lower = message.to_ascii_lowercase();
            if lower.contains("tls") || lower.contains("certificate") || lower.contains("handshake") {
                TransportErrorKind::Tls
            } else {
                TransportErrorKind::Connect
            }
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else if e.is_request() {
            // Sent, but the connection closed before a response head arrived.
            TransportErrorKind::Eof
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, message)
    }

    fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
        let mut message = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
