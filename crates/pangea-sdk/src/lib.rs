//! Transport core shared by Pangea service clients.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and wire types
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Typed envelopes**: every response is decoded into [`PangeaResponse<T>`]
//!   or one typed [`Error`]
//! - **Accepted results**: `202 Accepted` is polled in-line on a doubling
//!   schedule, or surfaced as [`Error::Accepted`] for the caller to resume
//! - **Split uploads**: presigned `post-url`/`put-url` transfers, hashed up
//!   front with `pangea-verify`
//! - **Cancellation**: every network call takes a [`Context`]
//!
//! # Example
//!
//! ```no_run
//! use pangea_sdk::data::config::{with_domain, with_token};
//! use pangea_sdk::{BaseService, Config, Context, PangeaResponse, Transport};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Redacted {
//!     redacted_text: Option<String>,
//!     count:         u32,
//! }
//!
//! # async fn run() -> pangea_sdk::Result<()> {
//! let config = Config::new([with_token("pts_..."), with_domain("aws.us.pangea.cloud")])?;
//! let redact = BaseService::new("redact", Transport::new(config)?);
//!
//! let response: PangeaResponse<Redacted> = redact
//!     .post(&Context::background(), "v1/redact", &json!({ "text": "hello 555-1212" }))
//!     .await?;
//! if let Some(result) = response.result() {
//!     println!("{} redactions: {:?}", result.count, result.redacted_text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use data::{
    AcceptedResult, ApiRequest, AttachedFile, BaseRequest, Config, ConfigOption, ErrorField, FileData, PangeaResponse,
    ResponseHeader, ResponseStatus, RetryConfig, TransferMethod,
};
pub use effects::{BaseService, Context, HttpClient, MockHttpClient, Transport, save_all};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{AcceptedError, ApiError, Error, Result, TransportError, TransportErrorKind};
pub use pangea_verify::UploadParams;
