//! I/O: HTTP, retries, polling, uploads and saving attachments.
//!
//! Everything here takes a [`Context`] and goes through the [`HttpClient`]
//! trait, so tests can script the network with [`MockHttpClient`].

mod attachments;
mod context;
mod http;
mod mock;
mod poller;
mod response;
mod retryer;
mod service;
mod transport;
mod uploader;

pub use attachments::save_all;
pub use context::Context;
pub use http::{FormPart, HttpBody, HttpClient, HttpRequest, HttpResponse, Method};
pub use mock::MockHttpClient;
pub use retryer::Retryer;
pub use service::BaseService;
pub use transport::Transport;
pub use uploader::Uploader;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
