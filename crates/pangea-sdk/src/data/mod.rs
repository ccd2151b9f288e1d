//! Data layer: immutable configuration and wire types.

pub mod config;
mod attachment;
mod envelope;
mod request;
mod transfer;

pub use attachment::AttachedFile;
pub use config::{Config, ConfigOption, RetryConfig};
pub use envelope::{AcceptedResult, ErrorField, PangeaResponse, ResponseHeader, ResponseStatus};
pub(crate) use envelope::RawEnvelope;
pub use request::{ApiRequest, BaseRequest};
pub use transfer::{FileData, TransferMethod};
