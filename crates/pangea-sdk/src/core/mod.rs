//! Pure transformations: no I/O, no clocks except where a caller passes one in.

mod classify;
mod endpoint;
pub mod headers;
mod json;
pub mod multipart;
mod poll;
mod retry;

pub use classify::{Classification, RetryPolicy, classify_error, classify_status};
pub use endpoint::{request_path, resolve_url, service_base_url, with_query};
pub use headers::{HeaderOptions, config_id_header, request_headers, user_agent};
pub use json::{has_upload_params, insert_upload_params, query_params, request_body, strip_nulls};
pub use poll::PollSchedule;
pub use retry::{backoff_delay, capped_delay, jittered, parse_retry_after, parse_retry_after_at, retry_delay};
