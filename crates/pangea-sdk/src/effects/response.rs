//! Turning an [`HttpResponse`] into a typed result, an accepted state or an error.

use serde::de::DeserializeOwned;

use super::http::HttpResponse;
use crate::core::multipart;
use crate::data::{AcceptedResult, AttachedFile, PangeaResponse, RawEnvelope, ResponseStatus};
use crate::error::{AcceptedError, ApiError, Error, Result, TransportError};

/// Name of the part that carries the envelope in a multipart response.
const ENVELOPE_PART: &str = "pangea_json";
const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";
const SNIPPET_LEN: usize = 256;

/// A response that is not an error.
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    Done(PangeaResponse<T>),
    Accepted(AcceptedError),
}

/// Dispatch on the envelope `status`.
pub(crate) fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<Outcome<T>> {
    let http_status = response.status;
    let is_multipart = response.content_type().is_some_and(multipart::is_multipart);

    let (envelope, attached_files) = if is_multipart {
        read_multipart(&response)?
    } else {
        (parse_envelope(&response)?, Vec::new())
    };

    match envelope.header.status {
        ResponseStatus::Success => {
            let result = match &envelope.result {
                None | Some(serde_json::Value::Null) => None,
                Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|e| {
                    Error::Protocol(format!(
                        "request {}: result does not match the expected type: {e}",
                        envelope.header.request_id
                    ))
                })?),
            };
            Ok(Outcome::Done(PangeaResponse {
                header: envelope.header,
                http_status,
                result,
                raw_result: envelope.result,
                attached_files,
            }))
        }
        ResponseStatus::Accepted => Ok(Outcome::Accepted(accepted_error(http_status, &response, envelope)?)),
        _ => {
            let errors = envelope.error_fields();
            Err(ApiError {
                http_status,
                header: envelope.header,
                errors,
                raw_result: envelope.result,
            }
            .into())
        }
    }
}

/// Whether the body is a Pangea envelope, i.e. a deliberate answer from the service.
pub(crate) fn is_envelope(response: &HttpResponse) -> bool {
    serde_json::from_slice::<RawEnvelope>(&response.body).is_ok()
}

fn parse_envelope(response: &HttpResponse) -> Result<RawEnvelope> {
    serde_json::from_slice(&response.body).map_err(|e| {
        if response.is_success() {
            Error::Protocol(format!("malformed response envelope: {e}"))
        } else {
            // A proxy or load balancer answered, not the service.
            TransportError::from_status(
                response.status,
                format!("HTTP {}: {}", response.status, snippet(&response.body)),
            )
            .into()
        }
    })
}

fn accepted_error(http_status: u16, response: &HttpResponse, envelope: RawEnvelope) -> Result<AcceptedError> {
    let result: AcceptedResult = match &envelope.result {
        None | Some(serde_json::Value::Null) => AcceptedResult::default(),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| Error::Protocol(format!("malformed accepted result: {e}")))?,
    };
    if result.post_url.is_some() && result.put_url.is_some() {
        return Err(Error::Protocol(format!(
            "request {}: accepted result carries both post_url and put_url",
            envelope.header.request_id
        )));
    }

    let raw_envelope = serde_json::from_slice(&response.body).unwrap_or(serde_json::Value::Null);
    Ok(AcceptedError {
        http_status,
        header: envelope.header,
        result,
        raw_envelope,
        config_id: None,
    })
}

fn read_multipart(response: &HttpResponse) -> Result<(RawEnvelope, Vec<AttachedFile>)> {
    let content_type = response.content_type().unwrap_or_default();
    let boundary = multipart::boundary(content_type)
        .ok_or_else(|| Error::Protocol(format!("multipart response without boundary: {content_type}")))?;
    let parts = multipart::parse(&response.body, &boundary)
        .map_err(|e| Error::Protocol(format!("malformed multipart response: {e}")))?;

    let json_index = parts
        .iter()
        .position(|p| p.name.as_deref() == Some(ENVELOPE_PART))
        .or_else(|| parts.iter().position(|p| p.is_json()))
        .ok_or_else(|| Error::Protocol("multipart response has no JSON part".into()))?;

    let envelope: RawEnvelope = serde_json::from_slice(&parts[json_index].body)
        .map_err(|e| Error::Protocol(format!("malformed envelope in multipart response: {e}")))?;

    let attached_files = parts
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != json_index)
        .map(|(_, part)| part)
        .enumerate()
        .map(|(index, part)| AttachedFile {
            filename:     part.filename.unwrap_or_else(|| format!("attachment_{index}")),
            content_type: part.content_type.unwrap_or_else(|| DEFAULT_ATTACHMENT_TYPE.to_string()),
            body:         part.body,
        })
        .collect();

    Ok((envelope, attached_files))
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut end = text.len().min(SNIPPET_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim().to_string()
}
