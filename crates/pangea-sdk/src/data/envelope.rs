use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::attachment::AttachedFile;
use super::transfer::TransferMethod;

/// Wire `status` of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStatus {
    Success,
    Accepted,
    Failed,
    ValidationError,
    PermissionError,
    NotFound,
    Unauthorized,
    InternalError,
    /// Service-defined statuses. Always treated as a failure.
    Other(String),
}

impl ResponseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ResponseStatus::Success => "Success",
            ResponseStatus::Accepted => "Accepted",
            ResponseStatus::Failed => "Failed",
            ResponseStatus::ValidationError => "ValidationError",
            ResponseStatus::PermissionError => "PermissionError",
            ResponseStatus::NotFound => "NotFound",
            ResponseStatus::Unauthorized => "Unauthorized",
            ResponseStatus::InternalError => "InternalError",
            ResponseStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool { *self == ResponseStatus::Success }
}

impl From<String> for ResponseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Success" => ResponseStatus::Success,
            "Accepted" => ResponseStatus::Accepted,
            "Failed" => ResponseStatus::Failed,
            "ValidationError" => ResponseStatus::ValidationError,
            "PermissionError" => ResponseStatus::PermissionError,
            "NotFound" => ResponseStatus::NotFound,
            "Unauthorized" => ResponseStatus::Unauthorized,
            "InternalError" => ResponseStatus::InternalError,
            _ => ResponseStatus::Other(s),
        }
    }
}

impl From<ResponseStatus> for String {
    fn from(status: ResponseStatus) -> Self { status.as_str().to_string() }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Everything in an envelope except `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub request_id:    String,
    #[serde(default, deserialize_with = "lenient_time")]
    pub request_time:  Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub response_time: Option<DateTime<Utc>>,
    pub status:        ResponseStatus,
    #[serde(default)]
    pub summary:       String,
}

/// One entry of the structured `errors` array of a failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorField {
    /// JSON pointer to the offending request field.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub code:   String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path:   Option<String>,
}

/// An envelope as it comes off the wire, `result` still raw.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawEnvelope {
    #[serde(flatten)]
    pub header: ResponseHeader,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<ErrorField>>,
}

impl RawEnvelope {
    /// Structured errors, from the top level or from inside `result`.
    pub fn error_fields(&self) -> Vec<ErrorField> {
        if let Some(errors) = &self.errors {
            return errors.clone();
        }
        self.result
            .as_ref()
            .and_then(|r| r.get("errors"))
            .and_then(|e| serde_json::from_value(e.clone()).ok())
            .unwrap_or_default()
    }
}

/// `result` of an `Accepted` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AcceptedResult {
    #[serde(default)]
    pub ttl_mins:       Option<u64>,
    #[serde(default)]
    pub retry_counter:  Option<u64>,
    #[serde(default)]
    pub location:       Option<String>,
    #[serde(default)]
    pub post_url:       Option<String>,
    /// Kept in document order; storage backends reject reordered forms.
    #[serde(default, deserialize_with = "ordered_form")]
    pub post_form_data: Vec<(String, String)>,
    #[serde(default)]
    pub put_url:        Option<String>,
}

impl AcceptedResult {
    /// The presigned destination, if the service handed one out.
    pub fn presigned_url(&self) -> Option<(TransferMethod, &str)> {
        match (&self.post_url, &self.put_url) {
            (Some(url), _) => Some((TransferMethod::PostUrl, url.as_str())),
            (None, Some(url)) => Some((TransferMethod::PutUrl, url.as_str())),
            (None, None) => None,
        }
    }

    pub fn has_presigned_url(&self) -> bool { self.presigned_url().is_some() }
}

/// A decoded response.
#[derive(Debug, Clone)]
pub struct PangeaResponse<T> {
    pub header:         ResponseHeader,
    pub http_status:    u16,
    /// `None` when the envelope carried no (or a null) `result`.
    pub result:         Option<T>,
    pub raw_result:     Option<serde_json::Value>,
    /// Files that arrived next to the JSON part of a multipart response.
    pub attached_files: Vec<AttachedFile>,
}

impl<T> PangeaResponse<T> {
    pub fn request_id(&self) -> &str { &self.header.request_id }

    pub fn status(&self) -> &ResponseStatus { &self.header.status }

    pub fn summary(&self) -> &str { &self.header.summary }

    pub fn result(&self) -> Option<&T> { self.result.as_ref() }

    pub fn into_result(self) -> Option<T> { self.result }
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc))))
}

fn ordered_form<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FormVisitor;

    impl<'de> Visitor<'de> for FormVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of form field names to values")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> { Ok(Vec::new()) }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> { Ok(Vec::new()) }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_map(FormVisitor)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                fields.push((key, value));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_option(FormVisitor)
}
