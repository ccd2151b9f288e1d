//! Request body shaping.

use pangea_verify::UploadParams;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Remove `null` members from objects at every depth. Array elements are kept
/// in place so positions stay meaningful.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Serialize `request` into the JSON object sent on the wire.
pub fn request_body<R: Serialize + ?Sized>(request: &R) -> Result<Map<String, Value>> {
    match to_stripped_value(request)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Validation(format!(
            "request must serialize to a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Serialize `query` into GET parameters. `()` and `None` mean no parameters.
pub fn query_params<Q: Serialize + ?Sized>(query: &Q) -> Result<Map<String, Value>> {
    match to_stripped_value(query)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::Validation(format!(
            "query must serialize to a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn to_stripped_value<R: Serialize + ?Sized>(request: &R) -> Result<Value> {
    serde_json::to_value(request)
        .map(strip_nulls)
        .map_err(|e| Error::Validation(format!("request does not serialize to JSON: {e}")))
}

/// Whether `body` already declares every presigned POST integrity field.
pub fn has_upload_params(body: &Map<String, Value>) -> bool {
    ["sha256", "crc32c", "size"].iter().all(|k| body.contains_key(*k))
}

/// Fill in `sha256`, `crc32c` and `size` where the caller left them out.
pub fn insert_upload_params(body: &mut Map<String, Value>, params: &UploadParams) {
    body.entry("sha256").or_insert_with(|| Value::from(params.sha256.clone()));
    body.entry("crc32c").or_insert_with(|| Value::from(params.crc32c.clone()));
    body.entry("size").or_insert_with(|| Value::from(params.size));
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
