use serde_json::{Map, Value};
use url::Url;

use crate::data::Config;
use crate::data::config::SERVICE_NAME_PLACEHOLDER;
use crate::error::{Error, Result};

/// Base URL of `service`, without a trailing slash.
///
/// A base URL template wins over a domain. Domain URLs use `https` unless the
/// config is insecure, and drop the `{service}.` prefix in local mode.
pub fn service_base_url(config: &Config, service: &str) -> String {
    if let Some(template) = config.base_url_template() {
        return template
            .replace(SERVICE_NAME_PLACEHOLDER, service)
            .trim_end_matches('/')
            .to_string();
    }

    let scheme = if config.insecure() { "http" } else { "https" };
    let domain = config.domain().unwrap_or_default().trim_end_matches('/');
    if config.local() {
        format!("{scheme}://{domain}")
    } else {
        format!("{scheme}://{service}.{domain}")
    }
}

/// Fully qualified URL of `path` on `service`.
///
/// # Examples
///
/// ```
/// use pangea_sdk::core::resolve_url;
/// use pangea_sdk::data::config::{Config, with_domain};
///
/// let config = Config::new([with_domain("aws.us.pangea.cloud")]).unwrap();
/// assert_eq!(
///     resolve_url(&config, "redact", "/v1/redact"),
///     "https://redact.aws.us.pangea.cloud/v1/redact"
/// );
/// ```
pub fn resolve_url(config: &Config, service: &str, path: &str) -> String {
    let base = service_base_url(config, service);
    let path = path.trim_start_matches('/');
    if path.is_empty() { base } else { format!("{base}/{path}") }
}

/// Path polled for the result of an accepted request.
pub fn request_path(request_id: &str) -> String { format!("request/{request_id}") }

/// Append `query` to `url`. Arrays become repeated keys; `null`s are skipped.
pub fn with_query(url: &str, query: &Map<String, Value>) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| Error::Validation(format!("invalid URL {url:?}: {e}")))?;
    if query.is_empty() {
        return Ok(parsed.into());
    }
    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in query {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        pairs.append_pair(key, &query_value(item));
                    }
                }
                other => {
                    pairs.append_pair(key, &query_value(other));
                }
            }
        }
    }
    Ok(parsed.into())
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::data::config::{with_base_url_template, with_domain, with_insecure, with_local};

    #[test]
    fn test_domain_url() {
        let config = Config::new([with_domain("aws.us.pangea.cloud")]).unwrap();
        assert_eq!(
            resolve_url(&config, "audit", "v1/log"),
            "https://audit.aws.us.pangea.cloud/v1/log"
        );
    }

    #[test]
    fn test_insecure_domain_url() {
        let config = Config::new([with_insecure(true), with_domain("localhost:8000")]).unwrap();
        assert_eq!(
            resolve_url(&config, "vault", "/v1/get"),
            "http://vault.localhost:8000/v1/get"
        );
    }

    #[test]
    fn test_local_mode_drops_service_prefix() {
        let config = Config::new([
            with_domain("localhost:8000"),
            with_insecure(true),
            with_local(true),
        ])
        .unwrap();
        assert_eq!(resolve_url(&config, "vault", "v1/get"), "http://localhost:8000/v1/get");
    }

    #[test]
    fn test_template_substitution_and_slashes() {
        let config = Config::new([with_base_url_template("https://{SERVICE_NAME}.edge.example.com/")]).unwrap();
        assert_eq!(
            resolve_url(&config, "share", "//v1/put"),
            "https://share.edge.example.com/v1/put"
        );
        assert_eq!(service_base_url(&config, "share"), "https://share.edge.example.com");
    }

    #[test]
    fn test_template_without_placeholder() {
        let config = Config::new([with_base_url_template("http://127.0.0.1:9000/proxy/")]).unwrap();
        assert_eq!(
            resolve_url(&config, "intel", "v2/reputation"),
            "http://127.0.0.1:9000/proxy/v2/reputation"
        );
    }

    #[test]
    fn test_template_ignores_insecure() {
        let config = Config::new([
            with_base_url_template("https://{SERVICE_NAME}.example.com"),
            with_insecure(true),
        ])
        .unwrap();
        assert_eq!(resolve_url(&config, "audit", "v1/search"), "https://audit.example.com/v1/search");
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("prq_123"), "request/prq_123");
    }

    #[test]
    fn test_with_query() {
        let query = json!({ "request_id": "prq 1", "format": "zip", "ids": ["a", "b"], "skip": null, "n": 3 });
        let Value::Object(query) = query else { unreachable!() };

        assert_eq!(
            with_query("https://share.example.com/v1/get_archive", &query).unwrap(),
            "https://share.example.com/v1/get_archive?request_id=prq+1&format=zip&ids=a&ids=b&n=3"
        );
        assert_eq!(
            with_query("https://share.example.com/v1/get", &Map::new()).unwrap(),
            "https://share.example.com/v1/get"
        );
        assert!(with_query("not a url", &Map::new()).is_err());
    }
}
