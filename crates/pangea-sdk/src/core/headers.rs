//! Outbound header construction.

use crate::data::Config;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const USER_AGENT: &str = "User-Agent";
pub const IDEMPOTENCY_KEY: &str = "X-Idempotency-Key";

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// `pangea-sdk/<version>/rust`, followed by the configured suffix if any.
pub fn user_agent(config: &Config) -> String {
    let base = concat!("pangea-sdk/", env!("CARGO_PKG_VERSION"), "/rust");
    match config.user_agent().map(str::trim) {
        Some(suffix) if !suffix.is_empty() => format!("{base} {suffix}"),
        _ => base.to_string(),
    }
}

/// `X-Pangea-<Service>-Config-ID`, with the service name capitalized.
pub fn config_id_header(service: &str) -> String {
    let mut chars = service.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("X-Pangea-{capitalized}-Config-ID")
}

/// Per-request header inputs that do not come from [`Config`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOptions<'a> {
    /// Request-level config id; wins over the configured default.
    pub config_id:       Option<&'a str>,
    /// Set `Content-Type: application/json`.
    pub json_body:       bool,
    pub idempotency_key: Option<&'a str>,
}

/// Headers for a call to a Pangea service.
///
/// Configured extra headers come last and replace earlier headers of the same
/// name, except `Authorization`.
pub fn request_headers(config: &Config, service: &str, options: HeaderOptions<'_>) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(5 + config.additional_headers().len());

    if let Some(token) = config.token() {
        headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
    }
    if options.json_body {
        headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
    }
    headers.push((USER_AGENT.to_string(), user_agent(config)));
    if let Some(config_id) = options.config_id.or(config.config_id()) {
        headers.push((config_id_header(service), config_id.to_string()));
    }
    if let Some(key) = options.idempotency_key {
        headers.push((IDEMPOTENCY_KEY.to_string(), key.to_string()));
    }

    for (name, value) in config.additional_headers() {
        if name.eq_ignore_ascii_case(AUTHORIZATION) {
            continue;
        }
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.clone(), value.clone()));
    }
    headers
}

/// Case-insensitive lookup.
pub fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::config::{with_additional_headers, with_config_id, with_domain, with_token, with_user_agent};

    #[test]
    fn test_user_agent() {
        let plain = Config::new([with_domain("example.com")]).unwrap();
        assert_eq!(user_agent(&plain), format!("pangea-sdk/{}/rust", env!("CARGO_PKG_VERSION")));

        let suffixed = Config::new([with_domain("example.com"), with_user_agent("my-app/2.0")]).unwrap();
        assert!(user_agent(&suffixed).ends_with("/rust my-app/2.0"));
    }

    #[test]
    fn test_config_id_header_name() {
        assert_eq!(config_id_header("redact"), "X-Pangea-Redact-Config-ID");
        assert_eq!(config_id_header("file-scan"), "X-Pangea-File-scan-Config-ID");
    }

    #[test]
    fn test_request_headers_with_token() {
        let config = Config::new([with_domain("example.com"), with_token("pts_secret")]).unwrap();
        let headers = request_headers(&config, "redact", HeaderOptions {
            json_body: true,
            ..Default::default()
        });

        assert_eq!(find(&headers, "authorization"), Some("Bearer pts_secret"));
        assert_eq!(find(&headers, "content-type"), Some("application/json"));
        assert!(find(&headers, "user-agent").is_some());
        assert!(find(&headers, "x-idempotency-key").is_none());
    }

    #[test]
    fn test_request_headers_without_token() {
        let config = Config::new([with_domain("example.com")]).unwrap();
        let headers = request_headers(&config, "redact", HeaderOptions::default());

        assert!(find(&headers, "authorization").is_none());
        assert!(find(&headers, "content-type").is_none());
    }

    #[test]
    fn test_request_config_id_wins() {
        let config = Config::new([with_domain("example.com"), with_config_id("pci_default")]).unwrap();

        let headers = request_headers(&config, "audit", HeaderOptions::default());
        assert_eq!(find(&headers, "X-Pangea-Audit-Config-ID"), Some("pci_default"));

        let headers = request_headers(&config, "audit", HeaderOptions {
            config_id: Some("pci_request"),
            ..Default::default()
        });
        assert_eq!(find(&headers, "X-Pangea-Audit-Config-ID"), Some("pci_request"));
    }

    #[test]
    fn test_additional_headers_merge_last() {
        let config = Config::new([
            with_domain("example.com"),
            with_token("pts_secret"),
            with_additional_headers([("User-Agent", "override"), ("X-Trace", "abc")]),
        ])
        .unwrap();

        let headers = request_headers(&config, "redact", HeaderOptions::default());

        assert_eq!(find(&headers, "user-agent"), Some("override"));
        assert_eq!(headers.last().map(|(k, v)| (k.as_str(), v.as_str())), Some(("X-Trace", "abc")));
        assert_eq!(find(&headers, "authorization"), Some("Bearer pts_secret"));
    }
}
