//! Immutable client configuration.
//!
//! Built from a list of options so new knobs never break existing callers:
//!
//! ```
//! use std::time::Duration;
//! use pangea_sdk::data::config::{Config, with_domain, with_poll_result_timeout, with_token};
//!
//! let config = Config::new([
//!     with_token("pts_abc"),
//!     with_domain("aws.us.pangea.cloud"),
//!     with_poll_result_timeout(Duration::from_secs(60)),
//! ])
//! .unwrap();
//!
//! assert_eq!(config.poll_result_timeout(), Duration::from_secs(60));
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

pub const SERVICE_NAME_PLACEHOLDER: &str = "{SERVICE_NAME}";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_RESULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Transport-level retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub enabled:         bool,
    /// Retries after the first attempt; total attempts = 1 + max_retries.
    pub max_retries:     u32,
    /// Delay before the first retry, doubled for each further retry.
    pub initial_backoff: Duration,
    /// Upper bound on a single delay, applied before jitter.
    pub max_backoff:     Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled:         true,
            max_retries:     4,
            initial_backoff: Duration::from_millis(500),
            max_backoff:     Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Retries actually allowed, taking `enabled` into account.
    pub fn effective_max_retries(&self) -> u32 {
        if self.enabled { self.max_retries } else { 0 }
    }
}

/// One configuration setting. Created by the `with_*` functions in this module.
pub struct ConfigOption(Setting);

enum Setting {
    Token(String),
    Domain(String),
    BaseUrlTemplate(String),
    Insecure(bool),
    Local(bool),
    HttpTimeout(Duration),
    Retries(RetryConfig),
    QueuedRetryEnabled(bool),
    PollResultTimeout(Duration),
    PollInitialDelay(Duration),
    AdditionalHeaders(Vec<(String, String)>),
    UserAgent(String),
    ConfigId(String),
    Logger(tracing::Dispatch),
}

/// Bearer token sent as `Authorization: Bearer <token>`.
pub fn with_token(token: impl Into<String>) -> ConfigOption { ConfigOption(Setting::Token(token.into())) }

/// Cloud domain; services resolve to `https://{service}.{domain}`.
pub fn with_domain(domain: impl Into<String>) -> ConfigOption { ConfigOption(Setting::Domain(domain.into())) }

/// Base URL template; `{SERVICE_NAME}` is replaced by the service name.
pub fn with_base_url_template(template: impl Into<String>) -> ConfigOption {
    ConfigOption(Setting::BaseUrlTemplate(template.into()))
}

/// Use `http://` instead of `https://` for domain-based URLs.
pub fn with_insecure(insecure: bool) -> ConfigOption { ConfigOption(Setting::Insecure(insecure)) }

/// Send every service to the bare domain, without the `{service}.` prefix.
pub fn with_local(local: bool) -> ConfigOption { ConfigOption(Setting::Local(local)) }

/// Deadline for a single HTTP attempt.
pub fn with_http_timeout(timeout: Duration) -> ConfigOption { ConfigOption(Setting::HttpTimeout(timeout)) }

pub fn with_retries(retry: RetryConfig) -> ConfigOption { ConfigOption(Setting::Retries(retry)) }

/// Poll 202 responses in-line until they resolve.
pub fn with_queued_retry_enabled(enabled: bool) -> ConfigOption {
    ConfigOption(Setting::QueuedRetryEnabled(enabled))
}

/// Total time to wait for an accepted request to resolve.
pub fn with_poll_result_timeout(timeout: Duration) -> ConfigOption {
    ConfigOption(Setting::PollResultTimeout(timeout))
}

/// First poll delay; later delays double.
pub fn with_poll_initial_delay(delay: Duration) -> ConfigOption {
    ConfigOption(Setting::PollInitialDelay(delay))
}

/// Extra headers merged into every request after the SDK's own.
pub fn with_additional_headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> ConfigOption
where
    K: Into<String>,
    V: Into<String>,
{
    ConfigOption(Setting::AdditionalHeaders(
        headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    ))
}

/// Suffix appended to the SDK's `User-Agent`.
pub fn with_user_agent(user_agent: impl Into<String>) -> ConfigOption {
    ConfigOption(Setting::UserAgent(user_agent.into()))
}

/// Default config id for multi-config services. A request's own config id wins.
pub fn with_config_id(config_id: impl Into<String>) -> ConfigOption {
    ConfigOption(Setting::ConfigId(config_id.into()))
}

/// Route this client's log events to `dispatch` instead of the default subscriber.
pub fn with_logger(dispatch: impl Into<tracing::Dispatch>) -> ConfigOption {
    ConfigOption(Setting::Logger(dispatch.into()))
}

#[derive(Clone)]
pub struct Config {
    token:                Option<String>,
    domain:               Option<String>,
    base_url_template:    Option<String>,
    insecure:             bool,
    local:                bool,
    http_timeout:         Duration,
    retry:                RetryConfig,
    queued_retry_enabled: bool,
    poll_result_timeout:  Duration,
    poll_initial_delay:   Duration,
    additional_headers:   Vec<(String, String)>,
    user_agent:           Option<String>,
    config_id:            Option<String>,
    logger:               Option<tracing::Dispatch>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("base_url_template", &self.base_url_template)
            .field("insecure", &self.insecure)
            .field("local", &self.local)
            .field("http_timeout", &self.http_timeout)
            .field("retry", &self.retry)
            .field("queued_retry_enabled", &self.queued_retry_enabled)
            .field("poll_result_timeout", &self.poll_result_timeout)
            .field("poll_initial_delay", &self.poll_initial_delay)
            .field("additional_headers", &self.additional_headers)
            .field("user_agent", &self.user_agent)
            .field("config_id", &self.config_id)
            .field("logger", &self.logger.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Config {
    /// Apply `options` in order. Fails on the first invalid option, or when no
    /// endpoint (domain or base URL template) was given.
    pub fn new(options: impl IntoIterator<Item = ConfigOption>) -> Result<Self> {
        let mut config = Self::defaults();
        for option in options {
            config.apply(option)?;
        }
        if config.domain.is_none() && config.base_url_template.is_none() {
            return Err(Error::Config(
                "no endpoint configured: set a domain or a base URL template".into(),
            ));
        }
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            token:                None,
            domain:               None,
            base_url_template:    None,
            insecure:             false,
            local:                false,
            http_timeout:         DEFAULT_HTTP_TIMEOUT,
            retry:                RetryConfig::default(),
            queued_retry_enabled: true,
            poll_result_timeout:  DEFAULT_POLL_RESULT_TIMEOUT,
            poll_initial_delay:   DEFAULT_POLL_INITIAL_DELAY,
            additional_headers:   Vec::new(),
            user_agent:           None,
            config_id:            None,
            logger:               None,
        }
    }

    fn apply(&mut self, ConfigOption(setting): ConfigOption) -> Result<()> {
        match setting {
            Setting::Token(token) => {
                if token.trim().is_empty() {
                    return Err(Error::Config("token must not be empty".into()));
                }
                self.token = Some(token);
            }
            Setting::Domain(domain) => {
                validate_domain(&domain)?;
                if self.base_url_template.is_some() {
                    return Err(Error::Config(
                        "domain and base URL template are mutually exclusive".into(),
                    ));
                }
                self.domain = Some(domain);
            }
            Setting::BaseUrlTemplate(template) => {
                if !(template.starts_with("https://") || template.starts_with("http://")) {
                    return Err(Error::Config(format!(
                        "base URL template must start with http:// or https://: {template}"
                    )));
                }
                if self.domain.is_some() {
                    return Err(Error::Config(
                        "domain and base URL template are mutually exclusive".into(),
                    ));
                }
                self.base_url_template = Some(template);
            }
            Setting::Insecure(insecure) => self.insecure = insecure,
            Setting::Local(local) => self.local = local,
            Setting::HttpTimeout(timeout) => {
                if timeout.is_zero() {
                    return Err(Error::Config("HTTP timeout must be positive".into()));
                }
                self.http_timeout = timeout;
            }
            Setting::Retries(retry) => {
                if retry.max_backoff < retry.initial_backoff {
                    return Err(Error::Config(format!(
                        "retry max backoff {:?} is below initial backoff {:?}",
                        retry.max_backoff, retry.initial_backoff
                    )));
                }
                self.retry = retry;
            }
            Setting::QueuedRetryEnabled(enabled) => self.queued_retry_enabled = enabled,
            Setting::PollResultTimeout(timeout) => {
                if timeout.is_zero() {
                    return Err(Error::Config("poll result timeout must be positive".into()));
                }
                self.poll_result_timeout = timeout;
            }
            Setting::PollInitialDelay(delay) => {
                if delay.is_zero() {
                    return Err(Error::Config("poll initial delay must be positive".into()));
                }
                self.poll_initial_delay = delay;
            }
            Setting::AdditionalHeaders(headers) => {
                for (name, value) in &headers {
                    validate_header(name, value)?;
                }
                self.additional_headers.extend(headers);
            }
            Setting::UserAgent(user_agent) => {
                if user_agent.chars().any(|c| c.is_control()) {
                    return Err(Error::Config("user agent must not contain control characters".into()));
                }
                self.user_agent = Some(user_agent);
            }
            Setting::ConfigId(config_id) => {
                if config_id.trim().is_empty() {
                    return Err(Error::Config("config id must not be empty".into()));
                }
                self.config_id = Some(config_id);
            }
            Setting::Logger(dispatch) => self.logger = Some(dispatch),
        }
        Ok(())
    }

    pub fn token(&self) -> Option<&str> { self.token.as_deref() }

    pub fn domain(&self) -> Option<&str> { self.domain.as_deref() }

    pub fn base_url_template(&self) -> Option<&str> { self.base_url_template.as_deref() }

    pub fn insecure(&self) -> bool { self.insecure }

    pub fn local(&self) -> bool { self.local }

    pub fn http_timeout(&self) -> Duration { self.http_timeout }

    pub fn retry(&self) -> &RetryConfig { &self.retry }

    pub fn queued_retry_enabled(&self) -> bool { self.queued_retry_enabled }

    pub fn poll_result_timeout(&self) -> Duration { self.poll_result_timeout }

    pub fn poll_initial_delay(&self) -> Duration { self.poll_initial_delay }

    pub fn additional_headers(&self) -> &[(String, String)] { &self.additional_headers }

    pub fn user_agent(&self) -> Option<&str> { self.user_agent.as_deref() }

    pub fn config_id(&self) -> Option<&str> { self.config_id.as_deref() }

    pub fn logger(&self) -> Option<&tracing::Dispatch> { self.logger.as_ref() }
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.trim().is_empty() {
        return Err(Error::Config("domain must not be empty".into()));
    }
    if domain.contains("://") || domain.contains('/') {
        return Err(Error::Config(format!(
            "domain must be a bare host name without scheme or path: {domain}"
        )));
    }
    Ok(())
}

fn validate_header(name: &str, value: &str) -> Result<()> {
    let valid_name = !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if !valid_name {
        return Err(Error::Config(format!("invalid header name: {name:?}")));
    }
    if name.eq_ignore_ascii_case("authorization") {
        return Err(Error::Config("additional headers cannot override Authorization".into()));
    }
    if value.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::Config(format!("invalid value for header {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new([with_domain("aws.us.pangea.cloud")]).unwrap();

        assert_eq!(config.token(), None);
        assert!(config.queued_retry_enabled());
        assert_eq!(config.poll_result_timeout(), Duration::from_secs(30));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry().max_retries, 4);
        assert!(config.additional_headers().is_empty());
        assert!(!config.insecure());
    }

    #[test]
    fn test_options_apply_in_order() {
        let config = Config::new([
            with_token("pts_1"),
            with_token("pts_2"),
            with_domain("dev.pangea.cloud"),
            with_additional_headers([("X-Trace", "a")]),
            with_additional_headers([("X-Team", "b")]),
            with_queued_retry_enabled(false),
        ])
        .unwrap();

        assert_eq!(config.token(), Some("pts_2"));
        assert_eq!(config.additional_headers().len(), 2);
        assert!(!config.queued_retry_enabled());
    }

    #[test]
    fn test_missing_endpoint() {
        let err = Config::new([with_token("pts_1")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_domain_and_template_conflict() {
        let err = Config::new([
            with_domain("aws.us.pangea.cloud"),
            with_base_url_template("https://{SERVICE_NAME}.example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::new([
            with_base_url_template("https://{SERVICE_NAME}.example.com"),
            with_domain("aws.us.pangea.cloud"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            with_token("  "),
            with_domain("https://aws.us.pangea.cloud"),
            with_domain("aws.us.pangea.cloud/v1"),
            with_base_url_template("ftp://{SERVICE_NAME}.example.com"),
            with_http_timeout(Duration::ZERO),
            with_poll_result_timeout(Duration::ZERO),
            with_retries(
                RetryConfig::default()
                    .initial_backoff(Duration::from_secs(2))
                    .max_backoff(Duration::from_secs(1)),
            ),
            with_additional_headers([("Authorization", "Bearer other")]),
            with_additional_headers([("bad header", "x")]),
            with_config_id(""),
        ];

        for option in cases {
            let err = Config::new([with_domain("aws.us.pangea.cloud"), option]).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::new([with_token("pts_secret"), with_domain("aws.us.pangea.cloud")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("pts_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_retry_disabled() {
        let retry = RetryConfig::disabled();
        assert_eq!(retry.effective_max_retries(), 0);
        assert_eq!(RetryConfig::default().effective_max_retries(), 4);
    }
}
