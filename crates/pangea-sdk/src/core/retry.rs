use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::data::RetryConfig;

/// Exponential growth without a cap: `base * 2^retry_count`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pangea_sdk::core::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(1, Duration::from_millis(100)), Duration::from_millis(200));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// `min(initial * 2^retry, cap)`, before jitter.
pub fn capped_delay(retry_count: u32, config: &RetryConfig) -> Duration {
    retry_delay(retry_count, config.initial_backoff).min(config.max_backoff)
}

/// Scale `delay` by `factor`, which callers draw from `[0.5, 1.5)`.
pub fn jittered(delay: Duration, factor: f64) -> Duration { delay.mul_f64(factor.clamp(0.5, 1.5)) }

/// Delay before retry number `retry_count` (0-indexed), with jitter.
pub fn backoff_delay(retry_count: u32, config: &RetryConfig) -> Duration {
    jittered(capped_delay(retry_count, config), 0.5 + fastrand::f64())
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> { parse_retry_after_at(value, Utc::now()) }

pub fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((when - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_basic() {
        let base = Duration::from_millis(100);

        assert_eq!(retry_delay(0, base), Duration::from_millis(100));
        assert_eq!(retry_delay(1, base), Duration::from_millis(200));
        assert_eq!(retry_delay(2, base), Duration::from_millis(400));
        assert_eq!(retry_delay(3, base), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_overflow_protection() {
        let base = Duration::from_secs(u64::MAX / 2);
        let delay = retry_delay(40, base);
        assert!(delay > Duration::from_secs(0));
    }

    #[test]
    fn test_capped_delay() {
        let config = RetryConfig::default()
            .initial_backoff(Duration::from_millis(500))
            .max_backoff(Duration::from_secs(3));

        let delays: Vec<_> = (0..5).map(|n| capped_delay(n, &config)).collect();
        assert_eq!(
            delays,
            [
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(3),
            ]
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(2);
        assert_eq!(jittered(base, 0.5), Duration::from_secs(1));
        assert_eq!(jittered(base, 1.5), Duration::from_secs(3));
        assert_eq!(jittered(base, 9.0), Duration::from_secs(3));

        let config = RetryConfig::default();
        for retry in 0..8 {
            let delay = backoff_delay(retry, &config);
            let nominal = capped_delay(retry, &config);
            assert!(delay >= nominal.mul_f64(0.5));
            assert!(delay <= nominal.mul_f64(1.5));
        }
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = DateTime::parse_from_rfc3339("2015-10-21T07:27:50Z").unwrap().with_timezone(&Utc);
        assert_eq!(
            parse_retry_after_at("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            parse_retry_after_at("Wed, 21 Oct 2015 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
    }
}
