//! Rate limit header parsing.
//!
//! When a server rejects a request with a rate limit status it usually says how
//! long to back off. [`RetryPolicy`](crate::policy::RetryPolicy) consults these
//! hints before falling back to its own delay schedule.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit hints extracted from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// When the rate limit window resets (`X-RateLimit-Reset` or `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,

    /// How long to wait before retrying (`Retry-After`).
    pub retry_after: Option<Duration>,

    /// Requests remaining in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Parses the supported headers. Missing or malformed headers are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::HeaderMap;
    /// use restflow::rate_limit::RateLimitInfo;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "60".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(Duration::from_secs(60)));
    /// assert!(info.is_rate_limited());
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: parse_reset(headers),
            retry_after: parse_retry_after(headers),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// Returns `true` if `Retry-After` is present or no requests remain.
    pub fn is_rate_limited(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }

    /// The recommended wait, capped at `max_wait`.
    ///
    /// `Retry-After` wins over the reset timestamp. Returns `None` without hints or
    /// when the reset time already passed.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        let wait = match (self.retry_after, self.reset_at) {
            (Some(retry_after), _) => retry_after,
            (None, Some(reset_at)) => reset_at.duration_since(SystemTime::now()).ok()?,
            (None, None) => return None,
        };
        Some(wait.min(max_wait))
    }
}

/// Whether and how far a retry policy honors rate limit hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Honor rate limit headers on rejected responses.
    pub enabled: bool,

    /// Upper bound for any wait derived from headers. Defaults to 5 minutes.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_wait: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    /// A configuration that ignores rate limit headers.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Replaces the maximum wait.
    pub fn with_max_wait(self, max_wait: Duration) -> Self {
        Self { max_wait, ..self }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

/// `Retry-After` as delay-seconds or HTTP-date.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = header_str(headers, "retry-after")?;
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    httpdate::parse_http_date(value)
        .ok()?
        .duration_since(SystemTime::now())
        .ok()
}

/// Unix timestamp from `X-RateLimit-Reset`, else from `RateLimit-Reset`.
fn parse_reset(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .into_iter()
        .find_map(|name| header_str(headers, name)?.parse::<u64>().ok())
        .map(|timestamp| UNIX_EPOCH + Duration::from_secs(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let mut headers = HeaderMap::new();
        let date = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(120));
        headers.insert("retry-after", HeaderValue::from_str(&date).unwrap());

        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));
    }

    #[test]
    fn test_reset_falls_back_to_draft_header() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-reset", HeaderValue::from_static("1700000000"));

        assert_eq!(
            parse_reset(&headers),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));

        let info = RateLimitInfo::from_headers(&headers);
        assert_eq!(info.remaining, Some(0));
        assert!(info.is_rate_limited());
        assert_eq!(info.delay(Duration::from_secs(300)), None);
    }

    #[test]
    fn test_delay_capped_by_max_wait() {
        let info = RateLimitInfo {
            retry_after: Some(Duration::from_secs(600)),
            ..Default::default()
        };

        assert_eq!(
            info.delay(Duration::from_secs(300)),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_delay_from_past_reset_is_none() {
        let info = RateLimitInfo {
            reset_at: Some(UNIX_EPOCH),
            ..Default::default()
        };

        assert_eq!(info.delay(Duration::from_secs(300)), None);
    }
}
