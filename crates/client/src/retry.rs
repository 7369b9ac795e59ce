//! Rate-limit backoff and base-URL failover policy.
//!
//! The policy is bounded by the number of configured base URLs rather than by
//! a fixed attempt ceiling: with `N` base URLs a connection failure is retried
//! against the next URL, wrapping around from the URL the call started on,
//! until all `N` have been tried once.

use std::time::Duration;

use regex_lite::Regex;

use crate::error::{Error, ErrorKind, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Wait applied when a rate limit carries no usable hint.
    pub rate_limit_wait: Duration,
    /// Hint used for a 429 without a numeric `retry-after` header.
    pub retry_after_fallback: Duration,
    /// Added to a numeric `retry-after` header.
    pub retry_after_margin: Duration,
    /// Detector for rate limits signalled outside of HTTP 429.
    pub detector: RateLimitDetector,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limit_wait: Duration::from_secs(60),
            retry_after_fallback: Duration::from_secs(10),
            retry_after_margin: Duration::from_secs(1),
            detector: RateLimitDetector::default(),
        }
    }
}

impl RetryConfig {
    /// Set the wait used for rate limits without a hint.
    pub fn with_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    /// Set the hint used for a 429 without `retry-after`.
    pub fn with_retry_after_fallback(mut self, wait: Duration) -> Self {
        self.retry_after_fallback = wait;
        self
    }

    /// Replace the rate-limit message detector.
    pub fn with_detector(mut self, detector: RateLimitDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Hint for a 429 response given its raw `retry-after` header.
    pub fn retry_after_hint(&self, header: Option<&str>) -> Duration {
        header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs) + self.retry_after_margin)
            .unwrap_or(self.retry_after_fallback)
    }
}

/// Recognizes rate limiting reported in error text instead of HTTP 429.
///
/// Some services answer throttled calls with a 400/503 whose body mentions a
/// rate limit. The default pattern matches `ratelimit` and `rate limit` in any
/// case.
#[derive(Debug, Clone)]
pub struct RateLimitDetector {
    pattern: Option<Regex>,
}

impl Default for RateLimitDetector {
    fn default() -> Self {
        Self {
            pattern: Regex::new(Self::DEFAULT_PATTERN).ok(),
        }
    }
}

impl RateLimitDetector {
    pub const DEFAULT_PATTERN: &'static str = r"(?i)rate ?limit";

    /// Detector with a custom regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::with_source(
                ErrorKind::Configuration(format!("invalid rate-limit pattern: {}", e)),
                e,
            )
        })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Detector that never matches.
    pub fn disabled() -> Self {
        Self { pattern: None }
    }

    /// Returns true if the text signals a rate limit.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// Returns true if an error signals a rate limit without being a 429.
    pub fn matches_error(&self, err: &Error) -> bool {
        match &err.kind {
            ErrorKind::Http { message, body, .. } => {
                let body = match body {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                self.matches(message) || self.matches(&body)
            }
            ErrorKind::Other(message) => self.matches(message),
            _ => false,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, optionally switch to `base_index`, then try again.
    Retry {
        wait: Duration,
        base_index: Option<usize>,
    },
    /// Surface the error.
    Stop,
}

/// Attempt state for one logical call.
#[derive(Debug, Clone)]
pub struct FailoverPolicy {
    config: RetryConfig,
    base_urls: usize,
    start: usize,
    attempt: usize,
}

impl FailoverPolicy {
    /// Create a policy for an entity with `base_urls` configured URLs.
    pub fn new(config: RetryConfig, base_urls: usize) -> Self {
        Self {
            config,
            base_urls: base_urls.max(1),
            start: 0,
            attempt: 1,
        }
    }

    /// Start from the client's current base URL instead of `baseUrls[0]`.
    pub fn starting_at(mut self, base_index: usize) -> Self {
        self.start = base_index % self.base_urls;
        self
    }

    /// Current attempt number (1-based).
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Wait required before retrying a rate-limited call, if it was one.
    pub fn rate_limit_wait(&self, err: &Error) -> Option<Duration> {
        if err.is_rate_limited() {
            return Some(err.retry_after().unwrap_or(self.config.rate_limit_wait));
        }
        if self.config.detector.matches_error(err) {
            return Some(self.config.rate_limit_wait);
        }
        None
    }

    /// Classify a failure and advance the attempt counter on retry.
    ///
    /// Connection failures and rate limits fail over to the next base URL
    /// until each of the `N` URLs has been tried once. A rate-limited call
    /// against a single base URL gets one retry on that same URL. Everything
    /// else stops.
    pub fn on_failure(&mut self, err: &Error) -> RetryDecision {
        let rate_wait = self.rate_limit_wait(err);
        if rate_wait.is_none() && !err.is_connection_error() {
            return RetryDecision::Stop;
        }

        let limit = if rate_wait.is_some() {
            self.base_urls.max(2)
        } else {
            self.base_urls
        };
        if self.attempt >= limit {
            return RetryDecision::Stop;
        }

        let base_index = (self.attempt < self.base_urls)
            .then(|| (self.start + self.attempt) % self.base_urls);
        self.attempt += 1;

        RetryDecision::Retry {
            wait: rate_wait.unwrap_or(Duration::ZERO),
            base_index,
        }
    }
}
