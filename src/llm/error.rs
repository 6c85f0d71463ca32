//! Model provider failures and how the loop treats them.
//!
//! Every failure carries an [`LlmErrorKind`]. The state machine only looks at
//! the kind (retry or abort) and at `retry_after`; the message is for people.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Wait requested by the provider via `Retry-After`
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Classify a non-success chat-completions response.
    ///
    /// `detail` is the provider's error message, or the raw body when the
    /// body is not the usual `{"error": {"message": ...}}` shape.
    pub fn from_status(status: u16, detail: &str, retry_after: Option<Duration>) -> Self {
        let kind = LlmErrorKind::from_status(status);
        let message = match kind {
            LlmErrorKind::Auth => format!("Authentication failed ({status}): {detail}"),
            LlmErrorKind::RateLimit => format!("Rate limit exceeded: {detail}"),
            LlmErrorKind::InvalidRequest => format!("Invalid request: {detail}"),
            LlmErrorKind::ServerError => format!("Server error ({status}): {detail}"),
            LlmErrorKind::Network | LlmErrorKind::Unknown => format!("HTTP {status}: {detail}"),
        };
        Self {
            kind,
            message,
            retry_after,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    /// The model call did not finish within the configured deadline.
    /// Treated like a dropped connection, so it is retried.
    pub fn timeout(after: Duration) -> Self {
        Self::network(format!("Request timed out after {}ms", after.as_millis()))
    }

    #[cfg(test)]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    #[cfg(test)]
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    #[cfg(test)]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    #[cfg(test)]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    /// How long the provider asked us to wait, never longer than `ceiling`
    pub fn requested_delay(&self, ceiling: Duration) -> Option<Duration> {
        self.retry_after.map(|delay| delay.min(ceiling))
    }
}

/// Read a `Retry-After` value given in seconds.
///
/// HTTP-date values and anything negative or out of range yield `None`, and
/// the caller falls back to its own backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection failures and timeouts
    Network,
    /// 429
    RateLimit,
    /// 5xx
    ServerError,
    /// 401 or 403; a missing `TOGETHER_API_KEY` ends up here
    Auth,
    /// 400
    InvalidRequest,
    /// Anything else, including empty or undecodable replies
    Unknown,
}

impl LlmErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            400 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether a fresh attempt at the same request might succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
