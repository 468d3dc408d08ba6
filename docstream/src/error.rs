//! Error taxonomy for generation sessions.
//!
//! Every failure a session can hit, from a refused TCP connection to a
//! malformed stream payload, ends up as a [`GenerateError`] with a stable
//! [`ErrorKind`] so callers can react uniformly. [`RawFailure`] is the
//! pre-classification form produced by the transport and stream layers.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result type alias for docstream operations.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Default retry window, in seconds, applied to rate-limit errors that do
/// not carry their own `retryAfter`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Failure raised by the transport or stream layers before classification.
///
/// The classifier in [`crate::classify`] turns one of these into a
/// [`GenerateError`]. Variants preserve whatever structure the source had
/// so classification rules can match on types instead of sniffing strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RawFailure {
    /// The request never produced a usable response.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}")]
    Http {
        /// Response status code.
        status: u16,
        /// `message` field of the error body, when one decoded.
        message: Option<String>,
        /// `retryAfter` field of the error body, when one decoded.
        retry_after: Option<u64>,
        /// `error` code field of the error body, when one decoded.
        code: Option<String>,
    },

    /// An `error` event arrived inside an otherwise healthy stream.
    #[error("stream error event: {message}")]
    Event {
        /// The event's error text.
        message: String,
    },

    /// A `data:` payload was not valid event JSON.
    #[error("malformed stream payload: {detail}")]
    Parse {
        /// Decoder error description.
        detail: String,
        /// The offending line, for diagnostics.
        line: String,
    },
}

impl RawFailure {
    /// Human-oriented text of the failure, used by classification rules
    /// that inspect message content.
    pub(crate) fn text(&self) -> String {
        match self {
            Self::Transport(err) => err.to_string(),
            Self::Http {
                status, message, ..
            } => message
                .clone()
                .unwrap_or_else(|| http_status_message(*status)),
            Self::Event { message } => message.clone(),
            Self::Parse { detail, .. } => detail.clone(),
        }
    }
}

/// The generic message synthesized when a non-2xx response has no usable
/// error body.
pub(crate) fn http_status_message(status: u16) -> String {
    format!("HTTP error! status: {status}")
}

/// Categories of classified generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The request never reached the service.
    Network,
    /// The per-window request budget is exhausted.
    RateLimit,
    /// The service rejected the request as malformed.
    InvalidRequest,
    /// Authentication or authorization failure.
    Authentication,
    /// The service failed internally.
    ServerError,
    /// The service is temporarily unable to answer.
    ServiceUnavailable,
    /// A response or stream payload could not be decoded.
    ParseFailure,
    /// Anything that matched no other category.
    Unknown,
}

impl ErrorKind {
    /// Stable lowercase label, used in logs and display output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::ServerError => "server_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ParseFailure => "parse_failure",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified generation failure.
///
/// `message` is always safe to show to an end user. The raw text the
/// failure arrived with is kept in `original_message` for diagnostics.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GenerateError {
    /// The error category.
    pub kind: ErrorKind,
    /// User-facing description.
    pub message: String,
    /// Seconds to wait before retrying, when the service said so.
    pub retry_after_seconds: Option<u64>,
    /// HTTP status code, when the failure came from a response.
    pub status_code: Option<u16>,
    /// Unmapped service error code, kept when `kind` is [`ErrorKind::Unknown`].
    pub code: Option<String>,
    /// The failure text as originally raised.
    pub original_message: String,
    /// Unix timestamp in milliseconds at classification time.
    pub timestamp_ms: u64,
}

impl GenerateError {
    /// Create an error with the given kind and user-facing message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            original_message: message.clone(),
            message,
            retry_after_seconds: None,
            status_code: None,
            code: None,
            timestamp_ms: now_millis(),
        }
    }

    /// Create a network error with the standard connectivity message.
    #[must_use]
    pub fn network() -> Self {
        Self::new(
            ErrorKind::Network,
            "Network error. Please check your internet connection and try again.",
        )
    }

    /// Create a rate-limit error with a retry window.
    #[must_use]
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::new(
            ErrorKind::RateLimit,
            "Rate limit exceeded. Please wait before trying again.",
        )
        .with_retry_after(retry_after_seconds)
    }

    /// Create an invalid-request error carrying the service's description.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create an authentication error with the standard sign-in message.
    #[must_use]
    pub fn authentication() -> Self {
        Self::new(
            ErrorKind::Authentication,
            "Authentication failed. Please sign in and try again.",
        )
    }

    /// Create a server error with the standard internal-failure message.
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(
            ErrorKind::ServerError,
            "The documentation service hit an internal error. Please try again later.",
        )
    }

    /// Create a server error for an otherwise unmapped HTTP status.
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        Self::new(ErrorKind::ServerError, http_status_message(status)).with_status(status)
    }

    /// Create a service-unavailable error with the standard message.
    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new(
            ErrorKind::ServiceUnavailable,
            "The documentation service is temporarily unavailable. Please try again in a moment.",
        )
    }

    /// Create a parse-failure error with the standard message.
    #[must_use]
    pub fn parse_failure() -> Self {
        Self::new(
            ErrorKind::ParseFailure,
            "Received a malformed response from the documentation service.",
        )
    }

    /// Create an unknown error passing the message through verbatim.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Attach a retry window in seconds.
    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    /// Attach the HTTP status the failure came from.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Attach an unmapped service error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Record the failure text as originally raised.
    #[must_use]
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original_message = original.into();
        self
    }

    /// Whether retrying the same request later can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimit | ErrorKind::Network | ErrorKind::ServiceUnavailable
        )
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for GenerateError {}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        crate::classify::classify(&RawFailure::Transport(err))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}
