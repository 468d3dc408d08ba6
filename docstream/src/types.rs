//! Request and response types for the documentation-generation API.
//!
//! Everything here mirrors the service's JSON wire format. Field names are
//! camelCase on the wire and snake_case in Rust via serde renames.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of document the service is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    /// Project README with overview, usage and examples.
    Readme,
    /// Inline JSDoc-style comment blocks for the submitted code.
    Jsdoc,
    /// Endpoint-oriented API reference.
    Api,
    /// High-level architecture walkthrough.
    Architecture,
}

impl DocType {
    /// Wire tag for this document type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readme => "README",
            Self::Jsdoc => "JSDOC",
            Self::Api => "API",
            Self::Architecture => "ARCHITECTURE",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload posted to the streaming generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Source code to document.
    pub code: String,
    /// Kind of document to produce.
    pub doc_type: DocType,
    /// Language of `code`, when known. Sent as `null` otherwise so the
    /// service can run its own detection.
    pub language: Option<String>,
    /// Whether `code` is the built-in sample rather than user input.
    pub is_default_code: bool,
    /// Name of the file the code came from.
    pub filename: String,
}

impl GenerationRequest {
    /// Creates a request with no language hint and `is_default_code` unset.
    #[must_use]
    pub fn new(code: impl Into<String>, doc_type: DocType, filename: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            doc_type,
            language: None,
            is_default_code: false,
            filename: filename.into(),
        }
    }

    /// Sets the language hint forwarded to the service.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Marks the code as the built-in sample.
    #[must_use]
    pub fn with_default_code(mut self, is_default: bool) -> Self {
        self.is_default_code = is_default;
        self
    }
}

/// Letter grade attached to a [`QualityScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// 90 and above.
    A,
    /// 80 to 89.
    B,
    /// 70 to 79.
    C,
    /// 60 to 69.
    D,
    /// Below 60.
    F,
}

impl Grade {
    /// Letter form of the grade.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality assessment the service attaches to the final `complete` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Numeric score in `0.0..=100.0`.
    pub score: f64,
    /// Letter grade derived by the service from `score`.
    pub grade: Grade,
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}/100 ({})", self.score, self.grade)
    }
}

/// Final outcome of a generation session.
///
/// `quality_score` and `metadata` are `None` when the stream ended without a
/// `complete` event, for example after a cancellation. The accumulated
/// document is returned either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// The assembled markdown document.
    pub documentation: String,
    /// Quality assessment from the terminal `complete` event.
    pub quality_score: Option<QualityScore>,
    /// Opaque generation metadata from the terminal `complete` event.
    pub metadata: Option<serde_json::Value>,
}

impl GenerationResult {
    /// Whether the session reached a terminal `complete` event.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.quality_score.is_some()
    }
}

/// Rate-limit snapshot taken from `X-RateLimit-*` response headers.
///
/// Present only when both the `Remaining` and `Limit` headers were sent.
/// A missing `Reset` header is recorded as epoch zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    /// Requests left in the current window.
    pub remaining: u32,
    /// Total requests allowed per window.
    pub limit: u32,
    /// Unix timestamp (seconds) at which the window resets.
    pub reset_epoch_seconds: u64,
}

impl RateLimitInfo {
    /// Whether the current window has no requests left.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

impl fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} requests remaining", self.remaining, self.limit)
    }
}

/// Error payload the service returns on non-2xx responses.
///
/// Every field is optional and unknown fields are ignored, so bodies from
/// older or newer server versions still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiErrorBody {
    /// Machine-readable error code, e.g. `rate_limit_error`.
    pub error: Option<String>,
    /// Human-readable description.
    pub message: Option<String>,
    /// Seconds to wait before retrying, sent with 429 responses.
    pub retry_after: Option<u64>,
    /// Whether the account's email address is verified.
    pub email_verified: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerationRequest::new("fn main() {}", DocType::Readme, "main.rs")
            .with_language("rust");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["code"], "fn main() {}");
        assert_eq!(json["docType"], "README");
        assert_eq!(json["language"], "rust");
        assert_eq!(json["isDefaultCode"], false);
        assert_eq!(json["filename"], "main.rs");
    }

    #[test]
    fn test_request_language_defaults_to_null() {
        let request = GenerationRequest::new("x = 1", DocType::Api, "snippet.py");
        let json = serde_json::to_value(&request).unwrap();

        assert!(json["language"].is_null());
    }

    #[test]
    fn test_doc_type_wire_tags() {
        for (doc_type, tag) in [
            (DocType::Readme, "\"README\""),
            (DocType::Jsdoc, "\"JSDOC\""),
            (DocType::Api, "\"API\""),
            (DocType::Architecture, "\"ARCHITECTURE\""),
        ] {
            assert_eq!(serde_json::to_string(&doc_type).unwrap(), tag);
        }
    }

    #[test]
    fn test_quality_score_parses() {
        let score: QualityScore = serde_json::from_str(r#"{"score":72,"grade":"C"}"#).unwrap();

        assert_eq!(score.score, 72.0);
        assert_eq!(score.grade, Grade::C);
        assert_eq!(score.to_string(), "72/100 (C)");
    }

    #[test]
    fn test_rate_limit_display() {
        let info = RateLimitInfo {
            remaining: 3,
            limit: 10,
            reset_epoch_seconds: 1_700_000_000,
        };

        assert_eq!(info.to_string(), "3 of 10 requests remaining");
        assert!(!info.is_exhausted());
    }

    #[test]
    fn test_api_error_body_tolerates_partial_payloads() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"message":"slow down","retryAfter":45}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("slow down"));
        assert_eq!(body.retry_after, Some(45));
        assert_eq!(body.error, None);

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":"authentication_error","extra":true}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("authentication_error"));
        assert_eq!(body.retry_after, None);

        let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body, ApiErrorBody::default());
    }

    #[test]
    fn test_result_completeness() {
        let partial = GenerationResult {
            documentation: "# Half".into(),
            quality_score: None,
            metadata: None,
        };
        assert!(!partial.is_complete());

        let done = GenerationResult {
            documentation: "# Full".into(),
            quality_score: Some(QualityScore {
                score: 91.0,
                grade: Grade::A,
            }),
            metadata: Some(serde_json::json!({"model": "claude"})),
        };
        assert!(done.is_complete());
    }
}
