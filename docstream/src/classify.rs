//! Failure classification.
//!
//! Turns a [`RawFailure`] into a [`GenerateError`] by walking a fixed list
//! of rules in priority order. The first rule that recognizes the failure
//! wins; anything unrecognized falls through to [`ErrorKind::Unknown`].
//! Each rule matches on the typed failure first and only inspects message
//! text when no structure is available.

use tracing::debug;

use crate::error::{DEFAULT_RETRY_AFTER_SECS, ErrorKind, GenerateError, RawFailure};
use crate::types::ApiErrorBody;

/// Substring that marks an upstream usage-limit notice, matched
/// case-insensitively against structured error messages.
const USAGE_LIMIT_MARKER: &str = "usage limit reached";

/// Message browsers and proxies emit for a fetch that died without detail.
const GENERIC_FETCH_FAILURE: &str = "Failed to fetch";

type Rule = fn(&RawFailure) -> Option<GenerateError>;

/// Classification rules in priority order. First match wins.
const RULES: &[(&str, Rule)] = &[
    ("structured_api_error", structured_api_error),
    ("rate_limited", rate_limited),
    ("network_failure", network_failure),
    ("http_status", http_status),
    ("parse_failure", parse_failure),
];

/// Classify a raw failure into a [`GenerateError`].
#[must_use]
pub fn classify(raw: &RawFailure) -> GenerateError {
    for (name, rule) in RULES {
        if let Some(error) = rule(raw) {
            debug!(
                rule = name,
                kind = %error.kind,
                status = ?error.status_code,
                retry_after = ?error.retry_after_seconds,
                "failure classified"
            );
            return error;
        }
    }
    let error = fallback(raw);
    debug!(rule = "fallback", kind = %error.kind, "failure classified");
    error
}

/// Rule 1: a structured API error, either a decoded non-2xx body or an
/// `error` event whose message is itself an error-body JSON object.
fn structured_api_error(raw: &RawFailure) -> Option<GenerateError> {
    let (code, message, retry_after, status) = match raw {
        RawFailure::Http {
            status,
            message,
            retry_after,
            code,
        } => (code.clone(), message.clone(), *retry_after, Some(*status)),
        RawFailure::Event { message } => {
            let body: ApiErrorBody = serde_json::from_str(message.trim()).ok()?;
            if body == ApiErrorBody::default() {
                return None;
            }
            (body.error, body.message, body.retry_after, None)
        }
        RawFailure::Transport(_) | RawFailure::Parse { .. } => return None,
    };

    // Upstream usage-limit notices are rate limits no matter what code they
    // ship with. The notice already names its own reset window, so no retry
    // interval is invented here.
    if let Some(text) = &message
        && text.to_ascii_lowercase().contains(USAGE_LIMIT_MARKER)
    {
        let mut error = GenerateError::new(
            ErrorKind::RateLimit,
            "Claude usage limit reached. Generation is paused until your limit resets.",
        );
        error.retry_after_seconds = retry_after;
        error.status_code = status;
        return Some(error.with_original(raw.text()));
    }

    let code = code?;
    let mut error = match code.as_str() {
        "invalid_request_error" => GenerateError::invalid_request(
            message
                .clone()
                .unwrap_or_else(|| "The request was rejected as invalid.".to_string()),
        ),
        "authentication_error" => GenerateError::authentication(),
        "rate_limit_error" => {
            GenerateError::rate_limited(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS))
        }
        _ => GenerateError::unknown(message.clone().unwrap_or_else(|| code.clone()))
            .with_code(code.clone()),
    };
    if let Some(status) = status {
        error = error.with_status(status);
    }
    Some(error.with_original(raw.text()))
}

/// Rule 2: HTTP 429, either typed or named in the failure text.
fn rate_limited(raw: &RawFailure) -> Option<GenerateError> {
    let retry_after = match raw {
        RawFailure::Http {
            status: 429,
            retry_after,
            ..
        } => retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        _ if raw.text().contains("429") => DEFAULT_RETRY_AFTER_SECS,
        _ => return None,
    };
    Some(
        GenerateError::rate_limited(retry_after)
            .with_status(429)
            .with_original(raw.text()),
    )
}

/// Rule 3: the request never produced a response at all. The user-facing
/// message stays free of transport internals; the raw text is preserved
/// in `original_message`.
fn network_failure(raw: &RawFailure) -> Option<GenerateError> {
    match raw {
        RawFailure::Transport(err) if err.status().is_none() => {
            Some(GenerateError::network().with_original(err.to_string()))
        }
        _ => None,
    }
}

/// Rule 4: map an HTTP status, typed or embedded in the failure text, onto
/// the taxonomy.
fn http_status(raw: &RawFailure) -> Option<GenerateError> {
    let (status, server_message) = match raw {
        RawFailure::Http {
            status, message, ..
        } => (*status, message.clone()),
        RawFailure::Event { message } => (embedded_status(message)?, None),
        RawFailure::Transport(err) => (err.status()?.as_u16(), None),
        RawFailure::Parse { .. } => return None,
    };

    let error = match status {
        500 => GenerateError::server_error().with_status(500),
        503 => GenerateError::service_unavailable().with_status(503),
        400 => GenerateError::invalid_request(
            server_message.unwrap_or_else(|| "The request was rejected as invalid.".to_string()),
        )
        .with_status(400),
        401 | 403 => GenerateError::authentication().with_status(status),
        _ => GenerateError::http_status(status),
    };
    Some(error.with_original(raw.text()))
}

/// Rule 5: the payload could not be decoded, either typed or recognizable
/// from decoder phrasing in the failure text.
fn parse_failure(raw: &RawFailure) -> Option<GenerateError> {
    match raw {
        RawFailure::Parse { detail, line } => {
            Some(GenerateError::parse_failure().with_original(format!("{detail}: {line}")))
        }
        RawFailure::Event { message } if looks_like_parse_failure(message) => {
            Some(GenerateError::parse_failure().with_original(message.clone()))
        }
        _ => None,
    }
}

/// Rule 6: nothing matched. Pass the text through verbatim unless it is the
/// contentless generic fetch failure.
fn fallback(raw: &RawFailure) -> GenerateError {
    let text = raw.text();
    let message = if text.trim().is_empty() || text == GENERIC_FETCH_FAILURE {
        "An unexpected error occurred. Please try again.".to_string()
    } else {
        text.clone()
    };
    GenerateError::unknown(message).with_original(text)
}

/// Finds a standalone three-digit HTTP error status in free text.
fn embedded_status(text: &str) -> Option<u16> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 3
                && let Ok(value) = text[start..i].parse::<u16>()
                && (400..=599).contains(&value)
            {
                return Some(value);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn looks_like_parse_failure(text: &str) -> bool {
    ["Unexpected token", "JSON", "expected value", "invalid type"]
        .iter()
        .any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: Option<&str>, retry_after: Option<u64>) -> RawFailure {
        RawFailure::Http {
            status,
            message: message.map(str::to_string),
            retry_after,
            code: None,
        }
    }

    fn event(message: &str) -> RawFailure {
        RawFailure::Event {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_structured_code_beats_status_mapping() {
        let raw = RawFailure::Http {
            status: 500,
            message: Some("slow down".to_string()),
            retry_after: Some(30),
            code: Some("rate_limit_error".to_string()),
        };
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert_eq!(error.retry_after_seconds, Some(30));
        assert_eq!(error.status_code, Some(500));
    }

    #[test]
    fn test_structured_invalid_request_keeps_service_message() {
        let raw = RawFailure::Http {
            status: 400,
            message: Some("docType must be one of README, JSDOC, API, ARCHITECTURE".to_string()),
            retry_after: None,
            code: Some("invalid_request_error".to_string()),
        };
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert!(error.message.contains("docType"));
    }

    #[test]
    fn test_structured_authentication_uses_canned_message() {
        let raw = event(r#"{"error":"authentication_error","message":"x-api-key rejected"}"#);
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::Authentication);
        assert!(error.message.contains("sign in"));
        assert!(error.original_message.contains("x-api-key rejected"));
    }

    #[test]
    fn test_unmapped_code_becomes_unknown_with_label() {
        let raw = RawFailure::Http {
            status: 422,
            message: Some("Overloaded".to_string()),
            retry_after: None,
            code: Some("overloaded_error".to_string()),
        };
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.code.as_deref(), Some("overloaded_error"));
        assert_eq!(error.message, "Overloaded");
        assert_eq!(error.to_string(), "Overloaded (code: overloaded_error)");
    }

    #[test]
    fn test_usage_limit_notice_is_rate_limit_without_invented_retry() {
        let raw = http(429, Some("Claude AI usage limit reached|1735689600"), None);
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert!(error.message.contains("Claude"));
        assert_eq!(error.retry_after_seconds, None);
        assert!(error.original_message.contains("usage limit reached"));
    }

    #[test]
    fn test_429_uses_body_retry_after() {
        let error = classify(&http(429, None, Some(45)));

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert_eq!(error.retry_after_seconds, Some(45));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_429_defaults_to_sixty_seconds() {
        let error = classify(&http(429, None, None));

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert_eq!(error.retry_after_seconds, Some(60));
        assert_eq!(error.status_code, Some(429));
    }

    #[test]
    fn test_429_in_free_text() {
        let error = classify(&event("Request failed with status 429"));

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert_eq!(error.retry_after_seconds, Some(60));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_network() {
        // Nothing listens on this port, so send() fails before any response.
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/generate-stream")
            .send()
            .await
            .unwrap_err();
        let error = classify(&RawFailure::Transport(err));

        assert_eq!(error.kind, ErrorKind::Network);
        assert!(error.message.contains("internet connection"));
        assert_eq!(error.retry_after_seconds, None);
        assert!(!error.original_message.contains("internet connection"));
    }

    #[test]
    fn test_status_mapping_for_server_errors() {
        let error = classify(&http(500, Some("boom"), None));
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert!(error.message.contains("internal error"));
        assert_eq!(error.original_message, "boom");

        let error = classify(&http(503, None, None));
        assert_eq!(error.kind, ErrorKind::ServiceUnavailable);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_status_mapping_preserves_message_for_400() {
        let error = classify(&http(400, Some("code is required"), None));

        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(error.message, "code is required");
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_status_mapping_for_auth_statuses() {
        for status in [401, 403] {
            let error = classify(&http(status, None, None));
            assert_eq!(error.kind, ErrorKind::Authentication);
            assert_eq!(error.status_code, Some(status));
        }
    }

    #[test]
    fn test_unmapped_status_keeps_generic_message() {
        let error = classify(&http(404, None, None));

        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.message, "HTTP error! status: 404");
        assert_eq!(error.status_code, Some(404));
    }

    #[test]
    fn test_status_embedded_in_event_text() {
        let error = classify(&event("upstream returned 503 while streaming"));

        assert_eq!(error.kind, ErrorKind::ServiceUnavailable);
        assert_eq!(error.status_code, Some(503));
    }

    #[test]
    fn test_malformed_payload_is_parse_failure() {
        let raw = RawFailure::Parse {
            detail: "expected value at line 1 column 7".to_string(),
            line: "data: {nope".to_string(),
        };
        let error = classify(&raw);

        assert_eq!(error.kind, ErrorKind::ParseFailure);
        assert!(error.message.contains("malformed"));
        assert!(error.original_message.contains("data: {nope"));
    }

    #[test]
    fn test_parse_phrasing_in_event_text() {
        let error = classify(&event("Unexpected token o in JSON at position 1"));

        assert_eq!(error.kind, ErrorKind::ParseFailure);
    }

    #[test]
    fn test_fallback_passes_text_through() {
        let error = classify(&event("something exploded"));

        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.message, "something exploded");
        assert_eq!(error.code, None);
    }

    #[test]
    fn test_fallback_replaces_contentless_failures() {
        for text in ["Failed to fetch", "", "   "] {
            let error = classify(&event(text));
            assert_eq!(error.kind, ErrorKind::Unknown);
            assert_eq!(error.message, "An unexpected error occurred. Please try again.");
        }
    }

    #[test]
    fn test_plain_json_object_is_not_structured() {
        // Decodes as an empty body, so it must not short-circuit rule 1.
        let error = classify(&event("{}"));
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.message, "{}");
    }

    #[test]
    fn test_embedded_status_scanner() {
        assert_eq!(embedded_status("HTTP error! status: 503"), Some(503));
        assert_eq!(embedded_status("400 Bad Request"), Some(400));
        assert_eq!(embedded_status("no digits here"), None);
        assert_eq!(embedded_status("request id 12345"), None);
        assert_eq!(embedded_status("took 200 ms"), None);
        assert_eq!(embedded_status("code 99"), None);
    }
}
