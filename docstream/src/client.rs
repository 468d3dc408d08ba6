//! HTTP transport for the generation endpoint.
//!
//! [`Client`] owns the connection pool, base URL and auth wiring, and
//! issues `POST /generate-stream` requests. It deliberately stops at the
//! transport boundary: streaming, document assembly and error
//! classification live in [`crate::session`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::auth::{StaticToken, TokenProvider};
use crate::error::{DEFAULT_RETRY_AFTER_SECS, RawFailure};
use crate::session::Generator;
use crate::types::{ApiErrorBody, GenerationRequest, RateLimitInfo};

/// Default service base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.docstream.dev";

/// Path of the streaming generation endpoint.
pub const GENERATE_STREAM_PATH: &str = "/generate-stream";

const HEADER_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const HEADER_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Outcome of issuing a generation request.
///
/// The rate-limit snapshot is captured from the response headers before
/// the status is inspected, so it survives failures such as a 429.
#[derive(Debug)]
pub struct Issued {
    /// Rate-limit snapshot from the response headers, when present.
    pub rate_limit: Option<RateLimitInfo>,
    /// The streaming response, or the failure to obtain one.
    pub outcome: Result<reqwest::Response, RawFailure>,
}

/// Client for the documentation-generation service.
///
/// # Example
///
/// ```rust,ignore
/// use docstream::{Client, DocType, GenerationRequest};
///
/// let client = Client::builder()
///     .base_url("https://api.docstream.dev")
///     .token("dst-...")
///     .build();
/// let generator = client.generator();
/// let result = generator
///     .generate(GenerationRequest::new(code, DocType::Readme, "lib.rs"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    http_client: reqwest::Client,
    base_url: Arc<str>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("has_token_provider", &self.token_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for the given base URL with no authentication.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The configured base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a generation session driver backed by this client.
    #[must_use]
    pub fn generator(&self) -> Generator {
        Generator::new(self.clone())
    }

    /// Issue a generation request and hand back the streaming response.
    ///
    /// Non-2xx responses are drained into a [`RawFailure::Http`] carrying
    /// whatever the error body provided. For a 429 the retry window
    /// defaults to [`DEFAULT_RETRY_AFTER_SECS`] when the body names none.
    pub async fn issue(&self, request: &GenerationRequest) -> Issued {
        let url = format!("{}{GENERATE_STREAM_PATH}", self.base_url);
        let mut builder = self.http_client.post(&url).json(request);
        if let Some(provider) = &self.token_provider
            && let Some(token) = provider.token().await
        {
            builder = builder.bearer_auth(token);
        }

        debug!(url = %url, doc_type = %request.doc_type, filename = %request.filename, "issuing generation request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                return Issued {
                    rate_limit: None,
                    outcome: Err(RawFailure::Transport(err)),
                };
            }
        };

        let rate_limit = rate_limit_info(response.headers());
        let status = response.status();
        if status.is_success() {
            Issued {
                rate_limit,
                outcome: Ok(response),
            }
        } else {
            Issued {
                rate_limit,
                outcome: Err(Self::status_failure(status, response).await),
            }
        }
    }

    /// Drain a non-2xx response into a typed failure.
    async fn status_failure(status: StatusCode, response: reqwest::Response) -> RawFailure {
        let body: Option<ApiErrorBody> = response.json().await.ok();
        let status = status.as_u16();
        let (message, mut retry_after, code) = match body {
            Some(body) => (body.message, body.retry_after, body.error),
            None => (None, None, None),
        };
        if status == 429 {
            retry_after = Some(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS));
        }
        RawFailure::Http {
            status,
            message,
            retry_after,
            code,
        }
    }
}

/// Parse the `X-RateLimit-*` header family.
///
/// Returns a snapshot only when both `Remaining` and `Limit` are present
/// and numeric. A missing `Reset` header is recorded as epoch zero.
#[must_use]
pub fn rate_limit_info(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = header_number::<u32>(headers, HEADER_RATE_LIMIT_REMAINING)?;
    let limit = header_number::<u32>(headers, HEADER_RATE_LIMIT_LIMIT)?;
    let reset_epoch_seconds = header_number::<u64>(headers, HEADER_RATE_LIMIT_RESET).unwrap_or(0);
    Some(RateLimitInfo {
        remaining,
        limit,
        reset_epoch_seconds,
    })
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("has_token_provider", &self.token_provider.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Set the service base URL. A trailing slash is stripped.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set a whole-exchange timeout in seconds.
    ///
    /// The timeout covers the streamed body too, so it bounds the entire
    /// generation, not just the time to first byte.
    #[must_use]
    pub const fn timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = Some(timeout);
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Attach a token provider for request authentication.
    #[must_use]
    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Attach a fixed bearer token.
    #[must_use]
    pub fn token(self, token: impl Into<String>) -> Self {
        self.token_provider(StaticToken::from(token.into()))
    }

    /// Build the client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client fails to build.
    #[must_use]
    pub fn build(self) -> Client {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();
        let http_client = Self::build_http_client(self.timeout_secs, self.user_agent);

        Client {
            http_client,
            base_url: base_url.into(),
            token_provider: self.token_provider,
        }
    }

    fn build_http_client(timeout_secs: Option<u64>, user_agent: Option<String>) -> reqwest::Client {
        let user_agent = user_agent
            .unwrap_or_else(|| format!("docstream/{}", env!("CARGO_PKG_VERSION")));
        let mut builder = reqwest::Client::builder().user_agent(user_agent);

        if let Some(timeout) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        builder.build().expect("Failed to build HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder().build();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let client = Client::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_debug_does_not_expose_token() {
        let client = Client::builder().token("dst-secret").build();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("dst-secret"));
        assert!(rendered.contains("has_token_provider: true"));
    }

    #[test]
    fn test_rate_limit_info_requires_remaining_and_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RATE_LIMIT_REMAINING, HeaderValue::from_static("3"));
        assert_eq!(rate_limit_info(&headers), None);

        headers.insert(HEADER_RATE_LIMIT_LIMIT, HeaderValue::from_static("10"));
        let info = rate_limit_info(&headers).unwrap();
        assert_eq!(info.remaining, 3);
        assert_eq!(info.limit, 10);
        assert_eq!(info.reset_epoch_seconds, 0);
    }

    #[test]
    fn test_rate_limit_info_reads_reset() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RATE_LIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(HEADER_RATE_LIMIT_LIMIT, HeaderValue::from_static("10"));
        headers.insert(
            HEADER_RATE_LIMIT_RESET,
            HeaderValue::from_static("1735689600"),
        );

        let info = rate_limit_info(&headers).unwrap();
        assert_eq!(info.reset_epoch_seconds, 1_735_689_600);
        assert!(info.is_exhausted());
    }

    #[test]
    fn test_rate_limit_info_rejects_junk_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_RATE_LIMIT_REMAINING,
            HeaderValue::from_static("many"),
        );
        headers.insert(HEADER_RATE_LIMIT_LIMIT, HeaderValue::from_static("10"));

        assert_eq!(rate_limit_info(&headers), None);
    }
}
