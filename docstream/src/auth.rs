//! Token acquisition for authenticated requests.
//!
//! The generation endpoint accepts an optional `Authorization: Bearer`
//! header. A [`TokenProvider`] supplies that token per request, so callers
//! can plug in anything from a fixed string to an async session refresh.

use std::fmt;

use async_trait::async_trait;

/// Supplies the bearer token attached to generation requests.
///
/// Returning `None` sends the request unauthenticated; the service then
/// applies anonymous rate limits.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` when none is available.
    async fn token(&self) -> Option<String>;
}

/// Fixed bearer token known at construction time.
pub struct StaticToken(String);

impl<S> From<S> for StaticToken
where
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"[REDACTED]").finish()
    }
}

/// Reads the bearer token from an environment variable on every request.
///
/// Empty values count as absent, so `VAR=` behaves like an unset variable.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    /// Create a provider reading from `var`.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::from("secret-123");
        assert_eq!(provider.token().await.as_deref(), Some("secret-123"));
    }

    #[test]
    fn test_static_token_debug_is_redacted() {
        let provider = StaticToken::from("secret-123");
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("secret-123"));
        assert!(rendered.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_env_token_missing_variable() {
        let provider = EnvToken::new("DOCSTREAM_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(provider.token().await, None);
    }
}
