//! Bearer token sources for the HTTP transport.

use crate::error::Result;
use async_trait::async_trait;
use graphmail_oauth::ClientSecretCredential;

/// Supplies access tokens for Graph calls.
///
/// Token refresh is the source's responsibility; the transport asks for a
/// token before every request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> Result<String>;

    /// Drops any cached token after the provider rejected it.
    async fn invalidate(&self) {}
}

#[async_trait]
impl TokenSource for ClientSecretCredential {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token().await?.access_token)
    }

    async fn invalidate(&self) {
        Self::invalidate(self).await;
    }
}

/// A fixed, externally acquired token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps an access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token() {
        let source = StaticToken::new("abc");
        let token = tokio_test::block_on(source.access_token()).unwrap();
        assert_eq!(token, "abc");
        assert!(!format!("{source:?}").contains("abc"));
    }
}
