//! Cached client-secret credential.

use crate::error::Result;
use crate::flow::OAuthClient;
use crate::token::Token;
use tokio::sync::Mutex;
use tracing::debug;

/// App-only credential that caches its access token.
///
/// Concurrent callers share one in-flight token request: the cache lock is
/// held while a new token is fetched.
#[derive(Debug)]
pub struct ClientSecretCredential {
    client: OAuthClient,
    scopes: Option<Vec<String>>,
    cached: Mutex<Option<Token>>,
}

impl ClientSecretCredential {
    /// Creates a credential using the authority's default scopes.
    #[must_use]
    pub fn new(client: OAuthClient) -> Self {
        Self {
            client,
            scopes: None,
            cached: Mutex::new(None),
        }
    }

    /// Overrides the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Returns a valid token, requesting a new one when the cached token is
    /// missing or about to expire.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request fails.
    pub async fn token(&self) -> Result<Token> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        debug!(client_id = %self.client.client_id, "cached token missing or expired");
        let token = self.client.request_token(self.scopes.as_deref()).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    #[cfg(test)]
    async fn seed(&self, token: Token) {
        *self.cached.lock().await = Some(token);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Authority;
    use chrono::{Duration, Utc};

    fn credential() -> ClientSecretCredential {
        // Unroutable authority: any real request would fail.
        let authority =
            Authority::microsoft_with_host("http://127.0.0.1:9", "tenant").unwrap();
        ClientSecretCredential::new(OAuthClient::new("app", "secret", authority))
    }

    #[tokio::test]
    async fn test_valid_cached_token_is_reused() {
        let credential = credential();
        credential
            .seed(
                Token::new("cached", "Bearer")
                    .with_expires_at(Utc::now() + Duration::seconds(3600)),
            )
            .await;

        let token = credential.token().await.unwrap();
        assert_eq!(token.access_token, "cached");
    }

    #[tokio::test]
    async fn test_expired_token_triggers_request() {
        let credential = credential();
        credential
            .seed(
                Token::new("stale", "Bearer")
                    .with_expires_at(Utc::now() - Duration::seconds(10)),
            )
            .await;

        // The refresh goes to the unroutable authority and fails.
        assert!(credential.token().await.is_err());
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let credential = credential();
        tokio_test::block_on(async {
            credential.seed(Token::new("cached", "Bearer")).await;
            credential.invalidate().await;
        });

        assert!(credential.cached.try_lock().unwrap().is_none());
    }
}
