//! `OAuth2` client credentials grant (RFC 6749 section 4.4).

use crate::error::{Error, Result};
use crate::provider::Authority;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// Confidential `OAuth2` client for app-only access.
#[derive(Clone)]
pub struct OAuthClient {
    /// Client (application) ID from the app registration.
    pub client_id: String,
    /// Client secret.
    client_secret: String,
    /// Authority configuration.
    pub authority: Authority,
    /// HTTP client.
    http_client: Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authority: Authority,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority,
            http_client: Client::new(),
        }
    }

    /// Replaces the HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Builds the form body for a client credentials token request.
    fn token_request_params<'a>(&'a self, scope: &'a str) -> Result<HashMap<&'static str, &'a str>> {
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig("client id is empty".into()));
        }
        if self.client_secret.is_empty() {
            return Err(Error::InvalidConfig("client secret is empty".into()));
        }

        let mut params = HashMap::new();
        params.insert("grant_type", "client_credentials");
        params.insert("client_id", self.client_id.as_str());
        params.insert("client_secret", self.client_secret.as_str());
        params.insert("scope", scope);
        Ok(params)
    }

    /// Requests an app-only access token.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses authority defaults if None)
    ///
    /// # Errors
    ///
    /// Returns an error if the client is misconfigured, the request fails or
    /// the token endpoint rejects the credentials.
    pub async fn request_token(&self, scopes: Option<&[String]>) -> Result<Token> {
        let scope_str = scopes.map_or_else(
            || self.authority.default_scopes.join(" "),
            |s| s.join(" "),
        );
        let params = self.token_request_params(&scope_str)?;

        debug!(
            authority = %self.authority.name,
            client_id = %self.client_id,
            "requesting client credentials token"
        );

        let response = self
            .http_client
            .post(self.authority.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::Status {
                    status: status.as_u16(),
                    body,
                },
                ErrorResponse::into_error,
            ));
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response)
    }
}
