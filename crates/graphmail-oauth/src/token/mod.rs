//! Access tokens and token endpoint payloads.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Tokens this many seconds from expiry are refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

/// App-only access token issued by the identity platform.
#[derive(Clone)]
pub struct Token {
    /// Bearer token value.
    pub access_token: String,
    /// Token type, `Bearer` for the identity platform.
    pub token_type: String,
    /// Absolute expiry computed from `expires_in`.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Creates a token without a known expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
        }
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Builds a token from a successful endpoint response received at `now`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` for an empty token or a non-bearer type.
    pub fn from_response_at(response: TokenResponse, now: DateTime<Utc>) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("access_token is empty".into()));
        }
        if !response.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::InvalidResponse(format!(
                "unsupported token_type '{}'",
                response.token_type
            )));
        }

        let expires_at = response
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + Duration::seconds(secs));

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
        })
    }

    /// Builds a token from a response received just now.
    ///
    /// # Errors
    ///
    /// See [`Token::from_response_at`].
    pub fn from_response(response: TokenResponse) -> Result<Self> {
        Self::from_response_at(response, Utc::now())
    }

    /// True if the token expires within `margin` of `now`.
    #[must_use]
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now + margin >= exp)
    }

    /// True once the token is inside the refresh margin. Tokens without an
    /// expiry never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::seconds(REFRESH_MARGIN_SECS), Utc::now())
    }

    /// Opposite of [`Token::is_expired`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

/// Successful token endpoint body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Issued token.
    pub access_token: String,
    /// Token type.
    pub token_type: String,
    /// Lifetime in seconds. Older endpoints send it as a string.
    #[serde(default, deserialize_with = "seconds")]
    pub expires_in: Option<u64>,
    /// Extended lifetime used during identity platform outages.
    #[serde(default, deserialize_with = "seconds")]
    pub ext_expires_in: Option<u64>,
}

/// Error body from the identity platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// `OAuth2` error code such as `invalid_client`.
    pub error: String,
    /// Description, usually prefixed with an `AADSTS` code.
    #[serde(default)]
    pub error_description: String,
    /// Numeric `AADSTS` codes.
    #[serde(default)]
    pub error_codes: Vec<u32>,
    /// Correlation id for support requests.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ErrorResponse {
    /// Converts into [`Error::OAuth`]; the correlation id is appended to the
    /// description when present.
    #[must_use]
    pub fn into_error(self) -> Error {
        let description = match self.correlation_id {
            Some(id) if !id.is_empty() => format!("{} (correlation id {id})", self.error_description),
            _ => self.error_description,
        };
        Error::oauth_error(self.error, description)
    }
}

fn seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
