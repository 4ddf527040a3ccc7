//! Token authority configuration.

use crate::error::{Error, Result};
use url::Url;

/// Public Microsoft identity platform host.
pub const MICROSOFT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// App-only scope covering every Graph permission granted to the application.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Token authority configuration.
#[derive(Debug, Clone)]
pub struct Authority {
    /// Authority name (e.g., "Microsoft").
    pub name: String,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Authority {
    /// Creates a new authority configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(name: impl Into<String>, token_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Microsoft identity platform authority for a single tenant.
    ///
    /// Scopes:
    /// - `https://graph.microsoft.com/.default` - application permissions
    ///   granted to the app registration (e.g. `Mail.Send`)
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant id is empty or URL parsing fails.
    pub fn microsoft(tenant_id: &str) -> Result<Self> {
        Self::microsoft_with_host(MICROSOFT_AUTHORITY_HOST, tenant_id)
    }

    /// Microsoft authority on a specific host, for sovereign clouds or tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant id is empty or URL parsing fails.
    pub fn microsoft_with_host(host: &str, tenant_id: &str) -> Result<Self> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(Error::InvalidConfig("tenant id is empty".into()));
        }

        let token_url = format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            host.trim_end_matches('/')
        );

        Ok(Self::new("Microsoft", token_url)?
            .with_default_scopes(vec![GRAPH_DEFAULT_SCOPE.to_string()]))
    }

    /// Validates that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
        }
        if self.default_scopes.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "authority {} has no default scopes",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_authority() {
        let authority = Authority::microsoft("contoso.onmicrosoft.com").unwrap();
        assert_eq!(authority.name, "Microsoft");
        assert_eq!(
            authority.token_url.as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert_eq!(authority.default_scopes, vec![GRAPH_DEFAULT_SCOPE]);
        authority.validate().unwrap();
    }

    #[test]
    fn test_custom_host_trailing_slash() {
        let authority =
            Authority::microsoft_with_host("https://login.microsoftonline.us/", "tenant").unwrap();
        assert_eq!(
            authority.token_url.as_str(),
            "https://login.microsoftonline.us/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_empty_tenant_rejected() {
        assert!(matches!(
            Authority::microsoft("  "),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_custom_authority_needs_scopes() {
        let authority = Authority::new("Custom", "https://auth.example.com/token").unwrap();
        assert!(authority.validate().is_err());

        let authority = authority.with_default_scopes(vec!["mail".to_string()]);
        authority.validate().unwrap();
    }
}
