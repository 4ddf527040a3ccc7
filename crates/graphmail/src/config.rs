//! Sender configuration.
//!
//! Options are read from JSON, either a bare object or an application
//! settings file with a `"GraphSenderOptions"` section, or from `GRAPH_*`
//! environment variables.

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transport::GRAPH_BASE_URL;
use graphmail_oauth::provider::MICROSOFT_AUTHORITY_HOST;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings section name inside a larger JSON document.
pub const SECTION: &str = "GraphSenderOptions";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 100;

/// Retry settings as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RetryOptions {
    /// Total attempts per call, including the first.
    #[serde(alias = "max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the first retry, in milliseconds.
    #[serde(alias = "base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap for any single backoff, in milliseconds.
    #[serde(alias = "max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        RetryPolicy::default().into()
    }
}

impl From<RetryPolicy> for RetryOptions {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<RetryOptions> for RetryPolicy {
    fn from(options: RetryOptions) -> Self {
        Self::new(
            options.max_attempts,
            Duration::from_millis(options.base_delay_ms),
            Duration::from_millis(options.max_delay_ms),
        )
    }
}

/// Graph sender configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GraphSenderOptions {
    /// Directory (tenant) id.
    #[serde(alias = "tenant_id")]
    pub tenant_id: String,
    /// Application (client) id.
    #[serde(alias = "ClientId", alias = "app_id", alias = "client_id")]
    pub app_id: String,
    /// Client secret.
    #[serde(alias = "secret")]
    pub secret: String,
    /// Keep a copy in Sent Items when using the single-request path.
    #[serde(alias = "save_sent_items")]
    pub save_sent_items: bool,
    /// Delete the draft when a multi-step send fails after creating it.
    #[serde(alias = "delete_orphaned_drafts")]
    pub delete_orphaned_drafts: bool,
    /// Graph endpoint.
    #[serde(alias = "graph_base_url")]
    pub graph_base_url: String,
    /// Identity platform host.
    #[serde(alias = "authority_url")]
    pub authority_url: String,
    /// Per-call retry settings.
    #[serde(alias = "retry")]
    pub retry: RetryOptions,
    /// HTTP request timeout in seconds.
    #[serde(alias = "request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GraphSenderOptions {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            app_id: String::new(),
            secret: String::new(),
            save_sent_items: false,
            delete_orphaned_drafts: false,
            graph_base_url: GRAPH_BASE_URL.to_string(),
            authority_url: MICROSOFT_AUTHORITY_HOST.to_string(),
            retry: RetryOptions::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for GraphSenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSenderOptions")
            .field("tenant_id", &self.tenant_id)
            .field("app_id", &self.app_id)
            .field("secret", &"<redacted>")
            .field("save_sent_items", &self.save_sent_items)
            .field("delete_orphaned_drafts", &self.delete_orphaned_drafts)
            .field("graph_base_url", &self.graph_base_url)
            .field("authority_url", &self.authority_url)
            .field("retry", &self.retry)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl GraphSenderOptions {
    /// Creates options for an app registration.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        app_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            app_id: app_id.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Sets whether single-request sends are saved to Sent Items.
    #[must_use]
    pub const fn with_save_sent_items(mut self, save: bool) -> Self {
        self.save_sent_items = save;
        self
    }

    /// Sets whether orphaned drafts are deleted.
    #[must_use]
    pub const fn with_delete_orphaned_drafts(mut self, delete: bool) -> Self {
        self.delete_orphaned_drafts = delete;
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.into()
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parses options from JSON.
    ///
    /// Accepts a document with a top-level `"GraphSenderOptions"` object or
    /// the options object itself.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the document is not valid JSON for the options.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        let section = value
            .get_mut(SECTION)
            .map(serde_json::Value::take)
            .unwrap_or(value);
        Ok(serde_json::from_value(section)?)
    }

    /// Reads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Json` if it does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reads options from `GRAPH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a boolean variable is not a boolean.
    pub fn from_env() -> Result<Self> {
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Reads options through a variable lookup.
    ///
    /// Recognized: `GRAPH_TENANT_ID`, `GRAPH_APP_ID` (or `GRAPH_CLIENT_ID`),
    /// `GRAPH_SECRET`, `GRAPH_SAVE_SENT_ITEMS`, `GRAPH_DELETE_ORPHANED_DRAFTS`.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a boolean variable is not a boolean.
    pub fn from_env_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(tenant_id) = lookup("GRAPH_TENANT_ID") {
            options.tenant_id = tenant_id;
        }
        if let Some(app_id) = lookup("GRAPH_APP_ID").or_else(|| lookup("GRAPH_CLIENT_ID")) {
            options.app_id = app_id;
        }
        if let Some(secret) = lookup("GRAPH_SECRET") {
            options.secret = secret;
        }
        if let Some(value) = lookup("GRAPH_SAVE_SENT_ITEMS") {
            options.save_sent_items = parse_bool("GRAPH_SAVE_SENT_ITEMS", &value)?;
        }
        if let Some(value) = lookup("GRAPH_DELETE_ORPHANED_DRAFTS") {
            options.delete_orphaned_drafts = parse_bool("GRAPH_DELETE_ORPHANED_DRAFTS", &value)?;
        }

        Ok(options)
    }

    /// Checks that the options can build a sender.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first missing or invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(Error::InvalidConfig("TenantId is required".into()));
        }
        if self.app_id.trim().is_empty() {
            return Err(Error::InvalidConfig("AppId is required".into()));
        }
        if self.secret.is_empty() {
            return Err(Error::InvalidConfig("Secret is required".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "RequestTimeoutSecs must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "Retry.MaxAttempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::InvalidConfig(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}
