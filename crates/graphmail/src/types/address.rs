//! Email address types.

use crate::error::{Error, Result};

/// Email address with an optional display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
    /// Email address (e.g., `user@example.com`).
    pub email: String,
    /// Display name (optional).
    pub name: Option<String>,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Validates the email part (basic validation).
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the email is empty or not of the form
    /// `local@domain`.
    pub fn validate(&self) -> Result<()> {
        let addr = self.email.trim();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!(
                "Address must contain @: {addr}"
            )));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "Address must have exactly one @: {addr}"
            )));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Local and domain parts cannot be empty: {addr}"
            )));
        }

        Ok(())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com");
        addr.validate().unwrap();
        assert!(addr.name.is_none());
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").validate().is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").validate().is_err());
        assert!(Address::new("   ").validate().is_err());
    }

    #[test]
    fn test_invalid_address_two_at() {
        assert!(Address::new("a@b@example.com").validate().is_err());
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::new("@example.com").validate().is_err());
        assert!(Address::new("user@").validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Address::with_name("john@example.com", "John Doe").to_string(),
            "John Doe <john@example.com>"
        );
        assert_eq!(Address::from("john@example.com").to_string(), "john@example.com");
    }
}
