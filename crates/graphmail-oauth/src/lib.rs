//! # graphmail-oauth
//!
//! `OAuth2` client-credentials authentication for daemon applications that
//! call the Microsoft Graph mail API.
//!
//! ## Features
//!
//! - **Client credentials grant**: app-only tokens from a tenant, client id
//!   and client secret
//! - **Token management**: expiration checking with a 60 second buffer
//! - **Token caching**: [`ClientSecretCredential`] reuses a token until it is
//!   about to expire
//! - **Authority configuration**: Microsoft identity platform, sovereign
//!   clouds or any custom token endpoint
//!
//! ## Quick Start
//!
//! ```ignore
//! use graphmail_oauth::{Authority, ClientSecretCredential, OAuthClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = Authority::microsoft("your_tenant_id")?;
//!     let client = OAuthClient::new("your_client_id", "your_secret", authority);
//!     let credential = ClientSecretCredential::new(client);
//!
//!     // Cached until shortly before it expires
//!     let token = credential.token().await?;
//!     println!("Token type: {}", token.token_type);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod credential;
mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use credential::ClientSecretCredential;
pub use error::{Error, Result};
pub use flow::OAuthClient;
pub use provider::Authority;
pub use token::Token;
