//! Example: app-only token for Microsoft Graph
//!
//! This example demonstrates how to:
//! 1. Configure the Microsoft authority for a tenant
//! 2. Request a client credentials token
//! 3. Reuse the cached token
//!
//! ## Prerequisites
//!
//! 1. Register an application in Azure AD and grant it the `Mail.Send`
//!    application permission (admin consent required)
//! 2. Create a client secret for the registration
//! 3. Set environment variables:
//!    ```bash
//!    export GRAPH_TENANT_ID="your-tenant-id"
//!    export GRAPH_APP_ID="your-client-id"
//!    export GRAPH_SECRET="your-client-secret"
//!    ```
//!
//! ## Running
//!
//! ```bash
//! cargo run --example client_credentials
//! ```

use graphmail_oauth::{Authority, ClientSecretCredential, OAuthClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tenant_id = env::var("GRAPH_TENANT_ID")?;
    let client_id = env::var("GRAPH_APP_ID")?;
    let secret = env::var("GRAPH_SECRET")?;

    let authority = Authority::microsoft(&tenant_id)?;
    println!("Token endpoint: {}", authority.token_url);
    println!("Scopes: {:?}", authority.default_scopes);

    let credential = ClientSecretCredential::new(OAuthClient::new(client_id, secret, authority));

    let token = credential.token().await?;
    println!("Token type: {}", token.token_type);
    if let Some(expires_at) = token.expires_at {
        println!("Expires at: {expires_at}");
    }

    let again = credential.token().await?;
    println!(
        "Second call reused cached token: {}",
        again.access_token == token.access_token
    );

    Ok(())
}
