//! Example: send an HTML email through Microsoft Graph
//!
//! Options come from `appsettings.json` (a `"GraphSenderOptions"` section)
//! when the file exists, otherwise from the environment:
//!
//! ```bash
//! export GRAPH_TENANT_ID="your-tenant-id"
//! export GRAPH_APP_ID="your-client-id"
//! export GRAPH_SECRET="your-client-secret"
//! ```
//!
//! The app registration needs the `Mail.Send` application permission.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=graphmail=debug cargo run --example send_mail -- \
//!     sender@contoso.com recipient@example.com [attachment...]
//! ```

use anyhow::{Context, bail};
use graphmail::{
    Address, Attachment, CancellationToken, GraphSender, GraphSenderOptions, OutboundEmail, Sender,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const BODY: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
</head>
<body>
Test mail ok<br/>
<b>Bold text</b>
</body>
</html>"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(from), Some(to)) = (args.next(), args.next()) else {
        bail!("usage: send_mail <from> <to> [attachment...]");
    };

    let options = if Path::new("appsettings.json").exists() {
        GraphSenderOptions::from_json_file("appsettings.json")?
    } else {
        GraphSenderOptions::from_env()?
    };
    let sender = GraphSender::from_options(&options).context("configuring sender")?;

    let mut email = OutboundEmail::new()
        .from(Address::with_name(from, "graphmail"))
        .to(to)
        .subject("Test contact email")
        .html_body(BODY);
    for path in args {
        let attachment = Attachment::from_file(&path, "application/octet-stream")
            .await
            .with_context(|| format!("reading {path}"))?;
        email = email.attach(attachment);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = sender.send(&email, &cancel).await;
    match result.message_id() {
        Some(id) => println!("Sent: {id}"),
        None => bail!("send failed: {}", result.errors().join("; ")),
    }

    Ok(())
}
