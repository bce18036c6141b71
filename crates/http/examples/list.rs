//! List one page of a NetStorage directory.
//!
//! ```bash
//! NETSTORAGE_KEY_NAME=api-user NETSTORAGE_SECRET=... \
//! NETSTORAGE_ACCOUNT_CODE=123456 NETSTORAGE_STORAGE_GROUP=example-group \
//! NETSTORAGE_PATH=/some/dir \
//!     cargo run -p ns-http --example list
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ns_core::ListRequest;
use ns_http::{Lister, NetStorageClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let account_code: u32 = env("NETSTORAGE_ACCOUNT_CODE")?
        .parse()
        .context("NETSTORAGE_ACCOUNT_CODE must be a number")?;
    let storage_group = env("NETSTORAGE_STORAGE_GROUP")?;
    let path = std::env::var("NETSTORAGE_PATH").unwrap_or_default();

    let key_name = env("NETSTORAGE_KEY_NAME")?;
    let secret = env("NETSTORAGE_SECRET")?;

    let client = NetStorageClient::new(key_name, secret)?;
    let request = ListRequest::new(account_code, storage_group).path(path);
    let result = client.list(&request).await?;

    for entry in &result.entries {
        println!("{:<8} {:>12} {}", entry.kind, entry.size, entry.name);
    }
    if let Some(token) = result.resume_token() {
        println!("(truncated, resume from {token})");
    }

    Ok(())
}

fn env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} not set"))
}
