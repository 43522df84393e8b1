mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};

/// Issues a GET and returns the body, failing on non-success statuses.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("Invalid URL '{url}'"))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Issues a GET and parses the body as JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<serde_json::Value> {
    let bytes = fetch_bytes(client, url).await?;
    serde_json::from_slice(&bytes).with_context(|| format!("Response from {url} is not JSON"))
}
