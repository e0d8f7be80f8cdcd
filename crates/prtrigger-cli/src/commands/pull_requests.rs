//! Pull-request commands against a running server.

use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::json;

use super::{Client, read_json};

pub async fn trigger(client: &Client, repository_id: i64, pull_request_id: i64) -> Result<()> {
    let url = client.pull_request_url(repository_id, pull_request_id, "trigger");
    let response = client
        .request(Method::POST, &url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;
    let body = read_json(response).await?;

    println!(
        "Build for pull request {} scheduled at {}",
        pull_request_id,
        body.get("fire_at").and_then(|v| v.as_str()).unwrap_or("?")
    );
    Ok(())
}

pub async fn status(client: &Client, repository_id: i64, pull_request_id: i64) -> Result<()> {
    let url = client.pull_request_url(repository_id, pull_request_id, "automatic-build");
    let response = client
        .request(Method::GET, &url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;
    let body = read_json(response).await?;

    println!(
        "Automatic build for pull request {}: {}",
        pull_request_id,
        body.get("state").and_then(|v| v.as_str()).unwrap_or("?")
    );
    Ok(())
}

pub async fn set_automatic_build(
    client: &Client,
    repository_id: i64,
    pull_request_id: i64,
    enabled: bool,
) -> Result<()> {
    let url = client.pull_request_url(repository_id, pull_request_id, "automatic-build");
    let response = client
        .request(Method::PUT, &url)
        .json(&json!({ "enabled": enabled }))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;
    let body = read_json(response).await?;

    println!(
        "Automatic build for pull request {} is now {}",
        pull_request_id,
        body.get("state").and_then(|v| v.as_str()).unwrap_or("?")
    );
    Ok(())
}
