//! CLI command implementations.

pub mod pull_requests;

use anyhow::{Context, Result};
use prtrigger_config::{Config, parse_config};

/// Header the server reads the acting user from.
const REMOTE_USER_HEADER: &str = "X-Remote-User";

/// HTTP client for the trigger server.
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    user: Option<String>,
}

impl Client {
    pub fn new(api_url: &str, user: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            user,
        }
    }

    fn pull_request_url(&self, repository_id: i64, pull_request_id: i64, action: &str) -> String {
        format!(
            "{}/api/v1/repositories/{}/pull-requests/{}/{}",
            self.api_url, repository_id, pull_request_id, action
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.user {
            Some(user) => builder.header(REMOTE_USER_HEADER, user),
            None => builder,
        }
    }
}

/// Read the JSON body of a response, turning `{"error": ...}` bodies into errors.
async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("Failed to read server response")?;

    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("unknown error");
        anyhow::bail!("Server returned {}: {}", status, message);
    }
    Ok(body)
}

pub fn validate(path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    match parse_config(&content) {
        Ok(config) => {
            println!("Configuration is valid");
            print_summary(&config);
            Ok(())
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(config: &Config) {
    println!("Listen: {}", config.server.listen);
    println!(
        "Storage: {}",
        if config.server.database_url.is_some() {
            "postgres"
        } else {
            "memory"
        }
    );
    for repo in &config.repositories {
        let mut triggers = Vec::new();
        if repo.trigger_on_create {
            triggers.push("create");
        }
        if repo.trigger_on_update {
            triggers.push("update");
        }
        if repo.trigger_on_reopen {
            triggers.push("reopen");
        }
        println!(
            "  {} (project {}): triggers [{}], delay {}s, {} CI server(s){}",
            repo.slug,
            repo.project.as_deref().unwrap_or("-"),
            triggers.join(", "),
            repo.debounce_delay_secs,
            repo.ci_servers.len(),
            if repo.disable_automatic_build {
                ", automatic builds off by default"
            } else {
                ""
            }
        );
        if repo.ci_servers.is_empty() || repo.build_job.is_none() {
            println!("    warning: builds for {} will be skipped (no CI server or build job)", repo.slug);
        }
    }
}
