//! Web search behind the [`SearchProvider`] trait.
//!
//! The pipeline never sees a provider's raw payload. A provider returns a
//! plain-text digest of its top results, one block per result:
//!
//! ```text
//! Title: <title>
//! Snippet: <snippet>
//! URL: <link>
//! ```
//!
//! Blocks are separated by a blank line. [`SerperClient`] is the production
//! implementation (Google results via serper.dev).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, SearchConfig};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SERPER_API_KEY is not set")]
    MissingApiKey,
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("search returned no results")]
    NoResults,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query` and return a text digest of the top results.
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

// ============ Serper ============

pub struct SerperClient {
    api_key: Option<String>,
    endpoint: String,
    max_results: usize,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

impl SerperClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            endpoint: config.endpoint.clone(),
            max_results: config.max_results,
            client,
        })
    }

    async fn fetch(&self, api_key: &str, query: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&SerperRequest { q: query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: SerperResponse = response.json().await?;
        let digest = format_digest(&payload.organic, self.max_results);
        if digest.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(digest)
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        tracing::info!(query, "searching");

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("missing SERPER_API_KEY; set it in the environment or a .env file");
            return Err(SearchError::MissingApiKey);
        };

        match self.fetch(api_key, query).await {
            Ok(digest) => Ok(digest),
            Err(e) => {
                tracing::warn!(query, error = %e, "search failed");
                Err(e)
            }
        }
    }
}

fn format_digest(results: &[OrganicResult], max_results: usize) -> String {
    results
        .iter()
        .take(max_results)
        .map(|r| format!("Title: {}\nSnippet: {}\nURL: {}", r.title, r.snippet, r.link))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `postsmith search`: print the digest the pipeline would see for `query`.
pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let client = SerperClient::new(&config.search)?;
    match client.search(query).await {
        Ok(digest) => println!("{}", digest),
        Err(SearchError::NoResults) => println!("No results."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
