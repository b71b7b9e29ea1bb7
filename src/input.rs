use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::types::{Forge, PrSource, PullRequest, QuerySpec};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PullRequestDocument {
    List(Vec<PullRequest>),
    Search(SearchResponse),
}

/// GraphQL `search` response, as returned by `gh api graphql`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub data: SearchData,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchResults,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults {
    pub nodes: Vec<SearchNode>,
}

/// Search results may contain issues, which carry no pull request fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchNode {
    PullRequest(PullRequest),
    Other(serde_json::Value),
}

impl SearchResults {
    pub fn into_pull_requests(self) -> Vec<PullRequest> {
        self.nodes
            .into_iter()
            .filter_map(|node| match node {
                SearchNode::PullRequest(pr) => Some(pr),
                SearchNode::Other(value) => {
                    debug!("Skipping non pull request search node: {}", value);
                    None
                }
            })
            .collect()
    }
}

/// Parses either a plain JSON array of pull requests or a GraphQL search
/// response.
pub fn parse_pull_requests(json: &str) -> Result<Vec<PullRequest>> {
    let document: PullRequestDocument = serde_json::from_str(json)
        .context("Input is neither a pull request array nor a GraphQL search response")?;

    Ok(match document {
        PullRequestDocument::List(prs) => prs,
        PullRequestDocument::Search(response) => response.data.search.into_pull_requests(),
    })
}

/// Reads pull requests from a JSON file, or stdin for `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSource;

impl JsonSource {
    async fn read(path: &Path) -> Result<String> {
        if path == Path::new("-") {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read pull requests from stdin")?;
            return Ok(buf);
        }

        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read pull requests from '{}'", path.display()))
    }
}

#[async_trait]
impl Forge for JsonSource {
    async fn fetch_pull_requests(&self, spec: &QuerySpec) -> Result<Vec<PullRequest>> {
        let PrSource::Input(path) = &spec.source else {
            anyhow::bail!("JSON input cannot serve a GitHub search query");
        };

        let json = Self::read(path).await?;
        let prs = parse_pull_requests(&json)
            .with_context(|| format!("Failed to parse '{}'", path.display()))?;
        debug!("Loaded {} pull requests from {}", prs.len(), path.display());
        Ok(prs)
    }
}
