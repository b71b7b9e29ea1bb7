use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::debug;

use crate::{
    input::SearchData,
    types::{Forge, PrSource, PullRequest, QuerySpec},
};

/// Fields the filter needs, fetched in one search page.
const SEARCH_QUERY: &str = r#"
    query($query: String!) {
        search(query: $query, type: ISSUE, first: 100) {
            nodes {
                ... on PullRequest {
                    title
                    url
                    author {
                        login
                    }
                    labels(first: 50) {
                        nodes {
                            name
                        }
                    }
                    reviewRequests(first: 50) {
                        nodes {
                            requestedReviewer {
                                __typename
                                ... on User {
                                    login
                                }
                                ... on Bot {
                                    login
                                }
                                ... on Mannequin {
                                    login
                                }
                                ... on Team {
                                    name
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: SearchData,
}

/// Environment variables checked for a token, in order.
const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Resolves a token from [`TOKEN_VARS`], then from `gh auth token`.
pub fn get_github_token() -> Result<String> {
    match token_from_env(|var| std::env::var(var).ok()) {
        Some(token) => Ok(token),
        None => gh_cli_token(),
    }
}

fn token_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    TOKEN_VARS
        .iter()
        .filter_map(|&var| lookup(var))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

fn gh_cli_token() -> Result<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("No GITHUB_TOKEN/GH_TOKEN set and 'gh auth token' could not be run")?;

    if !output.status.success() {
        anyhow::bail!(
            "'gh auth token' exited with {}; run 'gh auth login' or set GITHUB_TOKEN",
            output.status
        );
    }

    let token = String::from_utf8(output.stdout).context("'gh auth token' printed non-UTF-8")?;
    match token.trim() {
        "" => anyhow::bail!("'gh auth token' printed an empty token"),
        token => Ok(token.to_string()),
    }
}

/// Creates an authenticated GitHub client using available credentials.
pub fn setup_github_client() -> Result<Octocrab> {
    let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("Failed to create GitHub client")
}

/// Splits `owner/repo`, rejecting anything else.
pub fn parse_repo_from_string(repo: &str) -> Result<(&str, &str)> {
    match repo.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok((*owner, *name)),
        _ => anyhow::bail!("Repository must be in format 'owner/repo', got: '{}'", repo),
    }
}

/// Builds the search query listing open pull requests in `owner/repo`.
pub fn repo_search_query(repo: &str) -> Result<String> {
    let (owner, name) = parse_repo_from_string(repo)?;
    Ok(format!("repo:{}/{} is:pr is:open", owner, name))
}

/// Completes a user supplied search query with `is:pr` and, unless a state
/// is given, `is:open`.
pub fn format_user_query(query: &str) -> String {
    let mut final_query = query.trim().to_string();

    if !final_query.contains("is:pr") {
        final_query = format!("{} is:pr", final_query);
    }

    if !final_query.contains("is:open") && !final_query.contains("is:closed") {
        final_query = format!("{} is:open", final_query);
    }

    final_query
}

/// Fetches pull requests through GitHub's GraphQL search. Only the first
/// page of results is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHub;

#[async_trait]
impl Forge for GitHub {
    async fn fetch_pull_requests(&self, spec: &QuerySpec) -> Result<Vec<PullRequest>> {
        let PrSource::Search(search_query) = &spec.source else {
            anyhow::bail!("GitHub forge needs a search query, not a JSON input");
        };

        let octocrab = setup_github_client()?;
        let payload = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": { "query": search_query },
        });

        debug!("Searching GitHub: {}", search_query);
        let response: GraphQLResponse = octocrab
            .graphql(&payload)
            .await
            .with_context(|| format!("GitHub search failed for '{}'", search_query))?;

        Ok(response.data.search.into_pull_requests())
    }
}
