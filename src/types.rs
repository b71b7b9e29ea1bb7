use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::condition::ConditionSet;

/// Login rendered for pull requests whose author account no longer exists.
pub const GHOST_LOGIN: &str = "ghost";

/// Message printed when no pull request survives filtering.
pub const DEFAULT_EMPTY_MESSAGE: &str = "No pull requests awaiting review.";

/// A pull request snapshot as returned by GitHub's GraphQL API.
///
/// Connections that GitHub omits or returns as `null` are treated as empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub labels: Option<LabelConnection>,
    #[serde(default)]
    pub review_requests: Option<ReviewRequestConnection>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Author {
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelConnection {
    #[serde(default)]
    pub nodes: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewRequestConnection {
    #[serde(default)]
    pub nodes: Vec<ReviewRequest>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// `None` when the reviewer is not visible to the token or is neither a
    /// user nor a team (e.g. a mannequin).
    #[serde(default, deserialize_with = "deserialize_reviewer")]
    pub requested_reviewer: Option<Reviewer>,
}

// GraphQL returns `{ "__typename": ... }` alone for reviewer kinds the query
// has no fragment for; those are dropped instead of failing the whole PR.
fn deserialize_reviewer<'de, D>(deserializer: D) -> std::result::Result<Option<Reviewer>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| Reviewer::deserialize(value).ok()))
}

/// Someone asked to review a pull request: a user or a team.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Reviewer {
    User { login: String },
    Team { name: String },
}

impl Reviewer {
    /// The identifier used both for display and for condition matching.
    pub fn id(&self) -> &str {
        match self {
            Reviewer::User { login } => login,
            Reviewer::Team { name } => name,
        }
    }
}

impl PullRequest {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            author: None,
            labels: None,
            review_requests: None,
        }
    }

    pub fn with_author(mut self, login: impl Into<String>) -> Self {
        self.author = Some(Author {
            login: login.into(),
        });
        self
    }

    pub fn with_labels<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(LabelConnection {
            nodes: names
                .into_iter()
                .map(|name| Label { name: name.into() })
                .collect(),
        });
        self
    }

    pub fn with_reviewers<I>(mut self, reviewers: I) -> Self
    where
        I: IntoIterator<Item = Reviewer>,
    {
        self.review_requests = Some(ReviewRequestConnection {
            nodes: reviewers
                .into_iter()
                .map(|reviewer| ReviewRequest {
                    requested_reviewer: Some(reviewer),
                })
                .collect(),
        });
        self
    }

    pub fn author_login(&self) -> &str {
        self.author
            .as_ref()
            .map_or(GHOST_LOGIN, |author| author.login.as_str())
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .flat_map(|conn| conn.nodes.iter())
            .map(|label| label.name.as_str())
    }

    /// Requested reviewers in the order GitHub returned them.
    pub fn reviewers(&self) -> impl Iterator<Item = &Reviewer> {
        self.review_requests
            .iter()
            .flat_map(|conn| conn.nodes.iter())
            .filter_map(|request| request.requested_reviewer.as_ref())
    }
}

/// Where the pull requests of a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PrSource {
    /// A JSON document on disk, or stdin when the path is `-`.
    Input(PathBuf),
    /// A GitHub search query, already completed with `is:pr`/`is:open`.
    Search(String),
}

/// A fully validated request: where to read PRs from and which conditions
/// decide what gets reported.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub source: PrSource,
    pub conditions: ConditionSet,
    /// Printed instead of an empty list; `None` prints nothing.
    pub empty_message: Option<String>,
}

/// Outcome of a run: the surviving pull requests and their display lines,
/// index-aligned.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub filtered_prs: Vec<PullRequest>,
    pub lines: Vec<String>,
}

impl QueryResult {
    /// Joins the lines for posting, falling back to `empty_message` when
    /// nothing survived.
    pub fn render(&self, empty_message: Option<&str>) -> Option<String> {
        if self.lines.is_empty() {
            return empty_message.map(str::to_string);
        }
        Some(self.lines.join("\n"))
    }
}

/// A backend that can produce the raw pull request list for a query.
#[async_trait]
pub trait Forge {
    async fn fetch_pull_requests(&self, spec: &QuerySpec) -> anyhow::Result<Vec<PullRequest>>;
}
