//! review-queue: list the pull requests that are waiting for review.
//!
//! Pull requests are read from a JSON document or a GitHub search, stripped
//! of drafts and blocked work, filtered against label, reviewer and author
//! conditions, and rendered as numbered lines ready to be posted to a chat
//! channel.

pub mod cli;
pub mod condition;
pub mod filter;
pub mod github;
pub mod input;
pub mod normalize;
pub mod query;
pub mod types;

pub use cli::{load_config, parse_args};
pub use condition::{Condition, ConditionConfig, ConditionField, ConditionSet};
pub use filter::{PullRequestFilter, format_pull_request, is_ignorable};
pub use github::GitHub;
pub use input::{JsonSource, parse_pull_requests};
pub use query::{fetch_pull_requests, filter_pull_requests};
pub use types::{
    Author, DEFAULT_EMPTY_MESSAGE, Forge, GHOST_LOGIN, Label, LabelConnection, PrSource,
    PullRequest, QueryResult, QuerySpec, ReviewRequest, ReviewRequestConnection, Reviewer,
};
