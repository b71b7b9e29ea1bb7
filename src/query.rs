use crate::{
    filter::PullRequestFilter,
    types::{Forge, PullRequest, QueryResult, QuerySpec},
};

/// Fetches pull requests from the forge and reduces them to the ones
/// awaiting review.
///
/// Ignorable pull requests and those failing any configured condition are
/// dropped; survivors keep their relative order and are numbered by their
/// position in the result.
pub async fn fetch_pull_requests<F>(request: &QuerySpec, forge: &F) -> anyhow::Result<QueryResult>
where
    F: Forge + Sync,
{
    let all_prs = forge.fetch_pull_requests(request).await?;
    Ok(filter_pull_requests(request, &all_prs))
}

/// The synchronous half of [`fetch_pull_requests`], for callers that
/// already hold the pull requests.
pub fn filter_pull_requests(request: &QuerySpec, all_prs: &[PullRequest]) -> QueryResult {
    let filter = PullRequestFilter::new(request.conditions.clone());
    let filtered_prs: Vec<_> = filter.filter(all_prs).into_iter().cloned().collect();
    let lines = filtered_prs
        .iter()
        .enumerate()
        .map(|(index, pr)| filter.format_pull_request(pr, index))
        .collect();

    QueryResult {
        filtered_prs,
        lines,
    }
}
