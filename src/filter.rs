//! The pull request filtering engine.
//!
//! A run drops ignorable pull requests (drafts, blocked, do-not-merge), keeps
//! the ones passing every configured condition, and renders the survivors as
//! numbered display lines ready to be posted.

use tracing::{debug, info};

use crate::{
    condition::{Condition, ConditionField, ConditionSet},
    normalize::{compact, normalize},
    types::PullRequest,
};

/// Title markers that make a pull request ignorable, matched as substrings
/// of the normalized title.
const IGNORABLE_TITLE_MARKERS: [&str; 5] =
    ["wip", "don't merge", "dont merge", "do not merge", "blocked"];

/// Label markers that make a pull request ignorable, matched as substrings
/// of the compacted label.
const IGNORABLE_LABEL_MARKERS: [&str; 4] = ["wip", "blocked", "dontmerge", "donotmerge"];

const NO_REVIEWER: &str = "no reviewer assigned";

/// True when the title or any label marks the pull request as work in
/// progress, blocked or not to be merged.
pub fn is_ignorable(pr: &PullRequest) -> bool {
    ignorable_reason(pr).is_some()
}

fn ignorable_reason(pr: &PullRequest) -> Option<String> {
    let title = normalize(&pr.title);
    if let Some(marker) = IGNORABLE_TITLE_MARKERS
        .iter()
        .find(|marker| title.contains(*marker))
    {
        return Some(format!("title contains '{}'", marker));
    }

    pr.label_names().find_map(|label| {
        let compacted = compact(label);
        IGNORABLE_LABEL_MARKERS
            .iter()
            .any(|marker| compacted.contains(marker))
            .then(|| format!("label '{}'", label))
    })
}

/// Renders one pull request as a numbered line. `index` is zero-based and
/// displayed one-based.
pub fn format_pull_request(pr: &PullRequest, index: usize) -> String {
    let reviewers: Vec<&str> = pr.reviewers().map(|reviewer| reviewer.id()).collect();
    let reviewer_clause = if reviewers.is_empty() {
        NO_REVIEWER.to_string()
    } else {
        format!("reviewer: {}", reviewers.join(", "))
    };

    format!(
        "{}. `{}` {} by {} ({})",
        index + 1,
        pr.title,
        pr.url,
        pr.author_login(),
        reviewer_clause
    )
}

/// Applies a [`ConditionSet`] to pull requests and formats the survivors.
#[derive(Debug, Clone, Default)]
pub struct PullRequestFilter {
    conditions: ConditionSet,
}

impl PullRequestFilter {
    pub fn new(conditions: ConditionSet) -> Self {
        Self { conditions }
    }

    fn condition(&self, field: ConditionField) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn matches_label(&self, pr: &PullRequest) -> bool {
        self.condition(ConditionField::Label)
            .is_none_or(|condition| condition.evaluate(pr.label_names(), Condition::matches))
    }

    /// Users match on login, teams on name. Teams match whether the value or
    /// the reported name is written as `org/team`.
    pub fn matches_reviewer(&self, pr: &PullRequest) -> bool {
        self.condition(ConditionField::Reviewer).is_none_or(|condition| {
            condition.evaluate(
                pr.reviewers().map(|reviewer| reviewer.id()),
                Condition::matches_unqualified,
            )
        })
    }

    pub fn matches_author(&self, pr: &PullRequest) -> bool {
        self.condition(ConditionField::Author).is_none_or(|condition| {
            condition.evaluate(std::iter::once(pr.author_login()), Condition::matches)
        })
    }

    /// True when every configured field matcher accepts the pull request.
    pub fn matches_conditions(&self, pr: &PullRequest) -> bool {
        self.rejecting_field(pr).is_none()
    }

    fn rejecting_field(&self, pr: &PullRequest) -> Option<ConditionField> {
        ConditionField::ALL.into_iter().find(|field| {
            !match field {
                ConditionField::Label => self.matches_label(pr),
                ConditionField::Reviewer => self.matches_reviewer(pr),
                ConditionField::Author => self.matches_author(pr),
            }
        })
    }

    pub fn format_pull_request(&self, pr: &PullRequest, index: usize) -> String {
        format_pull_request(pr, index)
    }

    /// Pull requests worth reporting, in their original relative order.
    pub fn filter<'a>(&self, prs: &'a [PullRequest]) -> Vec<&'a PullRequest> {
        let survivors: Vec<&PullRequest> = prs
            .iter()
            .filter(|pr| {
                if let Some(reason) = ignorable_reason(pr) {
                    debug!("Skipping {}: ignorable, {}", pr.url, reason);
                    return false;
                }
                if let Some(field) = self.rejecting_field(pr) {
                    debug!("Skipping {}: rejected by {} condition", pr.url, field);
                    return false;
                }
                true
            })
            .collect();

        info!(
            "{} of {} pull requests awaiting review",
            survivors.len(),
            prs.len()
        );
        survivors
    }

    /// Filters and formats, numbering by position among the survivors.
    pub fn report(&self, prs: &[PullRequest]) -> Vec<String> {
        self.filter(prs)
            .into_iter()
            .enumerate()
            .map(|(index, pr)| format_pull_request(pr, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reviewer;

    const PR_URL: &str = "https://github.com/ohbarye/review-waiting-list-bot/pull/34";

    fn titled(title: &str) -> PullRequest {
        PullRequest::new(title, PR_URL)
    }

    fn labelled(label: &str) -> PullRequest {
        titled("This is a PR title").with_labels([label])
    }

    fn user(login: &str) -> Reviewer {
        Reviewer::User {
            login: login.to_string(),
        }
    }

    fn team(name: &str) -> Reviewer {
        Reviewer::Team {
            name: name.to_string(),
        }
    }

    fn filter_with(condition: Condition) -> PullRequestFilter {
        PullRequestFilter::new(ConditionSet::new().with(condition))
    }

    fn reviewed_pr() -> PullRequest {
        titled("Add some tests").with_reviewers([user("ohbarye"), team("my-team")])
    }

    #[test]
    fn ignorable_titles() {
        let titles = [
            "Dont merge - this is a PR title",
            "Don't merge - this is a PR title",
            "Do not merge - this is a PR title",
            "[DO NOT MERGE] - this is a PR title",
            "WIP - this is a PR title",
            "[WIP] This is a PR title",
            "[BLOCKED] This is a PR title",
            "[blocked] This is a PR title",
            "[Don't Merge] This is a PR title",
            "Don\u{2019}t merge yet",
        ];

        for title in titles {
            assert!(is_ignorable(&titled(title)), "expected '{}' to be ignorable", title);
        }
    }

    #[test]
    fn ignorable_labels() {
        let labels = [
            "blocked",
            "BLOCKED",
            "WIP",
            "[WIP]",
            "wip",
            "donotmerge",
            "Don't Merge",
            "dont merge",
        ];

        for label in labels {
            assert!(
                is_ignorable(&labelled(label)),
                "expected label '{}' to be ignorable",
                label
            );
        }
    }

    #[test]
    fn non_ignorable_pull_requests() {
        let prs = [
            titled("This is a PR title"),
            labelled("TIP"),
            labelled("[Do Merge]"),
            labelled("[Test]"),
            titled("Merge the docs, do it now"),
        ];

        for pr in &prs {
            assert!(!is_ignorable(pr), "expected {:?} to be reportable", pr);
        }
    }

    #[test]
    fn matchers_pass_without_conditions() {
        let filter = PullRequestFilter::default();
        let pr = reviewed_pr().with_labels(["enhancement"]).with_author("ohbarye");

        assert!(filter.matches_label(&pr));
        assert!(filter.matches_reviewer(&pr));
        assert!(filter.matches_author(&pr));
        assert!(filter.matches_conditions(&titled("bare")));
    }

    #[test]
    fn matches_label_honours_polarity() {
        let pr = titled("t").with_labels(["enhancement"]);

        assert!(filter_with(Condition::new("label", ["enhancement"], true)).matches_label(&pr));
        assert!(!filter_with(Condition::new("label", ["enhancement"], false)).matches_label(&pr));
        assert!(!filter_with(Condition::new("label", ["bug"], true)).matches_label(&pr));
    }

    #[test]
    fn matches_label_on_pull_request_without_labels() {
        let pr = titled("t");

        assert!(!filter_with(Condition::new("label", ["bug"], true)).matches_label(&pr));
        assert!(filter_with(Condition::new("label", ["bug"], false)).matches_label(&pr));
    }

    #[test]
    fn matches_reviewer_by_user_login() {
        let pr = reviewed_pr();

        assert!(filter_with(Condition::new("reviewer", ["ohbarye"], true)).matches_reviewer(&pr));
        assert!(
            !filter_with(Condition::new("reviewer", ["ohbarye"], false)).matches_reviewer(&pr)
        );
        assert!(!filter_with(Condition::new("reviewer", ["butcher"], true)).matches_reviewer(&pr));
    }

    #[test]
    fn matches_reviewer_by_team_name() {
        let pr = reviewed_pr();

        assert!(filter_with(Condition::new("reviewer", ["my-team"], true)).matches_reviewer(&pr));
        assert!(
            filter_with(Condition::new("reviewer", ["org/my-team"], true)).matches_reviewer(&pr)
        );
        assert!(
            !filter_with(Condition::new("reviewer", ["org/my-team"], false)).matches_reviewer(&pr)
        );
        assert!(!filter_with(Condition::new("reviewer", ["butcher"], true)).matches_reviewer(&pr));
    }

    #[test]
    fn matches_reviewer_against_org_qualified_team() {
        let pr = titled("Add some tests").with_reviewers([team("org/my-team")]);

        assert!(filter_with(Condition::new("reviewer", ["my-team"], true)).matches_reviewer(&pr));
        assert!(
            filter_with(Condition::new("reviewer", ["org/my-team"], true)).matches_reviewer(&pr)
        );
        assert!(
            !filter_with(Condition::new("reviewer", ["org/my-team"], false)).matches_reviewer(&pr)
        );
        assert!(!filter_with(Condition::new("reviewer", ["your-team"], true)).matches_reviewer(&pr));
    }

    #[test]
    fn flipping_include_flips_every_matcher() {
        let pr = reviewed_pr().with_labels(["bug", "docs"]).with_author("alice");
        let conditions = [
            Condition::new("label", ["docs"], true),
            Condition::new("label", ["feature"], true),
            Condition::new("reviewer", ["org/my-team"], true),
            Condition::new("reviewer", ["bob"], true),
            Condition::new("author", ["alice"], true),
            Condition::new("author", ["bob"], true),
        ];

        for condition in conditions {
            let included = filter_with(condition.clone());
            let excluded = filter_with(Condition::new(
                condition.field(),
                condition.values().to_vec(),
                !condition.include(),
            ));
            assert_ne!(
                included.matches_conditions(&pr),
                excluded.matches_conditions(&pr),
                "flip had no effect for {:?}",
                condition
            );
        }
    }

    #[test]
    fn matches_author_uses_login() {
        let pr = titled("t").with_author("ohbarye");

        assert!(filter_with(Condition::new("author", ["OhBarye"], true)).matches_author(&pr));
        assert!(!filter_with(Condition::new("author", ["ohbarye"], false)).matches_author(&pr));
    }

    #[test]
    fn unknown_fields_are_never_consulted() {
        let filter = filter_with(Condition::new("milestone", ["v1"], true));
        assert!(filter.matches_conditions(&titled("anything")));
    }

    #[test]
    fn format_without_reviewers() {
        let pr = titled("Add some tests")
            .with_author("ohbarye")
            .with_reviewers(Vec::new());

        assert_eq!(
            format_pull_request(&pr, 0),
            "1. `Add some tests` https://github.com/ohbarye/review-waiting-list-bot/pull/34 by ohbarye (no reviewer assigned)"
        );
    }

    #[test]
    fn format_with_user_and_team_reviewers() {
        let pr = titled("Add some tests")
            .with_author("ohbarye")
            .with_reviewers([user("basan"), team("team-b")]);

        assert_eq!(
            format_pull_request(&pr, 0),
            "1. `Add some tests` https://github.com/ohbarye/review-waiting-list-bot/pull/34 by ohbarye (reviewer: basan, team-b)"
        );
        assert_eq!(format_pull_request(&pr, 0), format_pull_request(&pr, 0));
    }

    #[test]
    fn report_numbers_survivors_by_position() {
        let prs = vec![
            titled("[WIP] draft").with_author("a"),
            titled("Fix bug").with_author("b").with_labels(["bug"]),
            titled("Docs").with_author("c").with_labels(["docs"]),
            titled("Refactor").with_author("d").with_labels(["bug"]),
        ];
        let filter = filter_with(Condition::new("label", ["bug"], true));

        let lines = filter.report(&prs);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. `Fix bug`"));
        assert!(lines[1].starts_with("2. `Refactor`"));
    }

    #[test]
    fn report_requires_every_condition() {
        let prs = vec![
            titled("One").with_author("alice").with_labels(["bug"]),
            titled("Two").with_author("bob").with_labels(["bug"]),
            titled("Three").with_author("alice").with_labels(["docs"]),
        ];
        let filter = PullRequestFilter::new(
            ConditionSet::new()
                .with(Condition::new("label", ["bug"], true))
                .with(Condition::new("author", ["alice"], true)),
        );

        let lines = filter.report(&prs);

        assert_eq!(
            lines,
            vec![format!("1. `One` {} by alice (no reviewer assigned)", PR_URL)]
        );
    }
}
