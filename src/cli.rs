use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::debug;

use crate::{
    condition::{Condition, ConditionField, ConditionSet},
    github::{format_user_query, repo_search_query},
    types::{DEFAULT_EMPTY_MESSAGE, PrSource, QuerySpec},
};

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Has label (prefix - to exclude, repeatable or comma-separated)
    #[arg(
        short = 'l',
        long,
        help_heading = "Filters",
        value_name = "NAME",
        value_delimiter = ','
    )]
    pub label: Vec<String>,

    /// Review requested from user or team, team as NAME or ORG/NAME (prefix - to exclude)
    #[arg(
        long,
        help_heading = "Filters",
        value_name = "LOGIN|TEAM",
        value_delimiter = ','
    )]
    pub reviewer: Vec<String>,

    /// Authored by (prefix - to exclude)
    #[arg(
        short = 'a',
        long,
        help_heading = "Filters",
        value_name = "USERNAME",
        value_delimiter = ','
    )]
    pub author: Vec<String>,

    /// Generic condition, e.g. label:bug,docs or -reviewer:org/team
    #[arg(
        short = 'c',
        long,
        help_heading = "Filters",
        value_name = "[-]FIELD:VALUES"
    )]
    pub condition: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "review-queue",
    version,
    about = "List open pull requests awaiting review, skipping drafts and blocked work, ready to paste into chat"
)]
struct CliArgs {
    /// JSON file with pull requests (array or GraphQL search response), - for stdin
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// GitHub repository to search for open pull requests
    #[arg(short = 'r', long = "repo", value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Raw GitHub search query
    #[arg(long, value_name = "SEARCH-QUERY")]
    pub query: Option<String>,

    /// JSON condition file: {"label": {"values": ["bug"], "include": true}, ...}
    #[arg(
        short = 'C',
        long,
        value_name = "FILE",
        env = "REVIEW_QUEUE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Text printed when no pull request is awaiting review
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_EMPTY_MESSAGE)]
    pub empty_message: String,

    /// Print nothing when no pull request is awaiting review
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.input.is_some() && (self.repo.is_some() || self.query.is_some()) {
            anyhow::bail!("Cannot use --input with --repo or --query (choose one source)");
        }

        if self.repo.is_some() && self.query.is_some() {
            anyhow::bail!("Cannot use --repo with --query (specify repo in query instead)");
        }

        Ok(())
    }

    fn source(&self) -> Result<PrSource> {
        if let Some(query) = &self.query {
            return Ok(PrSource::Search(format_user_query(query)));
        }

        if let Some(repo) = &self.repo {
            let query = repo_search_query(repo)
                .with_context(|| format!("Invalid repository format: '{}'", repo))?;
            return Ok(PrSource::Search(query));
        }

        Ok(PrSource::Input(
            self.input.clone().unwrap_or_else(|| PathBuf::from("-")),
        ))
    }
}

/// Builds a condition from a repeatable flag whose values carry their own
/// `-` exclusion prefix. All values of one flag must share a polarity.
fn condition_from_flag(field: ConditionField, values: &[String]) -> Result<Condition> {
    let excluded = values
        .iter()
        .filter(|value| value.trim().starts_with('-'))
        .count();

    if excluded != 0 && excluded != values.len() {
        anyhow::bail!(
            "Cannot mix included and excluded values for --{}: {}",
            field,
            values.join(",")
        );
    }

    let stripped = values
        .iter()
        .map(|value| value.trim().trim_start_matches('-').to_string());
    let condition = Condition::new(field.as_str(), stripped, excluded == 0);

    if condition.values().is_empty() {
        anyhow::bail!("--{} needs at least one value", field);
    }
    Ok(condition)
}

fn cli_to_conditions(filter_args: &FilterArgs) -> Result<ConditionSet> {
    let mut conditions = ConditionSet::new();

    for raw in &filter_args.condition {
        let condition: Condition = raw.parse()?;
        if conditions.get_by_name(condition.field()).is_some() {
            anyhow::bail!("Condition for '{}' given more than once", condition.field());
        }
        conditions.insert(condition);
    }

    let flags = [
        (ConditionField::Label, &filter_args.label),
        (ConditionField::Reviewer, &filter_args.reviewer),
        (ConditionField::Author, &filter_args.author),
    ];

    for (field, values) in flags {
        if values.is_empty() {
            continue;
        }
        if conditions.get(field).is_some() {
            anyhow::bail!("Cannot use --{} together with --condition {}:...", field, field);
        }
        conditions.insert(condition_from_flag(field, values)?);
    }

    Ok(conditions)
}

/// Reads a JSON condition file.
pub fn load_config(path: &Path) -> Result<ConditionSet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    ConditionSet::from_json(&json)
        .with_context(|| format!("Failed to load config file '{}'", path.display()))
}

fn create_query_spec(cli: CliArgs) -> Result<QuerySpec> {
    cli.validate()?;

    let mut conditions = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConditionSet::new(),
    };
    // Command-line conditions take precedence over the config file, per field.
    conditions.merge(cli_to_conditions(&cli.filters)?);

    for condition in conditions.iter() {
        debug!(
            "Condition {} {} {:?}",
            condition.field(),
            if condition.include() { "includes" } else { "excludes" },
            condition.values()
        );
    }

    Ok(QuerySpec {
        source: cli.source()?,
        conditions,
        empty_message: (!cli.quiet).then_some(cli.empty_message),
    })
}

/// Parses command-line arguments into a query specification.
///
/// Loads the optional condition file, overlays the command-line conditions
/// and resolves where pull requests are read from. Returns an error wrapping
/// the `clap::Error` for help, version and usage problems.
pub fn parse_args<I, T>(args: I) -> Result<QuerySpec>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    create_query_spec(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn flag_values_without_prefix_include() {
        let condition =
            condition_from_flag(ConditionField::Label, &strings(&["bug", "docs"])).unwrap();
        assert!(condition.include());
        assert_eq!(condition.values(), &strings(&["bug", "docs"])[..]);
    }

    #[test]
    fn flag_values_with_prefix_exclude() {
        let condition =
            condition_from_flag(ConditionField::Reviewer, &strings(&["-org/team", "-bob"]))
                .unwrap();
        assert!(!condition.include());
        assert_eq!(condition.values(), &strings(&["org/team", "bob"])[..]);
    }

    #[test]
    fn flag_values_cannot_mix_polarity() {
        let err = condition_from_flag(ConditionField::Label, &strings(&["bug", "-wip"]))
            .unwrap_err();
        assert!(err.to_string().contains("Cannot mix"));
    }

    #[test]
    fn flag_needs_a_value() {
        assert!(condition_from_flag(ConditionField::Author, &strings(&["-", " "])).is_err());
    }
}
