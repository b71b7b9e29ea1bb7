use std::{collections::BTreeMap, str::FromStr};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::normalize::normalize;

/// Fields the filter knows how to match a pull request on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionField {
    Label,
    Reviewer,
    Author,
}

impl ConditionField {
    pub const ALL: [ConditionField; 3] = [
        ConditionField::Label,
        ConditionField::Reviewer,
        ConditionField::Author,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionField::Label => "label",
            ConditionField::Reviewer => "reviewer",
            ConditionField::Author => "author",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == name.trim())
    }
}

impl std::fmt::Display for ConditionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inclusion or exclusion rule over a pull request field.
///
/// With `include` set, a pull request must match at least one value to
/// pass. Without it, matching any value rejects the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    field: String,
    values: Vec<String>,
    include: bool,
}

impl Condition {
    /// Builds a condition, dropping blank and duplicate values while keeping
    /// first-seen order.
    pub fn new<I, S>(field: impl Into<String>, values: I, include: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for value in values {
            let value = value.into().trim().to_string();
            if value.is_empty() || deduped.iter().any(|v| normalize(v) == normalize(&value)) {
                continue;
            }
            deduped.push(value);
        }

        Self {
            field: field.into().trim().to_string(),
            values: deduped,
            include,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn include(&self) -> bool {
        self.include
    }

    /// True when `candidate` equals one of the values, ignoring case and
    /// surrounding whitespace.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = normalize(candidate);
        self.values.iter().any(|value| normalize(value) == candidate)
    }

    /// Like [`Condition::matches`], but either side may be qualified as
    /// `org/name`: a value also matches when both unqualified names agree.
    pub fn matches_unqualified(&self, candidate: &str) -> bool {
        let full = normalize(candidate);
        let bare = normalize(unqualified(candidate));
        self.values.iter().any(|value| {
            normalize(value) == full || normalize(unqualified(value)) == bare
        })
    }

    /// Applies the condition's polarity to a set of candidates, using
    /// `is_match` to test each one.
    pub fn evaluate<'a, I, F>(&self, candidates: I, is_match: F) -> bool
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(&Self, &str) -> bool,
    {
        let any = candidates
            .into_iter()
            .any(|candidate| is_match(self, candidate));
        if self.include { any } else { !any }
    }
}

fn unqualified(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

impl FromStr for Condition {
    type Err = anyhow::Error;

    /// Parses `field:v1,v2` as an inclusion and `-field:v1,v2` as an
    /// exclusion.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (include, rest) = match s.strip_prefix('-') {
            Some(rest) => (false, rest),
            None => (true, s),
        };

        let Some((field, values)) = rest.split_once(':') else {
            anyhow::bail!(
                "Invalid condition '{}': expected FIELD:VALUE[,VALUE...] (prefix - to exclude)",
                s
            );
        };

        if field.trim().is_empty() {
            anyhow::bail!("Invalid condition '{}': field name is empty", s);
        }

        let condition = Condition::new(field, values.split(','), include);
        if condition.values.is_empty() {
            anyhow::bail!("Invalid condition '{}': no values given", s);
        }
        Ok(condition)
    }
}

/// One entry of the condition configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionConfig {
    pub values: Vec<String>,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

/// At most one condition per field. Fields without a condition impose no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    conditions: BTreeMap<String, Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from the `field -> { values, include }` configuration
    /// contract. Unknown fields are kept but never consulted.
    pub fn from_config(config: BTreeMap<String, ConditionConfig>) -> Self {
        let mut set = Self::new();
        for (field, entry) in config {
            set.insert(Condition::new(field, entry.values, entry.include));
        }
        set
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BTreeMap<String, ConditionConfig> =
            serde_json::from_str(json).context("Invalid condition configuration")?;
        Ok(Self::from_config(config))
    }

    /// Adds a condition, replacing any existing one for the same field.
    pub fn insert(&mut self, condition: Condition) -> Option<Condition> {
        if ConditionField::from_name(condition.field()).is_none() {
            warn!(
                "Ignoring condition on unknown field '{}' (known: label, reviewer, author)",
                condition.field()
            );
        }
        self.conditions
            .insert(condition.field().to_string(), condition)
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.insert(condition);
        self
    }

    /// Overlays `other` on top of `self`, field by field.
    pub fn merge(&mut self, other: ConditionSet) {
        for (_, condition) in other.conditions {
            self.insert(condition);
        }
    }

    pub fn get(&self, field: ConditionField) -> Option<&Condition> {
        self.conditions.get(field.as_str())
    }

    pub fn get_by_name(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }
}
