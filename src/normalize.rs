//! String normalization shared by condition matching and the ignorability
//! heuristic.
//!
//! Both paths fold case, typographic apostrophes and surrounding whitespace
//! through [`normalize`]; label comparison additionally goes through
//! [`compact`], which strips enclosing brackets, whitespace and apostrophes
//! so that `[Don't Merge]`, `dont merge` and `DontMerge` all compare equal.

/// Lowercases, trims surrounding whitespace and turns `’` into `'`.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace('\u{2019}', "'")
}

/// Strips any number of enclosing `[`/`]` pairs, trimming in between.
pub fn strip_brackets(s: &str) -> &str {
    let mut s = s.trim();
    while let Some(inner) = s.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        s = inner.trim();
    }
    s
}

/// Normalizes, strips enclosing brackets, then drops whitespace and
/// apostrophes.
pub fn compact(s: &str) -> String {
    strip_brackets(&normalize(s))
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect()
}
