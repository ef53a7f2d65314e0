//! Lexical search predicate construction.
//!
//! The in-memory reference item repository has no real Postgres `tsquery`
//! to build, but it still honors the same mode dispatch and `allow_strict`
//! gate a `tsvector`-backed repository would, so the contract transfers
//! cleanly to a real backend later.

use super::models::TsQueryMode;
use crate::error::TsQueryError;

/// A parsed lexical query, ready for term-overlap matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsQuery {
    /// Normalized terms the query matches on.
    pub terms: Vec<String>,
    /// Whether this query requires terms to appear contiguously, in order.
    pub phrase: bool,
}

/// Builds a [`TsQuery`] from raw query text and a dispatch mode.
///
/// # Errors
/// Returns [`TsQueryError::StrictNotAllowed`] if `mode` is
/// [`TsQueryMode::Strict`] and `allow_strict` is `false`.
pub fn build(query_text: &str, mode: TsQueryMode, allow_strict: bool) -> Result<TsQuery, TsQueryError> {
    if mode == TsQueryMode::Strict && !allow_strict {
        return Err(TsQueryError::StrictNotAllowed);
    }
    let phrase = mode == TsQueryMode::Phrase;
    let terms = tokenize(query_text);
    Ok(TsQuery { terms, phrase })
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl TsQuery {
    /// Scores `haystack` against this query: term-overlap count for
    /// non-phrase modes, contiguous-subsequence match for phrase mode.
    /// Returns `0.0` when there is no match.
    #[must_use]
    pub fn score(&self, haystack: &str) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }
        let hay_tokens = tokenize(haystack);
        if self.phrase {
            return if contains_subsequence(&hay_tokens, &self.terms) {
                1.0
            } else {
                0.0
            };
        }
        let matched = self.terms.iter().filter(|t| hay_tokens.contains(t)).count();
        matched as f64
    }
}

fn contains_subsequence(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return needle.is_empty();
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
