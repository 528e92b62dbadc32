//! Query normalization and lifetime deduplication.
//!
//! A query is never dispatched twice in a run: admission checks membership in
//! `RunState::issued_queries` and inserts the normalized form in the same
//! step, so the check and the reservation cannot be interleaved by dispatch.

use crate::error::ResearchError;
use crate::state::RunState;
use crate::types::{Query, QueryFocus};

/// Canonicalize a raw query string: lowercase, collapse internal whitespace,
/// strip surrounding punctuation. Token order is preserved; query semantics
/// are order-sensitive for search providers.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '"');
    trimmed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pure membership test against the already-issued set.
pub fn is_duplicate(normalized: &str, state: &RunState) -> bool {
    state.issued_queries.contains(normalized)
}

/// Admit a raw query into the run: normalize, reject duplicates, and reserve
/// the normalized string in `issued_queries` atomically with the check.
///
/// Degenerate queries that normalize to the empty string are never admitted.
/// Rejection is a control signal, not a user-facing error.
pub fn admit(
    raw: &str,
    focus: QueryFocus,
    round: u32,
    state: &mut RunState,
) -> Result<Query, ResearchError> {
    let normalized = normalize(raw);
    if normalized.is_empty() || !state.issued_queries.insert(normalized.clone()) {
        return Err(ResearchError::DuplicateQuery { query: raw.into() });
    }
    state.touch();
    Ok(Query {
        text: raw.trim().to_string(),
        normalized,
        focus,
        round,
    })
}
