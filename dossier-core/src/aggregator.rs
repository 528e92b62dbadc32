//! Fact aggregation and cross-source confidence scoring.
//!
//! Merges newly observed facts into the accumulated set. Two facts with the
//! same folded claim and category are the same fact; corroboration appends
//! observations and recomputes confidence through the ordered scoring rules.

use chrono::Utc;
use tracing::debug;

use crate::config::ScoringPolicy;
use crate::error::ResearchError;
use crate::state::RunState;
use crate::types::{CandidateFact, Fact, Observation, SourceTier};

/// Identity fold for claims: lowercase with collapsed whitespace.
pub fn claim_key(claim: &str) -> String {
    claim
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merges candidate facts into run state and keeps confidence current.
#[derive(Debug, Clone)]
pub struct FactAggregator {
    policy: ScoringPolicy,
}

impl FactAggregator {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Ingest one candidate fact observed at `source_id`.
    ///
    /// Creates a new fact on first sight, otherwise appends an observation to
    /// the matching fact, unless this source already corroborated it (a
    /// single source repeating a claim does not increase confidence).
    /// Returns the fact's identity key.
    ///
    /// Candidates with an empty claim are rejected without mutating state.
    pub fn ingest(
        &self,
        candidate: CandidateFact,
        source_id: &str,
        source_tier: SourceTier,
        state: &mut RunState,
    ) -> Result<String, ResearchError> {
        let key = claim_key(&candidate.claim);
        if key.is_empty() {
            return Err(ResearchError::InvalidFact {
                reason: "empty claim".into(),
            });
        }

        let source_id = source_id.trim().to_lowercase();
        if source_id.is_empty() {
            return Err(ResearchError::InvalidFact {
                reason: format!("missing source for claim '{}'", candidate.claim),
            });
        }

        let observation = Observation {
            source_id: source_id.clone(),
            source_tier,
            observed_at: Utc::now(),
        };

        match state
            .facts
            .iter_mut()
            .find(|f| f.category == candidate.category && claim_key(&f.claim) == key)
        {
            Some(fact) => {
                if fact.observations.iter().any(|o| o.source_id == source_id) {
                    debug!(claim = %key, source = %source_id, "repeat observation from same source, ignored");
                } else {
                    fact.observations.push(observation);
                    fact.confidence = self.score(&fact.observations);
                    debug!(
                        claim = %key,
                        sources = fact.observations.len(),
                        confidence = fact.confidence,
                        "fact corroborated"
                    );
                }
            }
            None => {
                let fact = Fact {
                    claim: candidate.claim.trim().to_string(),
                    category: candidate.category,
                    confidence: self.score(std::slice::from_ref(&observation)),
                    observations: vec![observation],
                };
                debug!(claim = %key, category = %fact.category, "new fact");
                state.facts.push(fact);
            }
        }
        state.touch();
        Ok(key)
    }

    /// Ordered-rule confidence from the full observation set. First matching
    /// rule wins; independent corroboration beats raw citation count.
    pub fn score(&self, observations: &[Observation]) -> f64 {
        let count = observations.len();
        let has_high = observations
            .iter()
            .any(|o| o.source_tier == SourceTier::High);

        if count >= 3 && has_high {
            self.policy.strong_corroboration
        } else if (count >= 2 && has_high) || count >= 3 {
            self.policy.corroborated
        } else if (count == 1 && has_high) || count == 2 {
            self.policy.single_reliable
        } else if count == 1 && observations[0].source_tier == SourceTier::Medium {
            self.policy.single_medium
        } else if count == 1 {
            self.policy.single_low
        } else {
            0.0
        }
    }
}

impl Default for FactAggregator {
    fn default() -> Self {
        Self::new(ScoringPolicy::default())
    }
}
