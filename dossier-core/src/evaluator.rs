//! Stopping evaluator.
//!
//! Decides after each round whether the run continues and where the next
//! round should look. Halt conditions are checked in a fixed order so that a
//! round satisfying several of them always reports the same reason.

use tracing::debug;

use crate::config::ResearchConfig;
use crate::queue;
use crate::state::RunState;
use crate::types::{FactCategory, InvestigationState, RunStatus};

/// What actually happened in the round just finished, as seen by the
/// evaluator.
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Queries admitted past deduplication this round.
    pub admitted_queries: usize,
    /// Queries dispatched (admitted queries that reached the provider).
    pub dispatched: usize,
    /// Dispatches that failed or timed out.
    pub failures: usize,
}

/// Why the run halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    DepthExhausted,
    ConfidenceReached,
    NoQueriesAdmitted,
    NoGapsRemaining,
}

impl HaltReason {
    pub fn status(self) -> RunStatus {
        match self {
            HaltReason::DepthExhausted => RunStatus::HaltedDepth,
            HaltReason::ConfidenceReached => RunStatus::HaltedConfidence,
            HaltReason::NoQueriesAdmitted => RunStatus::HaltedNoQueries,
            HaltReason::NoGapsRemaining => RunStatus::HaltedNoGaps,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HaltReason::DepthExhausted => "depth_exhausted",
            HaltReason::ConfidenceReached => "confidence_reached",
            HaltReason::NoQueriesAdmitted => "no_queries_admitted",
            HaltReason::NoGapsRemaining => "no_gaps_remaining",
        }
    }
}

/// Where the next round should look.
#[derive(Debug, Clone)]
pub struct Focus {
    /// Categories with no facts yet, in canonical order.
    pub missing_categories: Vec<FactCategory>,
    /// Highest-priority pending entity, if any qualifies for investigation.
    pub priority_entity: Option<String>,
    /// Queries left for category gaps after the entity reservation.
    pub gap_query_budget: usize,
}

impl Focus {
    /// Focus for the first round: everything is missing, nothing discovered.
    pub fn initial(config: &ResearchConfig) -> Self {
        Self {
            missing_categories: FactCategory::ALL.to_vec(),
            priority_entity: None,
            gap_query_budget: config.max_queries_per_iteration,
        }
    }
}

/// Continue with a focus, or halt for a reason.
#[derive(Debug, Clone)]
pub enum Decision {
    Continue(Focus),
    Halt(HaltReason),
}

fn has_pending_priority_entity(state: &RunState, config: &ResearchConfig) -> bool {
    state.entity_queue.iter().any(|e| {
        e.investigation_state == InvestigationState::Pending
            && e.priority_score > config.min_entity_priority
    })
}

/// Evaluate the run after a completed round.
///
/// Checked in order: depth, confidence, starved round, exhausted gaps. Depth
/// wins over everything; a confidence halt is blocked while a pending entity
/// above the priority bar remains uninvestigated.
pub fn evaluate(state: &RunState, config: &ResearchConfig, outcome: &RoundOutcome) -> Decision {
    if state.iteration >= config.max_depth {
        debug!(iteration = state.iteration, "halt: depth exhausted");
        return Decision::Halt(HaltReason::DepthExhausted);
    }

    let mean = state.mean_confidence();
    if mean >= config.confidence_threshold && !has_pending_priority_entity(state, config) {
        debug!(mean_confidence = mean, "halt: confidence reached");
        return Decision::Halt(HaltReason::ConfidenceReached);
    }

    if outcome.admitted_queries == 0 {
        debug!("halt: no queries admitted this round");
        return Decision::Halt(HaltReason::NoQueriesAdmitted);
    }

    let missing = state.missing_categories();
    let has_pending = state
        .entity_queue
        .iter()
        .any(|e| e.investigation_state == InvestigationState::Pending);
    if missing.is_empty() && !has_pending {
        debug!("halt: no gaps remaining");
        return Decision::Halt(HaltReason::NoGapsRemaining);
    }

    let priority_entity = queue::peek(state)
        .filter(|e| e.priority_score > config.min_entity_priority)
        .map(|e| e.name.clone());
    let gap_query_budget = if priority_entity.is_some() {
        config
            .max_queries_per_iteration
            .saturating_sub(config.queries_per_entity)
    } else {
        config.max_queries_per_iteration
    };

    Decision::Continue(Focus {
        missing_categories: missing,
        priority_entity,
        gap_query_budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CandidateEntity, Fact, FactCategory, Observation, Relationship, SourceTier, Subject,
    };
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn make_state() -> RunState {
        RunState::new(Subject::individual("Sam Altman"))
    }

    fn fact(category: FactCategory, confidence: f64) -> Fact {
        Fact {
            claim: format!("{category} claim {confidence}"),
            category,
            observations: vec![Observation {
                source_id: "reuters.com".into(),
                source_tier: SourceTier::High,
                observed_at: Utc::now(),
            }],
            confidence,
        }
    }

    fn pending_entity(name: &str, priority: f64) -> CandidateEntity {
        CandidateEntity {
            name: name.into(),
            relationship: Relationship::BusinessPartner,
            contexts: vec![],
            priority_score: priority,
            investigation_state: InvestigationState::Pending,
            discovered_order: 0,
            mentioned_in: BTreeSet::new(),
        }
    }

    fn active_outcome() -> RoundOutcome {
        RoundOutcome {
            admitted_queries: 3,
            dispatched: 3,
            failures: 0,
        }
    }

    #[test]
    fn test_depth_halt_wins_over_everything() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = config.max_depth;
        // Confidence is also satisfied; depth must still be the reason.
        for category in FactCategory::ALL {
            state.facts.push(fact(category, 0.95));
        }
        let decision = evaluate(&state, &config, &RoundOutcome::default());
        assert!(matches!(
            decision,
            Decision::Halt(HaltReason::DepthExhausted)
        ));
    }

    #[test]
    fn test_confidence_halt() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 2;
        state.facts.push(fact(FactCategory::Biographical, 0.85));
        state.facts.push(fact(FactCategory::Professional, 0.75));

        let decision = evaluate(&state, &config, &active_outcome());
        assert!(matches!(
            decision,
            Decision::Halt(HaltReason::ConfidenceReached)
        ));
    }

    #[test]
    fn test_pending_priority_entity_blocks_confidence_halt() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 2;
        state.facts.push(fact(FactCategory::Biographical, 0.95));
        state.entity_queue.push(pending_entity("Greg Brockman", 0.9));

        let decision = evaluate(&state, &config, &active_outcome());
        let Decision::Continue(focus) = decision else {
            panic!("expected continue");
        };
        assert_eq!(focus.priority_entity.as_deref(), Some("Greg Brockman"));
        assert_eq!(focus.gap_query_budget, 1);
    }

    #[test]
    fn test_low_priority_entity_does_not_block_confidence_halt() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 2;
        state.facts.push(fact(FactCategory::Biographical, 0.95));
        state.entity_queue.push(pending_entity("Minor Corp", 0.3));

        let decision = evaluate(&state, &config, &active_outcome());
        assert!(matches!(
            decision,
            Decision::Halt(HaltReason::ConfidenceReached)
        ));
    }

    #[test]
    fn test_starved_round_halts() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 1;
        state.facts.push(fact(FactCategory::Biographical, 0.45));

        let decision = evaluate(&state, &config, &RoundOutcome::default());
        assert!(matches!(
            decision,
            Decision::Halt(HaltReason::NoQueriesAdmitted)
        ));
    }

    #[test]
    fn test_no_gaps_halt() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 2;
        // Every category covered, but low confidence keeps the threshold out
        // of reach; with nothing pending the run still stops.
        for category in FactCategory::ALL {
            state.facts.push(fact(category, 0.45));
        }
        let decision = evaluate(&state, &config, &active_outcome());
        assert!(matches!(
            decision,
            Decision::Halt(HaltReason::NoGapsRemaining)
        ));
    }

    #[test]
    fn test_continue_reports_missing_categories() {
        let config = ResearchConfig::default();
        let mut state = make_state();
        state.iteration = 1;
        state.facts.push(fact(FactCategory::Biographical, 0.45));

        let decision = evaluate(&state, &config, &active_outcome());
        let Decision::Continue(focus) = decision else {
            panic!("expected continue");
        };
        assert_eq!(focus.missing_categories.len(), 5);
        assert!(focus.priority_entity.is_none());
        assert_eq!(focus.gap_query_budget, config.max_queries_per_iteration);
    }

    #[test]
    fn test_halt_reason_status_mapping() {
        assert_eq!(
            HaltReason::DepthExhausted.status(),
            RunStatus::HaltedDepth
        );
        assert_eq!(
            HaltReason::ConfidenceReached.status(),
            RunStatus::HaltedConfidence
        );
        assert_eq!(
            HaltReason::NoQueriesAdmitted.status(),
            RunStatus::HaltedNoQueries
        );
        assert_eq!(HaltReason::NoGapsRemaining.status(), RunStatus::HaltedNoGaps);
    }
}
