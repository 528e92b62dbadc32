//! Second-order entity queue.
//!
//! Entities mentioned by extracted facts become investigation candidates.
//! Mentions of the same name merge into one candidate; priority comes from
//! the relationship weight plus a corroboration bonus when the entity shows
//! up in two or more distinct facts.

use tracing::debug;

use crate::aggregator::claim_key;
use crate::state::RunState;
use crate::types::{CandidateEntity, EntityMention, InvestigationState, Relationship};

/// Bonus applied when an entity is mentioned by two or more distinct facts.
const MULTI_MENTION_BONUS: f64 = 0.2;

fn name_key(name: &str) -> String {
    claim_key(name)
}

fn priority_for(relationship: Relationship, mention_count: usize) -> f64 {
    let mut score = relationship.weight();
    if mention_count >= 2 {
        score += MULTI_MENTION_BONUS;
    }
    // The sum can exceed 1.0; it is an ordering key, not a probability, and
    // clamping it would erase the relationship ranking among bonused entities.
    score
}

/// Register an entity mention against the queue.
///
/// `fact_keys` are the identity keys of the facts that produced this mention;
/// they feed the distinct-mention count behind the priority bonus. Mentions of
/// the run subject itself are dropped, and a repeat mention merges into the
/// existing candidate instead of creating a second one. Merging never demotes
/// a candidate that is already in progress or done.
pub fn register(mention: EntityMention, fact_keys: &[String], state: &mut RunState) {
    let key = name_key(&mention.name);
    if key.is_empty() || key == name_key(&state.subject.name) {
        return;
    }

    match state
        .entity_queue
        .iter_mut()
        .find(|e| name_key(&e.name) == key)
    {
        Some(entity) => {
            if !mention.context.trim().is_empty()
                && !entity
                    .contexts
                    .iter()
                    .any(|c| claim_key(c) == claim_key(&mention.context))
            {
                entity.contexts.push(mention.context);
            }
            // A typed relationship replaces an earlier OTHER classification.
            if entity.relationship == Relationship::Other
                && mention.relationship != Relationship::Other
            {
                entity.relationship = mention.relationship;
            }
            entity
                .mentioned_in
                .extend(fact_keys.iter().cloned().filter(|k| !k.is_empty()));
            entity.priority_score =
                priority_for(entity.relationship, entity.mentioned_in.len());
            debug!(
                entity = %entity.name,
                priority = entity.priority_score,
                mentions = entity.mentioned_in.len(),
                "entity mention merged"
            );
        }
        None => {
            let mentioned_in: std::collections::BTreeSet<String> = fact_keys
                .iter()
                .filter(|k| !k.is_empty())
                .cloned()
                .collect();
            let entity = CandidateEntity {
                name: mention.name.trim().to_string(),
                relationship: mention.relationship,
                contexts: if mention.context.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![mention.context]
                },
                priority_score: priority_for(mention.relationship, mentioned_in.len()),
                investigation_state: InvestigationState::Pending,
                discovered_order: state.entity_queue.len() as u64,
                mentioned_in,
            };
            debug!(entity = %entity.name, priority = entity.priority_score, "entity discovered");
            state.entity_queue.push(entity);
        }
    }
    state.touch();
}

/// Highest-priority pending entity without changing its state. Ties break on
/// discovery order, earliest first.
pub fn peek(state: &RunState) -> Option<&CandidateEntity> {
    state
        .entity_queue
        .iter()
        .filter(|e| e.investigation_state == InvestigationState::Pending)
        .max_by(|a, b| {
            a.priority_score
                .total_cmp(&b.priority_score)
                .then(b.discovered_order.cmp(&a.discovered_order))
        })
}

/// Pop the highest-priority pending entity for investigation, transitioning
/// it to IN_PROGRESS.
pub fn next(state: &mut RunState) -> Option<CandidateEntity> {
    let name = peek(state)?.name.clone();
    let entity = state
        .entity_queue
        .iter_mut()
        .find(|e| e.name == name)?;
    entity.investigation_state = InvestigationState::InProgress;
    let entity = entity.clone();
    state.touch();
    Some(entity)
}

/// Mark an in-progress entity as investigated.
pub fn mark_done(state: &mut RunState, name: &str) {
    let key = name_key(name);
    if let Some(entity) = state
        .entity_queue
        .iter_mut()
        .find(|e| name_key(&e.name) == key)
        && entity.investigation_state == InvestigationState::InProgress
    {
        entity.investigation_state = InvestigationState::Done;
        state.touch();
    }
}

/// Settle the queue at halt: pending entities were never reached and become
/// SKIPPED, in-progress entities already had their queries dispatched and
/// count as DONE.
pub fn finalize(state: &mut RunState) {
    for entity in &mut state.entity_queue {
        entity.investigation_state = match entity.investigation_state {
            InvestigationState::Pending => InvestigationState::Skipped,
            InvestigationState::InProgress => InvestigationState::Done,
            done_or_skipped => done_or_skipped,
        };
    }
    state.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Subject;

    fn make_state() -> RunState {
        RunState::new(Subject::individual("Sam Altman"))
    }

    fn mention(name: &str, relationship: Relationship, context: &str) -> EntityMention {
        EntityMention {
            name: name.into(),
            relationship,
            context: context.into(),
        }
    }

    #[test]
    fn test_register_new_entity() {
        let mut state = make_state();
        register(
            mention("Greg Brockman", Relationship::BusinessPartner, "co-founded OpenAI"),
            &["fact-1".into()],
            &mut state,
        );

        assert_eq!(state.entity_queue.len(), 1);
        let entity = &state.entity_queue[0];
        assert_eq!(entity.investigation_state, InvestigationState::Pending);
        assert!((entity.priority_score - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_subject_never_enqueued() {
        let mut state = make_state();
        register(
            mention("sam  ALTMAN", Relationship::BusinessPartner, "self reference"),
            &["fact-1".into()],
            &mut state,
        );
        assert!(state.entity_queue.is_empty());
    }

    #[test]
    fn test_repeat_mention_merges_and_gains_bonus() {
        let mut state = make_state();
        register(
            mention("Greg Brockman", Relationship::BusinessPartner, "co-founded OpenAI"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("greg brockman", Relationship::BusinessPartner, "served as president"),
            &["fact-2".into()],
            &mut state,
        );

        assert_eq!(state.entity_queue.len(), 1);
        let entity = &state.entity_queue[0];
        assert_eq!(entity.mentioned_in.len(), 2);
        assert_eq!(entity.contexts.len(), 2);
        // 0.9 business partner weight + 0.2 multi-mention bonus
        assert!((entity.priority_score - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_typed_relationship_replaces_other() {
        let mut state = make_state();
        register(
            mention("Jack Altman", Relationship::Other, "mentioned alongside"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("Jack Altman", Relationship::Family, "his brother"),
            &["fact-2".into()],
            &mut state,
        );

        let entity = &state.entity_queue[0];
        assert_eq!(entity.relationship, Relationship::Family);
        assert!((entity.priority_score - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_next_picks_highest_priority_and_transitions() {
        let mut state = make_state();
        register(
            mention("Acme Fund", Relationship::Investor, "invested in round"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("Jack Altman", Relationship::Family, "his brother"),
            &["fact-2".into()],
            &mut state,
        );

        let picked = next(&mut state).unwrap();
        assert_eq!(picked.name, "Jack Altman");
        assert_eq!(
            state.entity_queue[1].investigation_state,
            InvestigationState::InProgress
        );

        // Second call skips the in-progress entity
        let second = next(&mut state).unwrap();
        assert_eq!(second.name, "Acme Fund");
    }

    #[test]
    fn test_bonused_family_outranks_bonused_business_partner() {
        let mut state = make_state();
        register(
            mention("Greg Brockman", Relationship::BusinessPartner, "co-founded OpenAI"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("Greg Brockman", Relationship::BusinessPartner, "served as president"),
            &["fact-2".into()],
            &mut state,
        );
        register(
            mention("Jack Altman", Relationship::Family, "his brother"),
            &["fact-3".into()],
            &mut state,
        );
        register(
            mention("Jack Altman", Relationship::Family, "runs Lattice"),
            &["fact-4".into()],
            &mut state,
        );

        // Both carry the multi-mention bonus; the family weight still wins
        // even though the business partner was discovered first.
        assert_eq!(next(&mut state).unwrap().name, "Jack Altman");
    }

    #[test]
    fn test_priority_tie_breaks_on_discovery_order() {
        let mut state = make_state();
        register(
            mention("First Corp", Relationship::BusinessPartner, "partner"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("Second Corp", Relationship::BusinessPartner, "partner"),
            &["fact-2".into()],
            &mut state,
        );

        assert_eq!(next(&mut state).unwrap().name, "First Corp");
    }

    #[test]
    fn test_finalize_settles_states() {
        let mut state = make_state();
        register(
            mention("Jack Altman", Relationship::Family, "brother"),
            &["fact-1".into()],
            &mut state,
        );
        register(
            mention("Acme Fund", Relationship::Investor, "investor"),
            &["fact-2".into()],
            &mut state,
        );
        next(&mut state); // Jack Altman -> IN_PROGRESS

        finalize(&mut state);
        assert_eq!(
            state.entity_queue[0].investigation_state,
            InvestigationState::Done
        );
        assert_eq!(
            state.entity_queue[1].investigation_state,
            InvestigationState::Skipped
        );
    }

    #[test]
    fn test_mark_done_requires_in_progress() {
        let mut state = make_state();
        register(
            mention("Acme Fund", Relationship::Investor, "investor"),
            &["fact-1".into()],
            &mut state,
        );
        mark_done(&mut state, "Acme Fund");
        assert_eq!(
            state.entity_queue[0].investigation_state,
            InvestigationState::Pending
        );

        next(&mut state);
        mark_done(&mut state, "acme fund");
        assert_eq!(
            state.entity_queue[0].investigation_state,
            InvestigationState::Done
        );
    }
}
