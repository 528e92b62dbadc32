//! End-to-end runs of the research loop against scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use dossier_core::{
    CandidateFact, DispatchError, EntityMention, FactCategory, FixtureSearch, InvestigationState,
    KeywordAnalyst, Orchestrator, Query, RecordingCallback, Relationship, ReportGenerator,
    ResearchCallback, ResearchConfig, RunState, RunStatus, SearchOutcome, SearchProvider,
    SourceTier, Subject, TemplatePlanner,
};

fn outcome(source_id: &str, tier: SourceTier, facts: Vec<(&str, FactCategory)>) -> SearchOutcome {
    SearchOutcome {
        source_id: source_id.into(),
        source_tier: Some(tier),
        facts: facts
            .into_iter()
            .map(|(claim, category)| CandidateFact {
                claim: claim.into(),
                category,
            })
            .collect(),
        mentions: vec![],
    }
}

#[tokio::test]
async fn test_confidence_halt_on_reliable_round() {
    let mut search = FixtureSearch::new();
    search.insert(
        "Jordan Blake biography background",
        outcome(
            "wikipedia.org",
            SourceTier::High,
            vec![("Born in Ohio in 1979", FactCategory::Biographical)],
        ),
    );
    search.insert(
        "Jordan Blake career history roles",
        outcome(
            "reuters.com",
            SourceTier::High,
            vec![("CEO of Blake Industries", FactCategory::Professional)],
        ),
    );
    search.insert(
        "Jordan Blake investments funding finances",
        outcome(
            "bloomberg.com",
            SourceTier::High,
            vec![("Raised a 40M Series B", FactCategory::Financial)],
        ),
    );

    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(search),
    );
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    // Three single HIGH observations score 0.75 each; the mean clears the
    // 0.7 threshold after one round.
    assert_eq!(state.status, RunStatus::HaltedConfidence);
    assert_eq!(state.iteration, 1);
    assert_eq!(state.facts.len(), 3);
    assert_eq!(state.issued_queries.len(), 3);
    assert!(state.failed_dispatches.is_empty());
}

#[tokio::test]
async fn test_all_failures_still_terminates() {
    // No fixtures at all: every dispatch fails, and after two rounds the
    // planner has nothing new to propose.
    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(FixtureSearch::new()),
    );
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    assert_eq!(state.status, RunStatus::HaltedNoQueries);
    assert_eq!(state.iteration, 2);
    assert!(state.facts.is_empty());
    // Six category probes were admitted across the two rounds, all failed.
    assert_eq!(state.issued_queries.len(), 6);
    assert_eq!(state.failed_dispatches.len(), 6);
}

#[tokio::test]
async fn test_entity_discovery_and_investigation() {
    let mut search = FixtureSearch::new();
    let mut bio = outcome(
        "wikipedia.org",
        SourceTier::High,
        vec![("Born in Ohio in 1979", FactCategory::Biographical)],
    );
    bio.mentions.push(EntityMention {
        name: "Casey Blake".into(),
        relationship: Relationship::Family,
        context: "sibling and early business partner".into(),
    });
    search.insert("Jordan Blake biography background", bio);
    search.insert(
        "Jordan Blake career history roles",
        outcome(
            "some-blog.net",
            SourceTier::Low,
            vec![("Worked at a startup", FactCategory::Professional)],
        ),
    );
    search.insert(
        "Jordan Blake investments funding finances",
        outcome(
            "another-blog.net",
            SourceTier::Low,
            vec![("Angel investor", FactCategory::Financial)],
        ),
    );
    // Round two investigates the family member discovered in round one.
    search.insert(
        "Casey Blake Jordan Blake relationship",
        outcome(
            "forbes.com",
            SourceTier::High,
            vec![(
                "Casey Blake co-owns Blake Industries",
                FactCategory::Associations,
            )],
        ),
    );

    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(search),
    )
    .with_analyst(Arc::new(KeywordAnalyst::new()));
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    // The family mention (weight 1.0) outranks the priority bar, so round two
    // spent its entity reservation on Casey Blake.
    let casey = state
        .entity_queue
        .iter()
        .find(|e| e.name == "Casey Blake")
        .expect("entity discovered");
    assert_eq!(casey.relationship, Relationship::Family);
    assert_eq!(casey.investigation_state, InvestigationState::Done);
    assert!(
        state
            .issued_queries
            .contains("casey blake jordan blake relationship")
    );
    // The analyst mapped the entity into a connection.
    assert!(state.connections.iter().any(|c| c.target == "Casey Blake"));
    assert!(state.status.is_terminal());
}

#[tokio::test]
async fn test_report_and_audit_from_finished_run() {
    let mut search = FixtureSearch::new();
    search.insert(
        "Jordan Blake biography background",
        outcome(
            "wikipedia.org",
            SourceTier::High,
            vec![("Named in a fraud lawsuit", FactCategory::Legal)],
        ),
    );

    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(search),
    )
    .with_analyst(Arc::new(KeywordAnalyst::new()));
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    let report = ReportGenerator::new().generate(&state);
    assert!(report.contains("# Dossier: Jordan Blake"));
    assert!(report.contains("Named in a fraud lawsuit"));
    assert!(report.contains("## Risk Indicators"));

    let audit = orch.audit();
    assert!(!audit.entries().is_empty());
    assert!(audit.entries().iter().any(|e| e.phase == "halt"));

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = state.save_snapshot(dir.path()).unwrap();
    let loaded = RunState::load(&snapshot_path).unwrap();
    assert_eq!(loaded.run_id, state.run_id);
    assert_eq!(loaded.status, state.status);
}

struct CancelAfterFirstRound {
    token: CancellationToken,
}

impl ResearchCallback for CancelAfterFirstRound {
    fn on_round_complete(&self, _iteration: u32, _state: &RunState) {
        self.token.cancel();
    }
}

#[tokio::test]
async fn test_cancellation_between_rounds() {
    let mut search = FixtureSearch::new();
    search.insert(
        "Jordan Blake biography background",
        outcome(
            "some-blog.net",
            SourceTier::Low,
            vec![("Low confidence claim", FactCategory::Biographical)],
        ),
    );

    let token = CancellationToken::new();
    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(search),
    )
    .with_cancellation(token.clone())
    .with_callback(Arc::new(CancelAfterFirstRound { token }));
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    // Exactly one round ran; the cancellation was observed at the top of the
    // next loop iteration.
    assert_eq!(state.iteration, 1);
    assert!(state.status.is_terminal());
    assert_eq!(state.facts.len(), 1);
}

struct SlowSearch;

#[async_trait]
impl SearchProvider for SlowSearch {
    async fn execute(&self, _query: &Query) -> Result<SearchOutcome, DispatchError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        unreachable!("dispatch should have timed out")
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_dispatches_time_out_individually() {
    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(SlowSearch),
    );
    let state = orch.run(Subject::individual("Jordan Blake")).await;

    assert!(state.status.is_terminal());
    assert!(!state.failed_dispatches.is_empty());
    assert!(
        state
            .failed_dispatches
            .iter()
            .all(|f| f.reason.contains("timed out"))
    );
}

#[tokio::test]
async fn test_callback_sees_phases_in_order() {
    let mut search = FixtureSearch::new();
    search.insert(
        "Jordan Blake biography background",
        outcome(
            "wikipedia.org",
            SourceTier::High,
            vec![("Born in Ohio", FactCategory::Biographical)],
        ),
    );
    search.insert(
        "Jordan Blake career history roles",
        outcome(
            "reuters.com",
            SourceTier::High,
            vec![("CEO of Blake Industries", FactCategory::Professional)],
        ),
    );
    search.insert(
        "Jordan Blake investments funding finances",
        outcome(
            "bloomberg.com",
            SourceTier::High,
            vec![("Raised a Series B", FactCategory::Financial)],
        ),
    );

    let callback = Arc::new(RecordingCallback::new());
    let mut orch = Orchestrator::new(
        ResearchConfig::default(),
        Arc::new(TemplatePlanner::new()),
        Arc::new(search),
    )
    .with_callback(callback.clone());
    orch.run(Subject::individual("Jordan Blake")).await;

    let events = callback.events();
    let phases: Vec<&str> = events
        .iter()
        .filter(|e| e.starts_with("phase:"))
        .map(|e| e.as_str())
        .collect();
    assert_eq!(
        phases,
        vec![
            "phase:init",
            "phase:planning",
            "phase:dispatching",
            "phase:ingesting",
            "phase:evaluating",
            "phase:complete",
        ]
    );
    assert!(events.contains(&"halt:confidence_reached".to_string()));
}
