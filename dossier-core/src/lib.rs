//! # Dossier Core
//!
//! Core library for the Dossier entity research engine.
//! Provides the research orchestrator, fact aggregation and confidence
//! scoring, query deduplication, the second-order entity queue, the stopping
//! evaluator, collaborator seams, configuration, and fundamental types.

pub mod aggregator;
pub mod analyst;
pub mod audit;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod orchestrator;
pub mod planner;
pub mod providers;
pub mod query;
pub mod queue;
pub mod report;
pub mod state;
pub mod tier;
pub mod types;

// Re-export commonly used types at the crate root.
pub use aggregator::FactAggregator;
pub use analyst::KeywordAnalyst;
pub use audit::{AuditEntry, AuditTrail};
pub use collaborator::{
    AnalysisOutcome, Analyst, PlannedQuery, Planner, SearchOutcome, SearchProvider,
};
pub use config::{ResearchConfig, ScoringPolicy, SearchProviderKind, load_config};
pub use error::{DispatchError, DossierError, PlannerError, ResearchError, Result};
pub use evaluator::{Decision, Focus, HaltReason, RoundOutcome};
pub use orchestrator::{
    NoOpCallback, Orchestrator, RecordingCallback, ResearchCallback, RunPhase,
};
pub use planner::TemplatePlanner;
pub use providers::{FixtureSearch, TavilySearch};
pub use report::ReportGenerator;
pub use state::{FailedDispatch, RunState};
pub use tier::TierClassifier;
pub use types::{
    CandidateEntity, CandidateFact, ConnectionRecord, EntityKind, EntityMention, Fact,
    FactCategory, InvestigationState, Observation, Query, QueryFocus, Relationship, RiskCategory,
    RiskRecord, RunStatus, Severity, SourceTier, Subject,
};
