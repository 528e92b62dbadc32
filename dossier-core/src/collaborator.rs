//! Collaborator traits the orchestrator drives.
//!
//! The engine never talks to a model or a search API directly; it goes
//! through these seams so hosts can wire in live providers, fixtures, or
//! scripted doubles for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, PlannerError};
use crate::evaluator::Focus;
use crate::types::{
    CandidateEntity, CandidateFact, ConnectionRecord, EntityMention, Fact, Query, QueryFocus,
    RiskRecord, SourceTier, Subject,
};

/// A query proposed by the planner, before admission and deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedQuery {
    pub text: String,
    pub focus: QueryFocus,
}

/// Proposes the next round's queries from the current gaps.
///
/// The planner is advisory: proposals go through admission, which drops
/// duplicates and enforces the round budget. A failed planner yields an empty
/// round, which the evaluator turns into a halt.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        subject: &Subject,
        focus: &Focus,
        entity: Option<&CandidateEntity>,
    ) -> Result<Vec<PlannedQuery>, PlannerError>;
}

/// What one dispatched query brought back after extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Identifier of the dominant source, usually a domain.
    pub source_id: String,
    /// Tier asserted by the provider. When absent the engine classifies the
    /// source itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tier: Option<SourceTier>,
    #[serde(default)]
    pub facts: Vec<CandidateFact>,
    #[serde(default)]
    pub mentions: Vec<EntityMention>,
}

/// Executes one query and extracts candidate facts and entity mentions.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<SearchOutcome, DispatchError>;
}

/// Risks and connections derived from the accumulated facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub risks: Vec<RiskRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// Reads the accumulated facts and surfaces risks and connections. Optional;
/// a run without an analyst still produces facts and entities.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(
        &self,
        subject: &Subject,
        facts: &[Fact],
        entities: &[CandidateEntity],
    ) -> Result<AnalysisOutcome, DispatchError>;
}
