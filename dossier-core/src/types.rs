//! Fundamental types for the research engine.
//!
//! Everything here is part of the persisted snapshot schema: field names and
//! enum spellings are a contract with evaluation tooling, so serde renames
//! are deliberate and stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What kind of entity a research run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Individual,
    Organization,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Individual => write!(f, "individual"),
            EntityKind::Organization => write!(f, "organization"),
        }
    }
}

/// The target of a research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Entity name as given by the caller.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

impl Subject {
    pub fn individual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Individual,
        }
    }

    pub fn organization(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Organization,
        }
    }
}

/// Source quality tier used by confidence scoring.
///
/// Ordering matters: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceTier {
    Low,
    Medium,
    High,
}

/// Fixed category set for extracted facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    Biographical,
    Professional,
    Financial,
    Behavioral,
    Legal,
    Associations,
}

impl FactCategory {
    /// All categories, in gap-coverage order.
    pub const ALL: [FactCategory; 6] = [
        FactCategory::Biographical,
        FactCategory::Professional,
        FactCategory::Financial,
        FactCategory::Behavioral,
        FactCategory::Legal,
        FactCategory::Associations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Biographical => "biographical",
            FactCategory::Professional => "professional",
            FactCategory::Financial => "financial",
            FactCategory::Behavioral => "behavioral",
            FactCategory::Legal => "legal",
            FactCategory::Associations => "associations",
        }
    }
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a discovered entity relates to the run subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Family,
    BusinessPartner,
    Investor,
    Advisor,
    Employer,
    BoardMember,
    Competitor,
    Supplier,
    Other,
}

impl Relationship {
    /// Priority weight for the entity investigation queue. Family and close
    /// business relationships rank above incidental mentions.
    pub fn weight(&self) -> f64 {
        match self {
            Relationship::Family => 1.0,
            Relationship::BusinessPartner => 0.9,
            Relationship::Advisor => 0.7,
            Relationship::BoardMember => 0.7,
            Relationship::Investor => 0.6,
            Relationship::Employer => 0.5,
            Relationship::Competitor => 0.3,
            Relationship::Supplier => 0.2,
            Relationship::Other => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Family => "family",
            Relationship::BusinessPartner => "business_partner",
            Relationship::Investor => "investor",
            Relationship::Advisor => "advisor",
            Relationship::Employer => "employer",
            Relationship::BoardMember => "board_member",
            Relationship::Competitor => "competitor",
            Relationship::Supplier => "supplier",
            Relationship::Other => "other",
        }
    }
}

/// Lifecycle state of a candidate entity in the investigation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestigationState {
    Pending,
    InProgress,
    Done,
    Skipped,
}

/// Terminal and non-terminal status of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Complete,
    HaltedDepth,
    HaltedConfidence,
    HaltedNoGaps,
    HaltedNoQueries,
}

impl RunStatus {
    /// Whether this status ends the run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Complete => "COMPLETE",
            RunStatus::HaltedDepth => "HALTED_DEPTH",
            RunStatus::HaltedConfidence => "HALTED_CONFIDENCE",
            RunStatus::HaltedNoGaps => "HALTED_NO_GAPS",
            RunStatus::HaltedNoQueries => "HALTED_NO_QUERIES",
        };
        write!(f, "{s}")
    }
}

/// A single independent corroboration of a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Source identifier, normally a domain.
    pub source_id: String,
    pub source_tier: SourceTier,
    pub observed_at: DateTime<Utc>,
}

/// A deduplicated claim with accumulated corroborating observations and a
/// derived confidence.
///
/// Identity is the case/whitespace-folded claim plus category; two facts with
/// the same identity are the same fact. `confidence` is recomputed by the
/// aggregator whenever `observations` changes and is never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Original claim text, retained for display.
    pub claim: String,
    pub category: FactCategory,
    /// Every independent corroboration, append-only.
    pub observations: Vec<Observation>,
    /// Derived value in [0, 1].
    pub confidence: f64,
}

impl Fact {
    /// Distinct source identifiers observed for this fact.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.observations.iter().map(|o| o.source_id.as_str())
    }
}

/// A raw fact candidate handed to the aggregator by the search/extraction
/// collaborator. Validated at the aggregator boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFact {
    pub claim: String,
    pub category: FactCategory,
}

/// A raw second-order entity mention extracted alongside facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    pub relationship: Relationship,
    /// Free-text justification for why this entity matters.
    pub context: String,
}

/// A second-order entity awaiting or having undergone investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntity {
    pub name: String,
    #[serde(rename = "relationship_to_subject")]
    pub relationship: Relationship,
    /// Merged context strings from every mention.
    pub contexts: Vec<String>,
    /// Derived priority; recomputed on every merge.
    pub priority_score: f64,
    pub investigation_state: InvestigationState,
    /// Insertion order, used as the tie-break for equal priorities.
    pub discovered_order: u64,
    /// Identity keys of the distinct facts that mentioned this entity.
    pub mentioned_in: BTreeSet<String>,
}

/// Which gap or entity a query targets, kept for traceability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFocus {
    /// Fills coverage for a missing fact category.
    Category(FactCategory),
    /// Investigates a discovered second-order entity.
    Entity(String),
    /// General subject coverage.
    General,
}

/// An admitted search query. Transient: only the normalized string survives
/// the round, in `RunState::issued_queries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Canonical form used for lifetime deduplication.
    pub normalized: String,
    pub focus: QueryFocus,
    /// Round in which this query was issued.
    pub round: u32,
}

/// Risk category, matching the analysis collaborator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Legal,
    Financial,
    Ethical,
    Reputational,
    Operational,
    Associational,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Legal => "legal",
            RiskCategory::Financial => "financial",
            RiskCategory::Ethical => "ethical",
            RiskCategory::Reputational => "reputational",
            RiskCategory::Operational => "operational",
            RiskCategory::Associational => "associational",
        }
    }
}

/// Risk severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A risk pattern detected by the analysis collaborator. Stored verbatim,
/// deduplicated by normalized description only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRecord {
    pub description: String,
    pub category: RiskCategory,
    pub severity: Severity,
    pub confidence: f64,
}

/// A mapped relationship between the subject and another entity. Stored
/// verbatim, deduplicated by normalized description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub target: String,
    pub relationship_type: String,
    pub description: String,
}
