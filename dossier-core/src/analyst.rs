//! Keyword-driven risk and connection analysis.
//!
//! Scans accumulated fact claims for risk indicators and turns discovered
//! entities into connection records. Deliberately shallow; the analyst seam
//! exists so a model-backed implementation can replace this one.

use async_trait::async_trait;

use crate::collaborator::{AnalysisOutcome, Analyst};
use crate::error::DispatchError;
use crate::types::{
    CandidateEntity, ConnectionRecord, Fact, Relationship, RiskCategory, RiskRecord, Severity,
    Subject,
};

/// Keyword tables per risk category. The first table per entry carries the
/// HIGH severity markers, the second the MEDIUM ones.
const RISK_KEYWORDS: &[(RiskCategory, &[&str], &[&str])] = &[
    (
        RiskCategory::Legal,
        &["indicted", "fraud", "charged", "subpoena"],
        &["lawsuit", "sued", "investigation", "settlement"],
    ),
    (
        RiskCategory::Financial,
        &["bankruptcy", "insolvency", "default"],
        &["debt", "fine", "penalty"],
    ),
    (
        RiskCategory::Reputational,
        &["scandal", "misconduct"],
        &["controversy", "backlash", "allegation"],
    ),
    (
        RiskCategory::Operational,
        &["shutdown", "recall"],
        &["layoffs", "failure"],
    ),
    (
        RiskCategory::Ethical,
        &["bribery", "harassment"],
        &["conflict of interest", "plagiarism"],
    ),
    (
        RiskCategory::Associational,
        &[],
        &["linked to", "ties to", "connected to", "associate of"],
    ),
];

/// Analyst matching claim text against fixed risk keyword tables.
#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyst;

impl KeywordAnalyst {
    pub fn new() -> Self {
        Self
    }

    fn risks_for(fact: &Fact) -> Vec<RiskRecord> {
        let claim = fact.claim.to_lowercase();
        let mut risks = Vec::new();
        for (category, high, medium) in RISK_KEYWORDS {
            let severity = if high.iter().any(|k| claim.contains(k)) {
                Some(Severity::High)
            } else if medium.iter().any(|k| claim.contains(k)) {
                Some(Severity::Medium)
            } else {
                None
            };
            if let Some(severity) = severity {
                risks.push(RiskRecord {
                    description: fact.claim.clone(),
                    category: *category,
                    severity,
                    // Risk confidence inherits the evidence behind the claim.
                    confidence: fact.confidence,
                });
            }
        }
        risks
    }
}

#[async_trait]
impl Analyst for KeywordAnalyst {
    async fn analyze(
        &self,
        _subject: &Subject,
        facts: &[Fact],
        entities: &[CandidateEntity],
    ) -> Result<AnalysisOutcome, DispatchError> {
        let risks = facts.iter().flat_map(Self::risks_for).collect();

        let connections = entities
            .iter()
            .filter(|e| e.relationship != Relationship::Other)
            .map(|e| ConnectionRecord {
                target: e.name.clone(),
                relationship_type: e.relationship.as_str().to_string(),
                description: e
                    .contexts
                    .first()
                    .cloned()
                    .unwrap_or_else(|| format!("{} ({})", e.name, e.relationship.as_str())),
            })
            .collect();

        Ok(AnalysisOutcome { risks, connections })
    }
}
