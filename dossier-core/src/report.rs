//! Markdown report generation.
//!
//! Renders a finished run into a standalone dossier: executive summary, fact
//! tables by category, a Mermaid relationship diagram, risks grouped by
//! severity, and the source list.

use std::io;
use std::path::{Path, PathBuf};

use crate::state::{RunState, atomic_write_text, file_slug};
use crate::types::{FactCategory, Severity};

const MAX_FACTS_PER_CATEGORY: usize = 20;
const MAX_CLAIM_CHARS: usize = 100;
const MAX_DIAGRAM_CONNECTIONS: usize = 15;
const MAX_SOURCES: usize = 30;

fn truncate_claim(claim: &str) -> String {
    if claim.chars().count() <= MAX_CLAIM_CHARS {
        claim.to_string()
    } else {
        let cut: String = claim.chars().take(MAX_CLAIM_CHARS).collect();
        format!("{cut}...")
    }
}

/// Mermaid node identifiers must be bare words.
fn mermaid_id(name: &str) -> String {
    let id: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if id.is_empty() { "UNKNOWN".into() } else { id }
}

/// Renders run state into the final markdown dossier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, state: &RunState) -> String {
        let mut out = String::new();

        out.push_str(&format!("# Dossier: {}\n\n", state.subject.name));
        out.push_str(&format!(
            "- **Subject type:** {}\n- **Run:** `{}`\n- **Status:** {}\n- **Rounds:** {}\n- **Generated:** {}\n\n",
            state.subject.kind,
            state.run_id,
            state.status,
            state.iteration,
            state.updated_at.format("%Y-%m-%d %H:%M UTC"),
        ));

        self.write_summary(&mut out, state);
        self.write_facts(&mut out, state);
        self.write_connections(&mut out, state);
        self.write_risks(&mut out, state);
        self.write_sources(&mut out, state);
        self.write_methodology(&mut out, state);

        out
    }

    /// Write the report to `<dir>/<subject>_report_<timestamp>.md`.
    pub fn save(&self, state: &RunState, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(format!(
            "{}_report_{}.md",
            file_slug(&state.subject.name),
            state.started_at.format("%Y%m%d_%H%M%S")
        ));
        atomic_write_text(&path, &self.generate(state))?;
        Ok(path)
    }

    fn write_summary(&self, out: &mut String, state: &RunState) {
        out.push_str("## Executive Summary\n\n");
        let high_risks = state
            .risks
            .iter()
            .filter(|r| r.severity == Severity::High)
            .count();
        out.push_str(&format!(
            "Research on **{}** gathered {} facts from {} distinct sources over {} rounds \
             (mean confidence {:.2}). {} related entities were discovered, {} risk indicators \
             flagged ({} high severity).\n\n",
            state.subject.name,
            state.facts.len(),
            state
                .facts
                .iter()
                .flat_map(|f| f.source_ids())
                .collect::<std::collections::BTreeSet<_>>()
                .len(),
            state.iteration,
            state.mean_confidence(),
            state.entity_queue.len(),
            state.risks.len(),
            high_risks,
        ));
        let missing = state.missing_categories();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
            out.push_str(&format!(
                "Coverage gaps remain in: {}.\n\n",
                names.join(", ")
            ));
        }
    }

    fn write_facts(&self, out: &mut String, state: &RunState) {
        out.push_str("## Findings\n\n");
        if state.facts.is_empty() {
            out.push_str("No facts were established.\n\n");
            return;
        }
        for category in FactCategory::ALL {
            let mut facts: Vec<_> = state
                .facts
                .iter()
                .filter(|f| f.category == category)
                .collect();
            if facts.is_empty() {
                continue;
            }
            facts.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            out.push_str(&format!("### {}\n\n", capitalize(category.as_str())));
            out.push_str("| Fact | Confidence | Sources |\n|---|---|---|\n");
            for fact in facts.iter().take(MAX_FACTS_PER_CATEGORY) {
                let sources: Vec<&str> = fact.source_ids().collect();
                out.push_str(&format!(
                    "| {} | {:.2} | {} |\n",
                    truncate_claim(&fact.claim).replace('|', "\\|"),
                    fact.confidence,
                    sources.join(", "),
                ));
            }
            out.push('\n');
        }
    }

    fn write_connections(&self, out: &mut String, state: &RunState) {
        if state.connections.is_empty() {
            return;
        }
        out.push_str("## Relationship Map\n\n```mermaid\ngraph TD\n");
        let subject_id = mermaid_id(&state.subject.name);
        out.push_str(&format!(
            "    {}[\"{}\"]\n",
            subject_id, state.subject.name
        ));
        for conn in state.connections.iter().take(MAX_DIAGRAM_CONNECTIONS) {
            out.push_str(&format!(
                "    {} -->|{}| {}[\"{}\"]\n",
                subject_id,
                conn.relationship_type,
                mermaid_id(&conn.target),
                conn.target,
            ));
        }
        out.push_str("```\n\n");
    }

    fn write_risks(&self, out: &mut String, state: &RunState) {
        if state.risks.is_empty() {
            return;
        }
        out.push_str("## Risk Indicators\n\n");
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            let risks: Vec<_> = state
                .risks
                .iter()
                .filter(|r| r.severity == severity)
                .collect();
            if risks.is_empty() {
                continue;
            }
            out.push_str(&format!("### {:?} severity\n\n", severity));
            for risk in risks {
                out.push_str(&format!(
                    "- **[{}]** {} (confidence {:.2})\n",
                    risk.category.as_str(),
                    truncate_claim(&risk.description),
                    risk.confidence,
                ));
            }
            out.push('\n');
        }
    }

    fn write_sources(&self, out: &mut String, state: &RunState) {
        let sources: std::collections::BTreeSet<&str> =
            state.facts.iter().flat_map(|f| f.source_ids()).collect();
        if sources.is_empty() {
            return;
        }
        out.push_str("## Sources\n\n");
        for source in sources.into_iter().take(MAX_SOURCES) {
            out.push_str(&format!("- {source}\n"));
        }
        out.push('\n');
    }

    fn write_methodology(&self, out: &mut String, state: &RunState) {
        out.push_str("## Methodology\n\n");
        out.push_str(&format!(
            "Iterative multi-round research: {} queries issued across {} rounds, with \
             cross-source confidence aggregation and second-order entity investigation. \
             {} dispatches failed and were excluded from the evidence base.\n",
            state.issued_queries.len(),
            state.iteration,
            state.failed_dispatches.len(),
        ));
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
