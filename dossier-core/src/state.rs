//! Run state: the single mutable aggregate for one research run.
//!
//! `RunState` is exclusively owned by one orchestrator instance for the
//! duration of a run; no component retains a reference across runs. The
//! serialized form is the snapshot schema contract for hosts and evaluation
//! tooling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::aggregator::claim_key;
use crate::types::{
    CandidateEntity, ConnectionRecord, Fact, FactCategory, RiskRecord, RunStatus, Subject,
};

/// A dispatch failure recorded against its query. The round proceeds with
/// whatever results succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDispatch {
    pub query: String,
    pub reason: String,
    pub round: u32,
}

/// Accumulated state for one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub subject: Subject,
    /// Completed rounds. Incremented once per round after ingestion.
    pub iteration: u32,
    /// Append-mostly; existing facts are updated in place when corroborated.
    pub facts: Vec<Fact>,
    /// Normalized query strings already dispatched. Lifetime: whole run.
    pub issued_queries: BTreeSet<String>,
    pub entity_queue: Vec<CandidateEntity>,
    pub risks: Vec<RiskRecord>,
    pub connections: Vec<ConnectionRecord>,
    pub failed_dispatches: Vec<FailedDispatch>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Create the empty state for a new run.
    pub fn new(subject: Subject) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            subject,
            iteration: 0,
            facts: Vec::new(),
            issued_queries: BTreeSet::new(),
            entity_queue: Vec::new(),
            risks: Vec::new(),
            connections: Vec::new(),
            failed_dispatches: Vec::new(),
            status: RunStatus::Running,
            started_at: now,
            updated_at: now,
        }
    }

    /// Mean confidence over all facts; 0.0 when no facts exist.
    pub fn mean_confidence(&self) -> f64 {
        if self.facts.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.facts.iter().map(|f| f.confidence).sum();
        sum / self.facts.len() as f64
    }

    /// Categories with at least one fact.
    pub fn covered_categories(&self) -> BTreeSet<FactCategory> {
        self.facts.iter().map(|f| f.category).collect()
    }

    /// Categories with no facts yet, in canonical order.
    pub fn missing_categories(&self) -> Vec<FactCategory> {
        let covered = self.covered_categories();
        FactCategory::ALL
            .into_iter()
            .filter(|c| !covered.contains(c))
            .collect()
    }

    /// Store analysis risks, deduplicated by normalized description.
    pub fn add_risks(&mut self, risks: Vec<RiskRecord>) {
        for risk in risks {
            let key = claim_key(&risk.description);
            if key.is_empty() {
                continue;
            }
            if !self.risks.iter().any(|r| claim_key(&r.description) == key) {
                self.risks.push(risk);
            }
        }
        self.touch();
    }

    /// Store analysis connections, deduplicated by normalized description.
    pub fn add_connections(&mut self, connections: Vec<ConnectionRecord>) {
        for conn in connections {
            let key = claim_key(&conn.description);
            if !self
                .connections
                .iter()
                .any(|c| claim_key(&c.description) == key)
            {
                self.connections.push(conn);
            }
        }
        self.touch();
    }

    /// Record a dispatch failure against its query.
    pub fn record_failure(&mut self, query: impl Into<String>, reason: impl Into<String>) {
        self.failed_dispatches.push(FailedDispatch {
            query: query.into(),
            reason: reason.into(),
            round: self.iteration,
        });
        self.touch();
    }

    /// Freeze the run with a terminal status. Once terminal, the status never
    /// changes again.
    pub fn freeze(&mut self, status: RunStatus) {
        if !self.status.is_terminal() {
            self.status = status;
            self.touch();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Structured snapshot of the full state plus a counts block, for hosts
    /// that persist runs.
    pub fn snapshot(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        let distinct_sources: BTreeSet<&str> =
            self.facts.iter().flat_map(|f| f.source_ids()).collect();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "counts".into(),
                serde_json::json!({
                    "total_facts": self.facts.len(),
                    "total_connections": self.connections.len(),
                    "total_risks": self.risks.len(),
                    "total_sources": distinct_sources.len(),
                    "total_queries": self.issued_queries.len(),
                    "entities_discovered": self.entity_queue.len(),
                    "failed_dispatches": self.failed_dispatches.len(),
                }),
            );
        }
        value
    }

    /// Write the snapshot to `<dir>/<subject>_state_<timestamp>.json`.
    pub fn save_snapshot(&self, dir: &Path) -> io::Result<PathBuf> {
        let filename = format!(
            "{}_state_{}.json",
            file_slug(&self.subject.name),
            self.started_at.format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(filename);
        atomic_write_json(&path, &self.snapshot())?;
        Ok(path)
    }

    /// Load a previously saved state. Accepts both the raw serialized state
    /// and the counts-annotated snapshot (extra fields are ignored).
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Lowercased filename-safe slug for a subject name.
pub(crate) fn file_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Atomically write pretty JSON: temp sibling file, then rename into place.
/// Creates parent directories as needed.
pub(crate) fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}

/// Atomically write text content, same scheme as [`atomic_write_json`].
pub(crate) fn atomic_write_text(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, content.as_bytes())?;
    std::fs::rename(&tmp, path)
}
