//! Audit trail for research runs.
//!
//! Every phase transition and notable event lands here as a structured entry,
//! giving a replayable record of what the engine did and why. Saved alongside
//! the report as raw JSON plus a human-readable markdown summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::state::{atomic_write_json, atomic_write_text, file_slug};

/// One audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Engine phase that produced the entry, e.g. `planning` or `halt`.
    pub phase: String,
    /// Round number at the time of the event.
    pub iteration: u32,
    pub recorded_at: DateTime<Utc>,
    /// Structured event payload.
    pub data: serde_json::Value,
}

/// Append-only log of engine decisions for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: &str, iteration: u32, data: serde_json::Value) {
        self.entries.push(AuditEntry {
            phase: phase.to_string(),
            iteration,
            recorded_at: Utc::now(),
            data,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Markdown summary with entries grouped by phase, in first-seen order.
    pub fn summary_markdown(&self, subject: &str) -> String {
        let mut by_phase: BTreeMap<&str, Vec<&AuditEntry>> = BTreeMap::new();
        let mut phase_order: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !by_phase.contains_key(entry.phase.as_str()) {
                phase_order.push(entry.phase.as_str());
            }
            by_phase.entry(entry.phase.as_str()).or_default().push(entry);
        }

        let mut out = String::new();
        out.push_str(&format!("# Audit Summary: {subject}\n\n"));
        out.push_str(&format!("Total events: {}\n\n", self.entries.len()));
        for phase in phase_order {
            let entries = &by_phase[phase];
            out.push_str(&format!("## {} ({} events)\n\n", phase, entries.len()));
            for entry in entries {
                out.push_str(&format!(
                    "- round {} at {}: {}\n",
                    entry.iteration,
                    entry.recorded_at.format("%H:%M:%S"),
                    serde_json::to_string(&entry.data).unwrap_or_default()
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Write the raw entries to `<dir>/<subject>_audit_<timestamp>.json`.
    pub fn save_json(
        &self,
        dir: &Path,
        subject: &str,
        started_at: DateTime<Utc>,
    ) -> io::Result<PathBuf> {
        let path = dir.join(format!(
            "{}_audit_{}.json",
            file_slug(subject),
            started_at.format("%Y%m%d_%H%M%S")
        ));
        atomic_write_json(&path, &self.entries)?;
        Ok(path)
    }

    /// Write the markdown summary next to the raw log.
    pub fn save_summary(
        &self,
        dir: &Path,
        subject: &str,
        started_at: DateTime<Utc>,
    ) -> io::Result<PathBuf> {
        let path = dir.join(format!(
            "{}_audit_summary_{}.md",
            file_slug(subject),
            started_at.format("%Y%m%d_%H%M%S")
        ));
        atomic_write_text(&path, &self.summary_markdown(subject))?;
        Ok(path)
    }
}
