//! Source tier classification.
//!
//! Maps a source identifier (domain) to a quality tier for confidence
//! scoring. The table is immutable after load and safe for unsynchronized
//! concurrent reads.

use crate::config::TierOverrides;
use crate::types::SourceTier;

/// Government and education domains plus top-tier outlets.
const HIGH_QUALITY: &[&str] = &[
    "wikipedia.org",
    "reuters.com",
    "bloomberg.com",
    "wsj.com",
    "nytimes.com",
    "bbc.com",
    "forbes.com",
    ".gov",
    ".edu",
];

/// Reputable trade and business outlets.
const MEDIUM_QUALITY: &[&str] = &[
    "techcrunch.com",
    "theverge.com",
    "wired.com",
    "fortune.com",
    "businessinsider.com",
    "cnbc.com",
];

/// Classifies source domains into HIGH/MEDIUM/LOW tiers.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    high: Vec<String>,
    medium: Vec<String>,
}

impl TierClassifier {
    /// Classifier with the built-in tables only.
    pub fn new() -> Self {
        Self::with_overrides(&TierOverrides::default())
    }

    /// Classifier with extra domains layered on top of the built-in tables.
    pub fn with_overrides(overrides: &TierOverrides) -> Self {
        let mut high: Vec<String> = HIGH_QUALITY.iter().map(|s| s.to_string()).collect();
        high.extend(overrides.high.iter().map(|s| s.to_lowercase()));
        let mut medium: Vec<String> = MEDIUM_QUALITY.iter().map(|s| s.to_string()).collect();
        medium.extend(overrides.medium.iter().map(|s| s.to_lowercase()));
        Self { high, medium }
    }

    /// Classify a source identifier. Everything not matched by the HIGH or
    /// MEDIUM tables is LOW.
    pub fn classify(&self, source_id: &str) -> SourceTier {
        let id = source_id.to_lowercase();
        if self.high.iter().any(|d| id.contains(d.as_str())) {
            return SourceTier::High;
        }
        if self.medium.iter().any(|d| id.contains(d.as_str())) {
            return SourceTier::Medium;
        }
        SourceTier::Low
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new()
    }
}
