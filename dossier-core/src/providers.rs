//! Search provider implementations.
//!
//! `FixtureSearch` replays extraction outcomes from JSON files keyed by the
//! normalized query, for offline runs and evaluation. `TavilySearch` talks to
//! the Tavily web search API and does shallow keyword extraction on the
//! results.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::collaborator::{SearchOutcome, SearchProvider};
use crate::error::DispatchError;
use crate::query;
use crate::types::{CandidateFact, FactCategory, Query};

/// One fixture file: a canned outcome for one query.
#[derive(Debug, Deserialize)]
struct Fixture {
    query: String,
    #[serde(flatten)]
    outcome: SearchOutcome,
}

/// Replay provider mapping normalized query strings to canned outcomes.
#[derive(Debug, Default)]
pub struct FixtureSearch {
    outcomes: HashMap<String, SearchOutcome>,
}

impl FixtureSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` fixture in a directory. Files that fail to parse
    /// are skipped with a warning rather than failing the whole load.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut provider = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let data = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Fixture>(&data) {
                Ok(fixture) => provider.insert(&fixture.query, fixture.outcome),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unparsable fixture"),
            }
        }
        debug!(fixtures = provider.outcomes.len(), "fixture provider loaded");
        Ok(provider)
    }

    /// Register an outcome under the query's normalized form.
    pub fn insert(&mut self, raw_query: &str, outcome: SearchOutcome) {
        self.outcomes.insert(query::normalize(raw_query), outcome);
    }
}

#[async_trait]
impl SearchProvider for FixtureSearch {
    async fn execute(&self, query: &Query) -> Result<SearchOutcome, DispatchError> {
        self.outcomes
            .get(&query.normalized)
            .cloned()
            .ok_or_else(|| DispatchError::Failed {
                query: query.text.clone(),
                message: "no fixture for query".into(),
            })
    }
}

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Guess a fact category from result text. Falls back to the query's own
/// category focus at the call site when nothing matches.
fn guess_category(text: &str) -> Option<FactCategory> {
    let text = text.to_lowercase();
    let tables: &[(FactCategory, &[&str])] = &[
        (FactCategory::Legal, &["lawsuit", "court", "legal", "sued"]),
        (
            FactCategory::Financial,
            &["funding", "investment", "revenue", "valuation"],
        ),
        (
            FactCategory::Professional,
            &["ceo", "founder", "career", "role", "company"],
        ),
        (
            FactCategory::Biographical,
            &["born", "education", "graduated", "biography"],
        ),
        (
            FactCategory::Behavioral,
            &["statement", "interview", "controversy"],
        ),
        (
            FactCategory::Associations,
            &["partner", "board", "affiliated"],
        ),
    ];
    tables
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
}

/// Web search over the Tavily HTTP API.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn execute(&self, query: &Query) -> Result<SearchOutcome, DispatchError> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query.text,
            "max_results": self.max_results,
            "include_answer": false,
        });

        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Failed {
                query: query.text.clone(),
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| DispatchError::Failed {
                query: query.text.clone(),
                message: e.to_string(),
            })?;

        let parsed: TavilyResponse =
            response.json().await.map_err(|e| DispatchError::Failed {
                query: query.text.clone(),
                message: format!("malformed response: {e}"),
            })?;

        let fallback_category = match &query.focus {
            crate::types::QueryFocus::Category(c) => *c,
            _ => FactCategory::Associations,
        };

        let mut outcome = SearchOutcome::default();
        for result in &parsed.results {
            if outcome.source_id.is_empty()
                && let Some(host) = host_of(&result.url)
            {
                outcome.source_id = host;
            }
            let snippet: String = result.content.chars().take(200).collect();
            let claim = if snippet.is_empty() {
                result.title.clone()
            } else {
                format!("{}: {}", result.title, snippet)
            };
            if claim.trim().is_empty() {
                continue;
            }
            let category = guess_category(&format!("{} {}", result.title, result.content))
                .unwrap_or(fallback_category);
            outcome.facts.push(CandidateFact { claim, category });
        }

        if outcome.source_id.is_empty() {
            return Err(DispatchError::Failed {
                query: query.text.clone(),
                message: "no usable results".into(),
            });
        }
        debug!(query = %query.normalized, facts = outcome.facts.len(), "tavily results mapped");
        Ok(outcome)
    }
}
