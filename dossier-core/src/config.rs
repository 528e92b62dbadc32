//! Configuration system for Dossier.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. Configuration
//! is loaded from `~/.config/dossier/config.toml` and/or
//! `.dossier/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for a research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum number of completed rounds before a forced halt.
    pub max_depth: u32,
    /// Maximum queries admitted and dispatched per round; also the bound on
    /// concurrent in-flight dispatches.
    pub max_queries_per_iteration: usize,
    /// Mean fact confidence at which research can stop early.
    pub confidence_threshold: f64,
    /// A pending entity with priority above this bar blocks a confidence
    /// halt until it has been investigated.
    pub min_entity_priority: f64,
    /// Queries reserved for the priority entity within a round's budget.
    pub queries_per_entity: usize,
    /// Per-dispatch timeout; a slow query counts as a failure for that query
    /// only.
    pub dispatch_timeout_secs: u64,
    /// Directory for reports, audit trails, and state snapshots.
    pub output_dir: PathBuf,
    /// Confidence scoring policy. The default thresholds are tuned policy,
    /// not invariants.
    pub scoring: ScoringPolicy,
    /// Extra domains layered on top of the built-in source tier tables.
    pub tiers: TierOverrides,
    /// Search collaborator selection for the CLI host.
    pub search: SearchConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_queries_per_iteration: 3,
            confidence_threshold: 0.7,
            min_entity_priority: 0.5,
            queries_per_entity: 2,
            dispatch_timeout_secs: 30,
            output_dir: PathBuf::from("reports"),
            scoring: ScoringPolicy::default(),
            tiers: TierOverrides::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Validate ranges. Called once after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                message: "max_depth must be at least 1".into(),
            });
        }
        if self.max_queries_per_iteration == 0 {
            return Err(ConfigError::Invalid {
                message: "max_queries_per_iteration must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "confidence_threshold must be in [0, 1], got {}",
                    self.confidence_threshold
                ),
            });
        }
        self.scoring.validate()
    }
}

/// Ordered-rule confidence thresholds (see the fact aggregator).
///
/// Evaluated top to bottom; the first matching rule wins. Rewards independent
/// corroboration over raw citation count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// 3+ observations, at least one HIGH tier.
    pub strong_corroboration: f64,
    /// 2+ observations with a HIGH tier, or 3+ of any tier.
    pub corroborated: f64,
    /// A single HIGH observation, or two MEDIUM/LOW observations.
    pub single_reliable: f64,
    /// A single MEDIUM observation.
    pub single_medium: f64,
    /// A single LOW observation.
    pub single_low: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            strong_corroboration: 0.95,
            corroborated: 0.85,
            single_reliable: 0.75,
            single_medium: 0.6,
            single_low: 0.45,
        }
    }
}

impl ScoringPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        let steps = [
            self.strong_corroboration,
            self.corroborated,
            self.single_reliable,
            self.single_medium,
            self.single_low,
        ];
        if steps.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(ConfigError::Invalid {
                message: "scoring thresholds must be in [0, 1]".into(),
            });
        }
        if steps.windows(2).any(|w| w[0] < w[1]) {
            return Err(ConfigError::Invalid {
                message: "scoring thresholds must be non-increasing".into(),
            });
        }
        Ok(())
    }
}

/// Extra source domains merged into the built-in tier tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierOverrides {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
}

/// Which search/extraction collaborator the CLI host wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchProviderKind {
    /// Replay provider reading extraction outcomes from JSON fixtures.
    Fixture,
    /// Tavily web search over HTTP.
    Tavily,
}

/// Search collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub provider: SearchProviderKind,
    /// Directory of fixture files for the replay provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures_dir: Option<PathBuf>,
    /// Results requested per query from the web provider.
    pub max_results: usize,
    /// Environment variable holding the Tavily API key.
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::Fixture,
            fixtures_dir: None,
            max_results: 5,
            api_key_env: "TAVILY_API_KEY".into(),
        }
    }
}

/// Load configuration with figment layering.
///
/// Order (later wins): defaults, user-level config, workspace-level config,
/// `DOSSIER_`-prefixed environment variables (`__` as section separator),
/// explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ResearchConfig>,
) -> Result<ResearchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ResearchConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "dossier", "dossier") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".dossier").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("DOSSIER_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
