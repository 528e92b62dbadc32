//! The research orchestrator: the control loop driving a full run.
//!
//! One orchestrator owns one `RunState` for the duration of a run and is the
//! only writer. Each round moves through planning, admission, bounded
//! parallel dispatch, sequential ingestion, and evaluation; the loop exits
//! when the evaluator halts the run or cancellation is observed between
//! rounds.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::FactAggregator;
use crate::audit::AuditTrail;
use crate::collaborator::{Analyst, Planner, SearchOutcome, SearchProvider};
use crate::config::ResearchConfig;
use crate::error::DispatchError;
use crate::evaluator::{self, Decision, Focus, HaltReason, RoundOutcome};
use crate::query;
use crate::queue;
use crate::state::RunState;
use crate::tier::TierClassifier;
use crate::types::{Query, Subject};

/// Engine phase, reported through the callback seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Planning,
    Dispatching,
    Ingesting,
    Evaluating,
    Complete,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Init => "init",
            RunPhase::Planning => "planning",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Ingesting => "ingesting",
            RunPhase::Evaluating => "evaluating",
            RunPhase::Complete => "complete",
        }
    }
}

/// Observer for run progress. All methods have no-op defaults so hosts
/// implement only what they care about.
pub trait ResearchCallback: Send + Sync {
    fn on_phase_change(&self, _phase: RunPhase) {}
    fn on_query_admitted(&self, _query: &Query) {}
    fn on_round_complete(&self, _iteration: u32, _state: &RunState) {}
    fn on_halt(&self, _reason: HaltReason) {}
}

/// Callback that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl ResearchCallback for NoOpCallback {}

/// Callback that records events as strings, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("callback lock poisoned").clone()
    }

    fn push(&self, event: String) {
        self.events.lock().expect("callback lock poisoned").push(event);
    }
}

impl ResearchCallback for RecordingCallback {
    fn on_phase_change(&self, phase: RunPhase) {
        self.push(format!("phase:{}", phase.as_str()));
    }

    fn on_query_admitted(&self, query: &Query) {
        self.push(format!("query:{}", query.normalized));
    }

    fn on_round_complete(&self, iteration: u32, state: &RunState) {
        self.push(format!("round:{iteration}:facts={}", state.facts.len()));
    }

    fn on_halt(&self, reason: HaltReason) {
        self.push(format!("halt:{}", reason.as_str()));
    }
}

/// Drives one research run end to end.
pub struct Orchestrator {
    config: ResearchConfig,
    planner: Arc<dyn Planner>,
    search: Arc<dyn SearchProvider>,
    analyst: Option<Arc<dyn Analyst>>,
    callback: Arc<dyn ResearchCallback>,
    cancel: CancellationToken,
    tiers: TierClassifier,
    aggregator: FactAggregator,
    audit: AuditTrail,
}

impl Orchestrator {
    pub fn new(
        config: ResearchConfig,
        planner: Arc<dyn Planner>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let tiers = TierClassifier::with_overrides(&config.tiers);
        let aggregator = FactAggregator::new(config.scoring.clone());
        Self {
            config,
            planner,
            search,
            analyst: None,
            callback: Arc::new(NoOpCallback),
            cancel: CancellationToken::new(),
            tiers,
            aggregator,
            audit: AuditTrail::new(),
        }
    }

    pub fn with_analyst(mut self, analyst: Arc<dyn Analyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Audit trail accumulated by the last run.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Run the full research loop for a subject. Always returns a state with
    /// a terminal status and a settled entity queue.
    pub async fn run(&mut self, subject: Subject) -> RunState {
        let mut state = RunState::new(subject);
        let mut focus = Focus::initial(&self.config);

        info!(subject = %state.subject.name, run_id = %state.run_id, "research run started");
        self.callback.on_phase_change(RunPhase::Init);
        self.audit.record(
            "init",
            0,
            serde_json::json!({
                "subject": state.subject.name,
                "run_id": state.run_id,
                "max_depth": self.config.max_depth,
            }),
        );

        loop {
            // Cancellation is observed between rounds only; in-flight work in
            // the current round always completes or times out.
            if self.cancel.is_cancelled() {
                self.halt_cancelled(&mut state);
                break;
            }

            let outcome = self.execute_round(&mut state, &focus).await;

            self.callback.on_phase_change(RunPhase::Evaluating);
            match evaluator::evaluate(&state, &self.config, &outcome) {
                Decision::Continue(next_focus) => {
                    self.audit.record(
                        "evaluating",
                        state.iteration,
                        serde_json::json!({
                            "decision": "continue",
                            "mean_confidence": state.mean_confidence(),
                            "missing_categories": next_focus.missing_categories.len(),
                            "priority_entity": next_focus.priority_entity,
                        }),
                    );
                    focus = next_focus;
                }
                Decision::Halt(reason) => {
                    self.halt(&mut state, reason);
                    break;
                }
            }
        }

        info!(
            run_id = %state.run_id,
            status = %state.status,
            facts = state.facts.len(),
            rounds = state.iteration,
            "research run finished"
        );
        state
    }

    /// One round: plan, admit, dispatch, ingest. Rounds that admit nothing do
    /// not advance the iteration counter.
    async fn execute_round(&mut self, state: &mut RunState, focus: &Focus) -> RoundOutcome {
        self.callback.on_phase_change(RunPhase::Planning);

        let entity = match &focus.priority_entity {
            Some(_) => queue::next(state),
            None => None,
        };

        let planned = match self
            .planner
            .plan(&state.subject, focus, entity.as_ref())
            .await
        {
            Ok(planned) => planned,
            Err(e) => {
                // A failed planner collapses to the zero-queries case; the
                // evaluator turns that into a halt.
                warn!(error = %e, "planner unavailable");
                self.audit.record(
                    "planning",
                    state.iteration,
                    serde_json::json!({"error": e.to_string()}),
                );
                Vec::new()
            }
        };

        let proposed = planned.len();
        let mut admitted: Vec<Query> = Vec::new();
        for pq in planned {
            if admitted.len() >= self.config.max_queries_per_iteration {
                break;
            }
            match query::admit(&pq.text, pq.focus, state.iteration, state) {
                Ok(q) => {
                    self.callback.on_query_admitted(&q);
                    admitted.push(q);
                }
                Err(e) => debug!(query = %pq.text, reason = %e, "query rejected"),
            }
        }
        self.audit.record(
            "planning",
            state.iteration,
            serde_json::json!({
                "proposed": proposed,
                "admitted": admitted.len(),
                "entity": entity.as_ref().map(|e| e.name.clone()),
            }),
        );

        let mut outcome = RoundOutcome {
            admitted_queries: admitted.len(),
            dispatched: 0,
            failures: 0,
        };
        if admitted.is_empty() {
            return outcome;
        }

        self.callback.on_phase_change(RunPhase::Dispatching);
        let results = self.dispatch(&admitted).await;
        outcome.dispatched = results.len();

        // Cancellation during dispatch: results are already complete, but the
        // round is abandoned and nothing is ingested.
        if self.cancel.is_cancelled() {
            self.audit.record(
                "dispatching",
                state.iteration,
                serde_json::json!({"discarded": results.len(), "reason": "cancelled"}),
            );
            return outcome;
        }

        self.callback.on_phase_change(RunPhase::Ingesting);
        self.ingest(state, results, &mut outcome);
        state.iteration += 1;

        if let Some(entity) = &entity {
            queue::mark_done(state, &entity.name);
        }

        if let Some(analyst) = &self.analyst {
            match analyst
                .analyze(&state.subject, &state.facts, &state.entity_queue)
                .await
            {
                Ok(analysis) => {
                    self.audit.record(
                        "analysis",
                        state.iteration,
                        serde_json::json!({
                            "risks": analysis.risks.len(),
                            "connections": analysis.connections.len(),
                        }),
                    );
                    state.add_risks(analysis.risks);
                    state.add_connections(analysis.connections);
                }
                Err(e) => {
                    warn!(error = %e, "analysis failed, round proceeds without it");
                    self.audit.record(
                        "analysis",
                        state.iteration,
                        serde_json::json!({"error": e.to_string()}),
                    );
                }
            }
        }

        self.callback.on_round_complete(state.iteration, state);
        outcome
    }

    /// Dispatch admitted queries with bounded parallelism and a per-dispatch
    /// timeout. Order of completion is irrelevant; ingestion is sequential.
    async fn dispatch(
        &self,
        admitted: &[Query],
    ) -> Vec<(Query, Result<SearchOutcome, DispatchError>)> {
        let timeout = Duration::from_secs(self.config.dispatch_timeout_secs);
        stream::iter(admitted.iter().cloned())
            .map(|q| {
                let search = Arc::clone(&self.search);
                async move {
                    let result = match tokio::time::timeout(timeout, search.execute(&q)).await {
                        Ok(result) => result,
                        Err(_) => Err(DispatchError::Timeout {
                            query: q.text.clone(),
                            timeout_secs: timeout.as_secs(),
                        }),
                    };
                    (q, result)
                }
            })
            .buffer_unordered(self.config.max_queries_per_iteration)
            .collect()
            .await
    }

    /// Sequentially fold dispatch results into state. The orchestrator is the
    /// single writer; no aggregation happens concurrently.
    fn ingest(
        &mut self,
        state: &mut RunState,
        results: Vec<(Query, Result<SearchOutcome, DispatchError>)>,
        outcome: &mut RoundOutcome,
    ) {
        for (query, result) in results {
            match result {
                Ok(search_outcome) => {
                    let tier = search_outcome
                        .source_tier
                        .unwrap_or_else(|| self.tiers.classify(&search_outcome.source_id));
                    let mut fact_keys: Vec<String> = Vec::new();
                    for candidate in search_outcome.facts {
                        match self.aggregator.ingest(
                            candidate,
                            &search_outcome.source_id,
                            tier,
                            state,
                        ) {
                            Ok(key) => fact_keys.push(key),
                            Err(e) => {
                                debug!(query = %query.normalized, reason = %e, "candidate rejected")
                            }
                        }
                    }
                    for mention in search_outcome.mentions {
                        // Link the mention to the facts that name the entity;
                        // fall back to a source marker so distinct sources
                        // still count toward the multi-mention bonus.
                        let name = mention.name.to_lowercase();
                        let mut keys: Vec<String> = fact_keys
                            .iter()
                            .filter(|k| k.contains(&name))
                            .cloned()
                            .collect();
                        if keys.is_empty() {
                            keys.push(format!("source:{}", search_outcome.source_id));
                        }
                        queue::register(mention, &keys, state);
                    }
                    self.audit.record(
                        "ingesting",
                        state.iteration,
                        serde_json::json!({
                            "query": query.normalized,
                            "source": search_outcome.source_id,
                            "facts_ingested": fact_keys.len(),
                        }),
                    );
                }
                Err(e) => {
                    warn!(query = %query.normalized, error = %e, "dispatch failed");
                    outcome.failures += 1;
                    state.record_failure(e.query(), e.to_string());
                    self.audit.record(
                        "ingesting",
                        state.iteration,
                        serde_json::json!({
                            "query": query.normalized,
                            "error": e.to_string(),
                        }),
                    );
                }
            }
        }
    }

    fn halt(&mut self, state: &mut RunState, reason: HaltReason) {
        self.audit.record(
            "halt",
            state.iteration,
            serde_json::json!({
                "reason": reason.as_str(),
                "mean_confidence": state.mean_confidence(),
                "facts": state.facts.len(),
            }),
        );
        state.freeze(reason.status());
        queue::finalize(state);
        self.callback.on_halt(reason);
        self.callback.on_phase_change(RunPhase::Complete);
    }

    fn halt_cancelled(&mut self, state: &mut RunState) {
        self.audit.record(
            "halt",
            state.iteration,
            serde_json::json!({"reason": "cancelled"}),
        );
        state.freeze(crate::types::RunStatus::HaltedDepth);
        queue::finalize(state);
        self.callback.on_phase_change(RunPhase::Complete);
    }
}
