//! Dossier CLI — runs a research investigation from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use dossier_core::{
    FixtureSearch, KeywordAnalyst, Orchestrator, ReportGenerator, RunState, SearchProvider,
    SearchProviderKind, Subject, TavilySearch, TemplatePlanner,
};

/// Dossier: iterative multi-round entity research
#[derive(Parser, Debug)]
#[command(name = "dossier", version, about, long_about = None)]
struct Cli {
    /// Name of the entity to research
    entity: String,

    /// Entity type: individual or organization
    #[arg(short = 't', long, default_value = "individual")]
    entity_type: String,

    /// Maximum research rounds
    #[arg(short, long)]
    depth: Option<u32>,

    /// Directory for reports, audit trails, and state snapshots
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Workspace directory (for `.dossier/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Directory of search fixtures (forces the fixture provider)
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "dossier", "dossier")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "dossier.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = dossier_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(depth) = cli.depth {
        config.max_depth = depth;
    }
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(fixtures) = &cli.fixtures {
        config.search.provider = SearchProviderKind::Fixture;
        config.search.fixtures_dir = Some(fixtures.clone());
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let subject = match cli.entity_type.as_str() {
        "individual" => Subject::individual(&cli.entity),
        "organization" => Subject::organization(&cli.entity),
        other => anyhow::bail!("Unknown entity type: '{other}' (expected individual or organization)"),
    };

    let search: Arc<dyn SearchProvider> = match config.search.provider {
        SearchProviderKind::Fixture => {
            let dir = config.search.fixtures_dir.as_ref().ok_or_else(|| {
                anyhow::anyhow!("Fixture provider selected but no fixtures directory configured")
            })?;
            Arc::new(FixtureSearch::from_dir(dir)?)
        }
        SearchProviderKind::Tavily => {
            let api_key = std::env::var(&config.search.api_key_env).map_err(|_| {
                anyhow::anyhow!("Tavily provider requires {} to be set", config.search.api_key_env)
            })?;
            Arc::new(TavilySearch::new(api_key, config.search.max_results))
        }
    };

    // Ctrl-C requests a graceful stop between rounds.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current round...");
            signal_token.cancel();
        }
    });

    let output_dir = config.output_dir.clone();
    let mut orchestrator = Orchestrator::new(config, Arc::new(TemplatePlanner::new()), search)
        .with_analyst(Arc::new(KeywordAnalyst::new()))
        .with_cancellation(cancel);

    if !cli.quiet {
        println!("\n  Researching: {} ({})\n", subject.name, subject.kind);
    }

    let state = orchestrator.run(subject).await;

    let report_path = ReportGenerator::new().save(&state, &output_dir)?;
    let audit_path =
        orchestrator
            .audit()
            .save_json(&output_dir, &state.subject.name, state.started_at)?;
    orchestrator
        .audit()
        .save_summary(&output_dir, &state.subject.name, state.started_at)?;
    let snapshot_path = state.save_snapshot(&output_dir)?;

    if !cli.quiet {
        print_summary(&state);
        println!("  Report:   {}", report_path.display());
        println!("  Audit:    {}", audit_path.display());
        println!("  Snapshot: {}\n", snapshot_path.display());
    }

    Ok(())
}

fn print_summary(state: &RunState) {
    println!("  {}", "=".repeat(60));
    println!("  Run finished: {}", state.status);
    println!(
        "  Rounds: {}   Facts: {}   Mean confidence: {:.2}",
        state.iteration,
        state.facts.len(),
        state.mean_confidence()
    );
    println!(
        "  Entities: {}   Risks: {}   Connections: {}   Failed dispatches: {}",
        state.entity_queue.len(),
        state.risks.len(),
        state.connections.len(),
        state.failed_dispatches.len()
    );
    println!("  {}\n", "=".repeat(60));
}
