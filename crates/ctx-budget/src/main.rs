//! Inspect and prune agent session logs from the command line.
//!
//! # Examples
//!
//! ```sh
//! # Would a proactive compaction run before the next turn?
//! ctx-budget check --session ~/.agent/sessions/abc.jsonl --context-window 128000
//!
//! # Print the active branch with old tool results pruned
//! ctx-budget prune --session abc.jsonl --config agent.json > pruned.json
//!
//! # Print the config file JSON Schema
//! ctx-budget schema
//! ```
//!
//! Set `RUST_LOG=ctx_budget=debug` to see per-message pruning decisions.

use clap::{Args, Parser, Subcommand};
use ctx_budget::budget::CharEstimator;
use ctx_budget::compaction::{
    resolve_proactive_compaction_threshold, should_run_proactive_compaction,
};
use ctx_budget::config::{Config, resolve_context_window, resolve_pruning_settings};
use ctx_budget::defaults::DEFAULT_CONTEXT_WINDOW;
use ctx_budget::pruning::{PruneContext, prune_context_messages};
use ctx_budget::session::SessionLog;
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Context-window budget tools for agent session logs.
#[derive(Parser)]
#[command(name = "ctx-budget", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report whether proactive compaction should run for a session
    Check(SessionArgs),
    /// Prune the session's active branch and print it as JSON
    Prune(SessionArgs),
    /// Print the JSON Schema of the config file
    Schema,
}

#[derive(Args)]
struct SessionArgs {
    /// Path to a JSONL session log
    #[arg(long)]
    session: PathBuf,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model context window in tokens (overrides the config)
    #[arg(long)]
    context_window: Option<usize>,
}

impl SessionArgs {
    /// Load the config if one was given. A broken config is logged and
    /// treated as absent so defaults apply.
    fn load_config(&self) -> Option<Config> {
        let path = self.config.as_deref()?;
        match Config::load(path) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                warn!("Using default settings: {e}");
                None
            }
        }
    }

    fn context_window(&self, cfg: Option<&Config>) -> usize {
        self.context_window
            .unwrap_or_else(|| resolve_context_window(cfg, DEFAULT_CONTEXT_WINDOW))
    }
}

async fn check(args: &SessionArgs) -> Result<String, String> {
    let cfg = args.load_config();
    let threshold = resolve_proactive_compaction_threshold(cfg.as_ref());
    let context_window = args.context_window(cfg.as_ref());
    let should_compact = should_run_proactive_compaction(
        &args.session,
        context_window,
        threshold,
        &CharEstimator::default(),
    )
    .await;

    let out = serde_json::json!({
        "shouldCompact": should_compact,
        "threshold": threshold,
        "contextWindow": context_window,
    });
    serde_json::to_string_pretty(&out).map_err(|e| format!("Failed to serialize result: {e}"))
}

async fn prune(args: &SessionArgs) -> Result<String, String> {
    let cfg = args.load_config();
    let settings = resolve_pruning_settings(cfg.as_ref());
    let ctx = PruneContext::new(args.context_window(cfg.as_ref()));

    let log = SessionLog::open(&args.session).await?;
    let mut messages = log.branch_messages()?;
    let report = prune_context_messages(&mut messages, &settings, &ctx);
    info!(session = %args.session.display(), "{}", report.to_log_string());

    serde_json::to_string_pretty(&messages)
        .map_err(|e| format!("Failed to serialize messages: {e}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Check(args) => check(args).await,
        Command::Prune(args) => prune(args).await,
        Command::Schema => serde_json::to_string_pretty(&Config::json_schema())
            .map_err(|e| format!("Failed to serialize schema: {e}")),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
