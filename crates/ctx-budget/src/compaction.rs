//! Proactive compaction gate.
//!
//! Before a turn starts, the host asks whether the session's history has
//! grown past a fraction of the context window. If so it runs a full
//! summarization pass first instead of waiting for the provider to reject an
//! overflowing request.
//!
//! The check never blocks a turn: an unreadable session, a corrupt branch,
//! or a failed estimate all mean "no compaction needed".

use crate::Message;
use crate::budget::{ContextUsage, TokenEstimator, resolve_threshold};
use crate::config::Config;
use crate::defaults::{
    DEFAULT_PROACTIVE_THRESHOLD, PROACTIVE_THRESHOLD_MAX, PROACTIVE_THRESHOLD_MIN,
};
use crate::session::SessionLog;
use std::path::Path;
use tracing::debug;

/// Estimate tokens on the active branch of the session at `session_file`.
pub async fn estimate_session_tokens(
    session_file: &Path,
    estimator: &impl TokenEstimator,
) -> Result<usize, String> {
    let log = SessionLog::open(session_file).await?;
    let messages: Vec<Message> = log.branch_messages()?;
    estimator.estimate(&messages)
}

/// Whether `estimated_tokens` exceeds `threshold` of the context window.
pub fn exceeds_threshold(
    estimated_tokens: usize,
    context_window_tokens: usize,
    threshold: f64,
) -> bool {
    estimated_tokens > resolve_threshold(context_window_tokens, threshold)
}

/// Decide whether a proactive compaction pass should run before the next
/// turn. Any failure reading or estimating the session yields `false`.
pub async fn should_run_proactive_compaction(
    session_file: &Path,
    context_window_tokens: usize,
    threshold: f64,
    estimator: &impl TokenEstimator,
) -> bool {
    match estimate_session_tokens(session_file, estimator).await {
        Ok(tokens) => {
            let usage = ContextUsage::new(tokens, context_window_tokens);
            let run = exceeds_threshold(tokens, context_window_tokens, threshold);
            debug!(
                session = %session_file.display(),
                threshold,
                run,
                "{}",
                usage.to_log_string()
            );
            run
        }
        Err(e) => {
            debug!(
                session = %session_file.display(),
                "Skipping proactive compaction check: {e}"
            );
            false
        }
    }
}

/// Threshold from `agents.defaults.compaction.proactiveThreshold`.
///
/// A configured `0` is returned as-is. Any other number must lie in
/// `[0.5, 0.95]`; everything else, including absence and non-numeric
/// values, resolves to [`DEFAULT_PROACTIVE_THRESHOLD`].
pub fn resolve_proactive_compaction_threshold(cfg: Option<&Config>) -> f64 {
    let value = cfg
        .and_then(Config::compaction)
        .and_then(|c| c.proactive_threshold.as_ref())
        .and_then(serde_json::Value::as_f64);
    match value {
        Some(v) if v == 0.0 => 0.0,
        Some(v) if (PROACTIVE_THRESHOLD_MIN..=PROACTIVE_THRESHOLD_MAX).contains(&v) => v,
        _ => DEFAULT_PROACTIVE_THRESHOLD,
    }
}
