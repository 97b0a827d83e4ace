//! Per-turn context pruning: shrink old, bulky tool results in place.
//!
//! A pruning pass runs in two steps:
//!
//! 1. **[`eligibility`]** — walk back from the end of the transcript and
//!    protect every tool result at or after the N-th most recent assistant
//!    message. Of the rest, skip tools the [`ToolMatcher`] excludes and results
//!    below `min_prunable_tool_chars`.
//!
//! 2. **[`eviction`]** — hard-clear or soft-trim each eligible result
//!    depending on which ratio threshold its size exceeds.
//!
//! The caller decides when to prune (normally once per turn) and must hold
//! the transcript exclusively for the duration of the call. Nothing is
//! persisted; running the pass again with the same settings changes nothing.

pub mod eligibility;
pub mod eviction;
pub mod settings;

pub use eviction::Eviction;
pub use settings::{HardClearSettings, PruningSettings, SoftTrimSettings, ToolMatcher};

use crate::Message;
use tracing::{debug, info};

/// What the engine needs from the host for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneContext {
    /// The model's context window, used as the base for ratio thresholds.
    pub context_window: usize,
}

impl PruneContext {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }
}

/// Summary of one pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Tool results that passed the eligibility filter.
    pub eligible: usize,
    pub hard_cleared: usize,
    pub soft_trimmed: usize,
    /// Text chars of the rewritten messages before the pass.
    pub chars_before: usize,
    /// Text chars of the rewritten messages after the pass.
    pub chars_after: usize,
}

impl PruneReport {
    pub fn freed_chars(&self) -> usize {
        self.chars_before.saturating_sub(self.chars_after)
    }

    /// Whether any message was rewritten.
    pub fn changed(&self) -> bool {
        self.hard_cleared + self.soft_trimmed > 0
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "pruned {} of {} eligible tool results ({} cleared, {} trimmed, {} chars freed)",
            self.hard_cleared + self.soft_trimmed,
            self.eligible,
            self.hard_cleared,
            self.soft_trimmed,
            self.freed_chars(),
        )
    }
}

/// Run one pruning pass over `messages`, rewriting tool results in place.
///
/// Message order is never changed and no message is added or removed.
pub fn prune_context_messages(
    messages: &mut [Message],
    settings: &PruningSettings,
    ctx: &PruneContext,
) -> PruneReport {
    let eligible = eligibility::eligible_tool_results(messages, settings);
    let mut report = PruneReport {
        eligible: eligible.len(),
        ..Default::default()
    };

    for index in eligible {
        let Some(result) = messages[index].as_tool_result_mut() else {
            continue;
        };
        let before = result.text_len();
        let outcome = eviction::evict_tool_result(result, settings, ctx.context_window);
        match outcome {
            Eviction::HardCleared => report.hard_cleared += 1,
            Eviction::SoftTrimmed => report.soft_trimmed += 1,
            Eviction::Untouched => continue,
        }
        let after = result.text_len();
        report.chars_before += before;
        report.chars_after += after;
        debug!(
            tool = %result.tool_name,
            call_id = %result.tool_call_id,
            ?outcome,
            before,
            after,
            "Pruned tool result"
        );
    }

    if report.changed() {
        info!("{}", report.to_log_string());
    }
    report
}
