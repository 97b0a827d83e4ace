//! Process-wide default values.
//!
//! Everything here is a plain constant. Settings and config types reference
//! these instead of repeating literals so the defaults can't drift between
//! the pruning engine, the compaction gate, and the config layer.

// ── Proactive compaction ───────────────────────────────────────────

/// Fraction of the context window at which a proactive compaction pass runs.
pub const DEFAULT_PROACTIVE_THRESHOLD: f64 = 0.75;

/// Lowest configurable proactive threshold (inclusive).
pub const PROACTIVE_THRESHOLD_MIN: f64 = 0.5;

/// Highest configurable proactive threshold (inclusive).
pub const PROACTIVE_THRESHOLD_MAX: f64 = 0.95;

/// Context window used when neither the caller nor the config supplies one.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200_000;

// ── Context pruning ────────────────────────────────────────────────

/// Assistant turns whose preceding tool results are protected from pruning.
pub const DEFAULT_KEEP_LAST_ASSISTANTS: usize = 3;

pub const DEFAULT_SOFT_TRIM_RATIO: f64 = 0.3;
pub const DEFAULT_HARD_CLEAR_RATIO: f64 = 0.5;

/// Tool results smaller than this are never touched.
pub const DEFAULT_MIN_PRUNABLE_TOOL_CHARS: usize = 50_000;

pub const DEFAULT_SOFT_TRIM_MAX_CHARS: usize = 4_000;
pub const DEFAULT_SOFT_TRIM_HEAD_CHARS: usize = 1_500;
pub const DEFAULT_SOFT_TRIM_TAIL_CHARS: usize = 1_500;

/// Replacement text for hard-cleared tool results. Points the model at a way
/// to get the information back.
pub const DEFAULT_HARD_CLEAR_PLACEHOLDER: &str =
    "[Tool result cleared. Use memory_search to recall earlier findings or re-run the tool.]";

// ── Estimation ─────────────────────────────────────────────────────

/// Characters per token used by the default estimator.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Character cost charged for each image block (about 1200 tokens).
pub const IMAGE_CHAR_ESTIMATE: usize = 4_800;
