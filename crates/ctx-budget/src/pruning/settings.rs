//! Pruning settings: recency window, ratio thresholds, tier parameters, and
//! which tools are prunable at all.

use crate::defaults::{
    DEFAULT_HARD_CLEAR_PLACEHOLDER, DEFAULT_HARD_CLEAR_RATIO, DEFAULT_KEEP_LAST_ASSISTANTS,
    DEFAULT_MIN_PRUNABLE_TOOL_CHARS, DEFAULT_SOFT_TRIM_HEAD_CHARS, DEFAULT_SOFT_TRIM_MAX_CHARS,
    DEFAULT_SOFT_TRIM_RATIO, DEFAULT_SOFT_TRIM_TAIL_CHARS,
};
use glob::Pattern;

/// How much of an oversized tool result survives a soft trim.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftTrimSettings {
    /// Results at or below this many chars are never soft-trimmed.
    pub max_chars: usize,
    /// Chars kept from the start.
    pub head_chars: usize,
    /// Chars kept from the end.
    pub tail_chars: usize,
}

impl Default for SoftTrimSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_SOFT_TRIM_MAX_CHARS,
            head_chars: DEFAULT_SOFT_TRIM_HEAD_CHARS,
            tail_chars: DEFAULT_SOFT_TRIM_TAIL_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HardClearSettings {
    pub enabled: bool,
    /// Rendered as `[<tool name>: <placeholder>]`.
    pub placeholder: String,
}

impl Default for HardClearSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder: DEFAULT_HARD_CLEAR_PLACEHOLDER.to_string(),
        }
    }
}

/// Allow/deny glob lists over tool names. Matching is case-insensitive.
///
/// Deny wins over allow. An empty allow list allows every tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolMatcher {
    allow: Vec<Pattern>,
    deny: Vec<Pattern>,
}

fn compile(pattern: &str) -> Result<Pattern, String> {
    Pattern::new(&pattern.trim().to_lowercase())
        .map_err(|e| format!("Invalid tool pattern '{pattern}': {e}"))
}

impl ToolMatcher {
    /// Compile allow and deny lists. Fails on the first malformed pattern.
    pub fn new<S: AsRef<str>>(allow: &[S], deny: &[S]) -> Result<Self, String> {
        Ok(Self {
            allow: allow
                .iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<_, _>>()?,
            deny: deny
                .iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn is_prunable(&self, tool_name: &str) -> bool {
        let name = tool_name.trim().to_lowercase();
        if self.deny.iter().any(|p| p.matches(&name)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|p| p.matches(&name))
    }
}

/// Settings for one pruning pass.
///
/// Ratios are multiplied by the context window through
/// [`resolve_threshold`](crate::budget::resolve_threshold) and compared
/// against a tool result's character count.
#[derive(Debug, Clone, PartialEq)]
pub struct PruningSettings {
    /// Tool results at or after the N-th most recent assistant message are
    /// protected. `0` protects nothing.
    pub keep_last_assistants: usize,
    pub soft_trim_ratio: f64,
    pub hard_clear_ratio: f64,
    /// Eligible tool results smaller than this are left alone.
    pub min_prunable_tool_chars: usize,
    pub soft_trim: SoftTrimSettings,
    pub hard_clear: HardClearSettings,
    pub tools: ToolMatcher,
}

impl Default for PruningSettings {
    fn default() -> Self {
        Self {
            keep_last_assistants: DEFAULT_KEEP_LAST_ASSISTANTS,
            soft_trim_ratio: DEFAULT_SOFT_TRIM_RATIO,
            hard_clear_ratio: DEFAULT_HARD_CLEAR_RATIO,
            min_prunable_tool_chars: DEFAULT_MIN_PRUNABLE_TOOL_CHARS,
            soft_trim: SoftTrimSettings::default(),
            hard_clear: HardClearSettings::default(),
            tools: ToolMatcher::default(),
        }
    }
}

impl PruningSettings {
    pub fn with_keep_last_assistants(mut self, n: usize) -> Self {
        self.keep_last_assistants = n;
        self
    }

    pub fn with_soft_trim_ratio(mut self, ratio: f64) -> Self {
        self.soft_trim_ratio = ratio;
        self
    }

    pub fn with_hard_clear_ratio(mut self, ratio: f64) -> Self {
        self.hard_clear_ratio = ratio;
        self
    }

    pub fn with_min_prunable_tool_chars(mut self, chars: usize) -> Self {
        self.min_prunable_tool_chars = chars;
        self
    }

    pub fn with_soft_trim(mut self, max_chars: usize, head_chars: usize, tail_chars: usize) -> Self {
        self.soft_trim = SoftTrimSettings {
            max_chars,
            head_chars,
            tail_chars,
        };
        self
    }

    pub fn with_hard_clear(mut self, enabled: bool, placeholder: impl Into<String>) -> Self {
        self.hard_clear = HardClearSettings {
            enabled,
            placeholder: placeholder.into(),
        };
        self
    }

    pub fn with_tools(mut self, tools: ToolMatcher) -> Self {
        self.tools = tools;
        self
    }
}
