//! Budget arithmetic: ratio thresholds and transcript token estimation.
//!
//! Every limit in this crate is a fraction of the model's context window.
//! [`resolve_threshold`] is the one place that turns a ratio into an absolute
//! number; the pruning tiers and the proactive compaction gate all go through
//! it so the policies can't disagree about rounding.

use crate::defaults::{DEFAULT_CHARS_PER_TOKEN, IMAGE_CHAR_ESTIMATE};
use crate::{ContentBlock, Message, UserContent};

/// Absolute threshold for `ratio` of `context_window`, floored.
///
/// Callers compare with a strict `>`, so a ratio of `0` means "anything of
/// nonzero size exceeds it". Negative and non-finite ratios also resolve to
/// `0`.
pub fn resolve_threshold(context_window: usize, ratio: f64) -> usize {
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (context_window as f64 * ratio).floor() as usize
}

/// Estimates how many tokens a list of messages occupies.
///
/// Implementations must be deterministic and side-effect free. An `Err`
/// means the estimate could not be produced at all.
pub trait TokenEstimator {
    fn estimate(&self, messages: &[Message]) -> Result<usize, String>;
}

/// Character-count estimator: total characters divided by a fixed ratio,
/// rounded up.
///
/// Counts user and assistant text, thinking, tool-call names and arguments,
/// tool-result text, and a flat [`IMAGE_CHAR_ESTIMATE`] per image. Messages
/// with other roles contribute every string they carry.
#[derive(Debug, Clone)]
pub struct CharEstimator {
    chars_per_token: f64,
}

impl Default for CharEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl CharEstimator {
    /// Use a calibrated chars-per-token ratio.
    pub fn with_chars_per_token(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }
}

impl TokenEstimator for CharEstimator {
    fn estimate(&self, messages: &[Message]) -> Result<usize, String> {
        if !self.chars_per_token.is_finite() || self.chars_per_token <= 0.0 {
            return Err(format!(
                "Invalid chars-per-token ratio: {}",
                self.chars_per_token
            ));
        }
        let total_chars: usize = messages.iter().map(message_chars).sum();
        Ok((total_chars as f64 / self.chars_per_token).ceil() as usize)
    }
}

fn block_chars(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text { text } => text.chars().count(),
        ContentBlock::Thinking { thinking } => thinking.chars().count(),
        ContentBlock::ToolCall {
            name, arguments, ..
        } => name.chars().count() + arguments.to_string().chars().count(),
        ContentBlock::Image { .. } => IMAGE_CHAR_ESTIMATE,
        ContentBlock::Other => 0,
    }
}

fn message_chars(message: &Message) -> usize {
    match message {
        Message::User(user) => match &user.content {
            UserContent::Text(text) => text.chars().count(),
            UserContent::Blocks(blocks) => blocks.iter().map(block_chars).sum(),
        },
        Message::Assistant(assistant) => assistant.content.iter().map(block_chars).sum(),
        Message::ToolResult(result) => result.content.iter().map(block_chars).sum(),
        Message::Other(other) => other.text_len(),
    }
}

/// Snapshot of context usage at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextUsage {
    /// Estimated tokens consumed.
    pub estimated_tokens: usize,
    /// Context window size in tokens.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    pub fn new(estimated_tokens: usize, max_tokens: usize) -> Self {
        let usage_pct = if max_tokens > 0 {
            estimated_tokens as f64 / max_tokens as f64
        } else {
            1.0
        };
        Self {
            estimated_tokens,
            max_tokens,
            usage_pct,
        }
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}
