//! Two-tier eviction for eligible tool results.
//!
//! Tool results are the single largest context consumer in an agent loop.
//! A `read_file` can inject tens of kilobytes; a `grep` can return hundreds
//! of lines. Once the model has acted on them most of that text is dead
//! weight. This module rewrites it in place:
//!
//! - **Hard clear** — the whole text is replaced by
//!   `[<tool>: <placeholder>]`. Checked first, terminal.
//! - **Soft trim** — the head and tail are kept with a note saying how much
//!   was dropped.
//!
//! Only text blocks are rewritten. The call id, tool name, error flag, and
//! timestamp are left alone so tool calls still pair with their results.

use super::settings::PruningSettings;
use crate::ToolResultMessage;
use crate::budget::resolve_threshold;

/// Marker between the tool name and the kept content of a soft-trimmed
/// result. Both the writer and the "already trimmed?" check use it.
pub const TRIMMED_MARKER: &str = " result trimmed: ";

/// What the policy did to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    HardCleared,
    SoftTrimmed,
    Untouched,
}

/// Text written by a hard clear.
pub fn hard_clear_text(tool_name: &str, placeholder: &str) -> String {
    format!("[{tool_name}: {placeholder}]")
}

/// Text written by a soft trim of `original`, which is `original_len` chars.
pub fn soft_trim_text(
    tool_name: &str,
    original: &str,
    original_len: usize,
    head_chars: usize,
    tail_chars: usize,
) -> String {
    let head: String = original.chars().take(head_chars).collect();
    let tail: String = original
        .chars()
        .skip(original_len.saturating_sub(tail_chars))
        .collect();
    format!(
        "[{tool_name}{TRIMMED_MARKER}{head}\n...\n{tail}\n\n\
         kept first {head_chars} chars and last {tail_chars} chars of {original_len} chars.]"
    )
}

fn is_hard_cleared(result: &ToolResultMessage, placeholder: &str) -> bool {
    result.joined_text() == hard_clear_text(&result.tool_name, placeholder)
}

/// Whether `text` has the shape [`soft_trim_text`] writes for `tool_name`:
/// the closing note must parse, and the kept content between marker and note
/// must be as long as the note says.
fn is_soft_trimmed(tool_name: &str, text: &str) -> bool {
    let Some(body) = text.strip_prefix(&format!("[{tool_name}{TRIMMED_MARKER}")) else {
        return false;
    };
    let Some((kept, note)) = body.rsplit_once("\n\nkept first ") else {
        return false;
    };
    let Some((head, tail, original)) = parse_trim_note(note) else {
        return false;
    };
    let Some(kept_len) = head.checked_add(tail) else {
        return false;
    };
    kept_len < original && kept.chars().count().checked_sub("\n...\n".len()) == Some(kept_len)
}

/// `"<head> chars and last <tail> chars of <original> chars.]"`
fn parse_trim_note(note: &str) -> Option<(usize, usize, usize)> {
    let rest = note.strip_suffix(" chars.]")?;
    let (head, rest) = rest.split_once(" chars and last ")?;
    let (tail, original) = rest.split_once(" chars of ")?;
    Some((head.parse().ok()?, tail.parse().ok()?, original.parse().ok()?))
}

/// Apply the eviction tiers to one eligible tool result.
///
/// Sizes are text characters; non-text blocks are ignored for sizing and
/// kept as they are. Re-running on an already pruned message is a no-op.
pub fn evict_tool_result(
    result: &mut ToolResultMessage,
    settings: &PruningSettings,
    context_window: usize,
) -> Eviction {
    let hard = &settings.hard_clear;
    if hard.enabled && is_hard_cleared(result, &hard.placeholder) {
        return Eviction::Untouched;
    }

    let size = result.text_len();

    if hard.enabled && size > resolve_threshold(context_window, settings.hard_clear_ratio) {
        result.replace_text(hard_clear_text(&result.tool_name, &hard.placeholder));
        return Eviction::HardCleared;
    }

    if size > resolve_threshold(context_window, settings.soft_trim_ratio) {
        return soft_trim(result, settings, size);
    }

    Eviction::Untouched
}

fn soft_trim(result: &mut ToolResultMessage, settings: &PruningSettings, size: usize) -> Eviction {
    let trim = &settings.soft_trim;
    if size <= trim.max_chars
        || trim.head_chars.saturating_add(trim.tail_chars) >= size
        || is_soft_trimmed(&result.tool_name, &result.joined_text())
    {
        return Eviction::Untouched;
    }

    let trimmed = soft_trim_text(
        &result.tool_name,
        &result.joined_text(),
        size,
        trim.head_chars,
        trim.tail_chars,
    );
    // Never grow the message: the note has overhead of its own.
    if trimmed.chars().count() >= size {
        return Eviction::Untouched;
    }

    result.replace_text(trimmed);
    Eviction::SoftTrimmed
}
