//! Which tool results a pruning pass may touch.
//!
//! Recent tool output is usually still in play for the model's next step,
//! so everything from the N-th most recent assistant message onward is
//! protected. Older results have already been acted on.

use super::settings::PruningSettings;
use crate::Message;

/// Index of the first protected message.
///
/// Messages strictly before the returned index are outside the recency
/// window. `keep_last_assistants == 0` returns `messages.len()` (nothing is
/// protected). Returns `None` when the transcript has fewer assistant
/// messages than `keep_last_assistants`, in which case everything is
/// protected.
pub fn protection_boundary(messages: &[Message], keep_last_assistants: usize) -> Option<usize> {
    if keep_last_assistants == 0 {
        return Some(messages.len());
    }
    let mut seen = 0;
    for (i, msg) in messages.iter().enumerate().rev() {
        if msg.is_assistant() {
            seen += 1;
            if seen == keep_last_assistants {
                return Some(i);
            }
        }
    }
    None
}

/// Indices of tool-result messages eligible for eviction, oldest first.
///
/// A tool result is eligible when it sits before the protection boundary,
/// its tool is prunable, and its text is at least `min_prunable_tool_chars`
/// long.
pub fn eligible_tool_results(messages: &[Message], settings: &PruningSettings) -> Vec<usize> {
    let Some(boundary) = protection_boundary(messages, settings.keep_last_assistants) else {
        return Vec::new();
    };

    messages[..boundary]
        .iter()
        .enumerate()
        .filter_map(|(i, msg)| {
            let result = msg.as_tool_result()?;
            let prunable = settings.tools.is_prunable(&result.tool_name)
                && result.text_len() >= settings.min_prunable_tool_chars;
            prunable.then_some(i)
        })
        .collect()
}
