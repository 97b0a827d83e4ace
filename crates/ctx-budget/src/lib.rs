//! Context-window budget enforcement for LLM agent transcripts.
//!
//! An agent transcript grows without bound, but the model only ever sees a
//! fixed-size window. `ctx-budget` keeps the transcript inside that window
//! with two cooperating mechanisms:
//!
//! 1. **[`pruning`]** — runs once per turn and shrinks the bulkiest old tool
//!    results in place. Oversized results are soft-trimmed (head and tail
//!    kept) or hard-cleared (replaced with a short placeholder). Tool results
//!    that precede the most recent assistant turns are protected.
//!
//! 2. **[`compaction`]** — a one-shot check before a turn starts that decides
//!    whether the whole history should be summarized, based on a token
//!    estimate of the session's active branch.
//!
//! Both mechanisms derive absolute limits from the model's context window and
//! a ratio through the single [`resolve_threshold`](budget::resolve_threshold)
//! function.
//!
//! # Example
//!
//! ```
//! use ctx_budget::Message;
//! use ctx_budget::pruning::{PruneContext, PruningSettings, prune_context_messages};
//!
//! let mut messages = vec![
//!     Message::user("find the bug"),
//!     Message::assistant_text("reading the file"),
//!     Message::tool_result("call-1", "read_file", "x".repeat(20_000)),
//!     Message::assistant_text("found it"),
//! ];
//!
//! let settings = PruningSettings::default()
//!     .with_keep_last_assistants(0)
//!     .with_hard_clear_ratio(0.0)
//!     .with_min_prunable_tool_chars(0);
//!
//! let report = prune_context_messages(
//!     &mut messages,
//!     &settings,
//!     &PruneContext::new(1000),
//! );
//! assert_eq!(report.hard_cleared, 1);
//! ```

pub mod budget;
pub mod compaction;
pub mod config;
pub mod defaults;
pub mod prelude;
pub mod pruning;
pub mod session;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ── Content blocks ─────────────────────────────────────────────────

/// A single piece of message content.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Thinking {
        thinking: String,
    },
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    /// Any block kind this crate doesn't know about. Counts as zero size.
    #[serde(other)]
    Other,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// The text of a `Text` block, `None` for every other kind.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Image { .. }
            | ContentBlock::Thinking { .. }
            | ContentBlock::ToolCall { .. }
            | ContentBlock::Other => None,
        }
    }
}

/// User content is either a bare string or a list of blocks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

// ── Messages ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub content: UserContent,
    #[serde(default)]
    pub timestamp: i64,
}

/// Token usage reported by the provider for one assistant turn.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub cache_read: u64,
    #[serde(default)]
    pub cache_write: u64,
    #[serde(default)]
    pub total: u64,
}

/// An assistant turn. Model metadata is carried through untouched; pruning
/// only uses assistant messages as recency checkpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

/// The output of one tool call. The only message kind pruning rewrites.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub timestamp: i64,
}

impl ToolResultMessage {
    /// Total characters across the text blocks. Non-text blocks don't count.
    pub fn text_len(&self) -> usize {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .map(|t| t.chars().count())
            .sum()
    }

    /// All text blocks concatenated in order.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }

    /// Replace every text block with a single block holding `text`.
    ///
    /// The new block takes the position of the first text block; non-text
    /// blocks keep their relative order. A message without text blocks gets
    /// the new block appended.
    pub fn replace_text(&mut self, text: String) {
        let first_text = self
            .content
            .iter()
            .position(|b| matches!(b, ContentBlock::Text { .. }));
        let mut replacement = Some(ContentBlock::Text { text });
        let mut next = Vec::with_capacity(self.content.len());
        for (i, block) in std::mem::take(&mut self.content).into_iter().enumerate() {
            if Some(i) == first_text {
                next.extend(replacement.take());
            } else if !matches!(block, ContentBlock::Text { .. }) {
                next.push(block);
            }
        }
        next.extend(replacement);
        self.content = next;
    }
}

/// A message with a role this crate has no model for, such as a shell
/// execution record or a compaction summary. Kept verbatim; never pruned.
#[derive(Clone, Debug, PartialEq)]
pub struct OtherMessage {
    pub role: String,
    /// The whole message object, `role` included.
    pub raw: serde_json::Value,
}

impl OtherMessage {
    /// Characters across every string value in the message except `role`.
    pub fn text_len(&self) -> usize {
        fn strings(value: &serde_json::Value) -> usize {
            match value {
                serde_json::Value::String(s) => s.chars().count(),
                serde_json::Value::Array(items) => items.iter().map(strings).sum(),
                serde_json::Value::Object(map) => map.values().map(strings).sum(),
                serde_json::Value::Null
                | serde_json::Value::Bool(_)
                | serde_json::Value::Number(_) => 0,
            }
        }
        match &self.raw {
            serde_json::Value::Object(map) => map
                .iter()
                .filter(|(key, _)| key.as_str() != "role")
                .map(|(_, value)| strings(value))
                .sum(),
            other => strings(other),
        }
    }
}

/// A message in the transcript, discriminated by `role`.
///
/// `user`, `assistant` and `toolResult` are modelled; any other role
/// deserializes to [`Message::Other`] and serializes back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
    ToolResult(ToolResultMessage),
    Other(OtherMessage),
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "role", rename_all = "camelCase")]
        enum Tagged<'a> {
            User(&'a UserMessage),
            Assistant(&'a AssistantMessage),
            ToolResult(&'a ToolResultMessage),
        }

        match self {
            Message::User(m) => Tagged::User(m).serialize(serializer),
            Message::Assistant(m) => Tagged::Assistant(m).serialize(serializer),
            Message::ToolResult(m) => Tagged::ToolResult(m).serialize(serializer),
            Message::Other(m) => m.raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let role = raw
            .get("role")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| <D::Error as de::Error>::missing_field("role"))?
            .to_owned();
        let message = match role.as_str() {
            "user" => UserMessage::deserialize(raw).map(Message::User),
            "assistant" => AssistantMessage::deserialize(raw).map(Message::Assistant),
            "toolResult" => ToolResultMessage::deserialize(raw).map(Message::ToolResult),
            _ => return Ok(Message::Other(OtherMessage { role, raw })),
        };
        message.map_err(|e| de::Error::custom(format!("invalid {role} message: {e}")))
    }
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User(UserMessage {
            content: UserContent::Text(content.into()),
            timestamp: now_millis(),
        })
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            content: vec![ContentBlock::text(content)],
            api: None,
            provider: None,
            model: None,
            usage: None,
            stop_reason: None,
            timestamp: now_millis(),
        })
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ToolResult(ToolResultMessage {
            tool_call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: vec![ContentBlock::text(content)],
            is_error: false,
            timestamp: now_millis(),
        })
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant(_))
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultMessage> {
        match self {
            Message::ToolResult(result) => Some(result),
            Message::User(_) | Message::Assistant(_) | Message::Other(_) => None,
        }
    }

    pub fn as_tool_result_mut(&mut self) -> Option<&mut ToolResultMessage> {
        match self {
            Message::ToolResult(result) => Some(result),
            Message::User(_) | Message::Assistant(_) | Message::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        let user = Message::user("hello");
        assert!(matches!(user, Message::User(_)));

        let asst = Message::assistant_text("hi");
        assert!(asst.is_assistant());

        let tool = Message::tool_result("call_1", "read_file", "result");
        let result = tool.as_tool_result().unwrap();
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.tool_name, "read_file");
        assert!(!result.is_error);
    }

    #[test]
    fn tool_result_round_trips_wire_shape() {
        let json = serde_json::json!({
            "role": "toolResult",
            "toolCallId": "t1",
            "toolName": "grep_search",
            "content": [
                {"type": "text", "text": "abc"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"}
            ],
            "isError": true,
            "timestamp": 42
        });
        let msg: Message = serde_json::from_value(json.clone()).unwrap();
        let result = msg.as_tool_result().unwrap();
        assert!(result.is_error);
        assert_eq!(result.text_len(), 3);
        assert_eq!(serde_json::to_value(&msg).unwrap(), json);
    }

    #[test]
    fn unknown_block_kind_counts_as_zero() {
        let json = serde_json::json!({
            "role": "toolResult",
            "toolCallId": "t1",
            "toolName": "x",
            "content": [{"type": "audio", "data": "..."}]
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        let result = msg.as_tool_result().unwrap();
        assert_eq!(result.content, vec![ContentBlock::Other]);
        assert_eq!(result.text_len(), 0);
    }

    #[test]
    fn user_content_accepts_string_or_blocks() {
        let plain: Message =
            serde_json::from_value(serde_json::json!({"role": "user", "content": "hi"})).unwrap();
        let blocks: Message = serde_json::from_value(serde_json::json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();
        assert!(matches!(
            plain,
            Message::User(UserMessage { content: UserContent::Text(_), .. })
        ));
        assert!(matches!(
            blocks,
            Message::User(UserMessage { content: UserContent::Blocks(_), .. })
        ));
    }

    #[test]
    fn unknown_role_is_kept_verbatim() {
        let json = serde_json::json!({
            "role": "bashExecution",
            "command": "ls",
            "output": "a.txt\nb.txt",
            "exitCode": 0,
            "cancelled": false,
            "timestamp": 7
        });
        let msg: Message = serde_json::from_value(json.clone()).unwrap();
        let Message::Other(other) = &msg else {
            panic!("expected Other, got {msg:?}");
        };
        assert_eq!(other.role, "bashExecution");
        assert_eq!(other.text_len(), "ls".len() + "a.txt\nb.txt".len());
        assert!(!msg.is_assistant());
        assert!(msg.as_tool_result().is_none());
        assert_eq!(serde_json::to_value(&msg).unwrap(), json);
    }

    #[test]
    fn nested_strings_of_unknown_role_are_counted() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "role": "custom",
            "customType": "note",
            "content": [{"type": "text", "text": "hello"}],
            "display": true
        }))
        .unwrap();
        let Message::Other(other) = msg else {
            panic!("expected Other");
        };
        // "note" + "text" + "hello"
        assert_eq!(other.text_len(), 13);
    }

    #[test]
    fn missing_role_is_an_error() {
        let err = serde_json::from_value::<Message>(serde_json::json!({"content": "hi"}))
            .unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn malformed_known_role_is_an_error() {
        let err = serde_json::from_value::<Message>(serde_json::json!({
            "role": "toolResult",
            "content": "not blocks"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid toolResult message"));
    }

    #[test]
    fn text_len_counts_chars_not_bytes() {
        let msg = Message::tool_result("t", "x", "héllo");
        assert_eq!(msg.as_tool_result().unwrap().text_len(), 5);
    }

    #[test]
    fn replace_text_keeps_non_text_blocks_in_order() {
        let mut result = ToolResultMessage {
            tool_call_id: "t".into(),
            tool_name: "x".into(),
            content: vec![
                ContentBlock::Image {
                    data: "A".into(),
                    mime_type: "image/png".into(),
                },
                ContentBlock::text("one"),
                ContentBlock::text("two"),
                ContentBlock::Other,
            ],
            is_error: false,
            timestamp: 0,
        };
        result.replace_text("new".into());
        assert_eq!(result.content.len(), 3);
        assert!(matches!(result.content[0], ContentBlock::Image { .. }));
        assert_eq!(result.content[1].as_text(), Some("new"));
        assert_eq!(result.content[2], ContentBlock::Other);
    }

    #[test]
    fn replace_text_appends_when_no_text_block() {
        let mut result = ToolResultMessage {
            tool_call_id: "t".into(),
            tool_name: "x".into(),
            content: vec![ContentBlock::Other],
            is_error: false,
            timestamp: 0,
        };
        result.replace_text("note".into());
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[1].as_text(), Some("note"));
    }
}
