//! Read-only access to JSONL session logs and active-branch reconstruction.
//!
//! A session file holds one JSON entry per line. Entries form a tree through
//! `id` / `parentId`; the active branch is the path from the most recently
//! written entry back to the root.
//!
//! ```text
//! {"type":"session","id":"s1","timestamp":"2026-01-01T00:00:00Z"}
//! {"type":"message","id":"e1","parentId":null,"message":{"role":"user","content":"hi"}}
//! {"type":"message","id":"e2","parentId":"e1","message":{"role":"assistant","content":[...]}}
//! ```
//!
//! Only `message` entries carry conversation content. Every other entry kind
//! is kept for branch linkage and otherwise ignored.

use crate::Message;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Kind of a session entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// File header. Not part of any branch.
    Session,
    Message,
    Compaction,
    BranchSummary,
    ModelChange,
    ThinkingLevelChange,
    Custom,
    Label,
    #[serde(other)]
    Other,
}

/// One line of a session log.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Written either as RFC 3339 text or as epoch millis. Kept raw so an
    /// unexpected shape never makes the log unreadable; see [`Self::timestamp`].
    #[serde(default, rename = "timestamp", skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<serde_json::Value>,
    /// Present on `message` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl SessionEntry {
    /// The wrapped message, if this is a `message` entry.
    pub fn as_message(&self) -> Option<&Message> {
        match self.kind {
            EntryKind::Message => self.message.as_ref(),
            _ => None,
        }
    }

    /// When the entry was written, if the timestamp is in a recognised form.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self.raw_timestamp.as_ref()? {
            serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            serde_json::Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
            _ => None,
        }
    }
}

/// A parsed session log.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    entries: Vec<SessionEntry>,
}

impl SessionLog {
    /// Read and parse a session file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read session {}: {e}", path.display()))?;
        Self::parse(&text)
    }

    /// Parse JSONL text. Blank lines are skipped; any other line that fails
    /// to parse makes the whole log corrupt.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: SessionEntry = serde_json::from_str(line)
                .map_err(|e| format!("Failed to parse session entry on line {}: {e}", i + 1))?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Every entry in file order, header included.
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Entries on the active branch, root first.
    ///
    /// The leaf is the last entry with an `id`. A log without ids is linear,
    /// so every non-header entry is on the branch. A `parentId` that points at
    /// an unknown entry ends the walk; a cycle is an error.
    pub fn branch(&self) -> Result<Vec<&SessionEntry>, String> {
        let body = || {
            self.entries
                .iter()
                .filter(|e| e.kind != EntryKind::Session)
        };

        let Some(leaf) = body().rev().find(|e| e.id.is_some()) else {
            return Ok(body().collect());
        };

        let by_id: HashMap<&str, &SessionEntry> = body()
            .filter_map(|e| e.id.as_deref().map(|id| (id, e)))
            .collect();

        let mut branch = vec![leaf];
        let mut seen = HashSet::new();
        let mut current = leaf;
        while let Some(parent_id) = current.parent_id.as_deref() {
            if let Some(id) = current.id.as_deref() {
                seen.insert(id);
            }
            if seen.contains(parent_id) {
                return Err(format!("Session branch has a cycle at entry '{parent_id}'"));
            }
            let Some(&parent) = by_id.get(parent_id) else {
                break;
            };
            branch.push(parent);
            current = parent;
        }
        branch.reverse();
        Ok(branch)
    }

    /// Messages carried by `message` entries on the active branch.
    pub fn branch_messages(&self) -> Result<Vec<Message>, String> {
        Ok(self
            .branch()?
            .into_iter()
            .filter_map(SessionEntry::as_message)
            .cloned()
            .collect())
    }
}
