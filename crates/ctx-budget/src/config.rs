//! Configuration file model and resolution into runtime settings.
//!
//! The file is JSON with every level optional:
//!
//! ```json
//! {
//!   "agents": {
//!     "defaults": {
//!       "contextTokens": 200000,
//!       "compaction": { "proactiveThreshold": 0.8 },
//!       "contextPruning": {
//!         "keepLastAssistants": 3,
//!         "softTrimRatio": 0.3,
//!         "hardClearRatio": 0.5,
//!         "minPrunableToolChars": 50000,
//!         "softTrim": { "maxChars": 4000, "headChars": 1500, "tailChars": 1500 },
//!         "hardClear": { "enabled": true, "placeholder": "..." },
//!         "tools": { "allow": ["*"], "deny": ["memory_*"] }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Resolution never fails: missing, malformed, or out-of-range values fall
//! back to the defaults in [`crate::defaults`].

use crate::pruning::{PruningSettings, ToolMatcher};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<AgentsConfig>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<AgentDefaults>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    /// Context window override, in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_pruning: Option<ContextPruningConfig>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompactionConfig {
    /// Fraction of the context window that triggers proactive compaction.
    /// Kept as raw JSON so a wrongly typed value falls back to the default
    /// instead of failing the whole file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proactive_threshold: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextPruningConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_last_assistants: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_trim_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_clear_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_prunable_tool_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_trim: Option<SoftTrimConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_clear: Option<HardClearConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolFilterConfig>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoftTrimConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail_chars: Option<usize>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HardClearConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Glob patterns over tool names.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilterConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl Config {
    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse config: {e}"))
    }

    /// JSON Schema describing the config file.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Config);
        serde_json::to_value(schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
    }

    fn defaults(&self) -> Option<&AgentDefaults> {
        self.agents.as_ref()?.defaults.as_ref()
    }

    pub fn compaction(&self) -> Option<&CompactionConfig> {
        self.defaults()?.compaction.as_ref()
    }

    pub fn context_pruning(&self) -> Option<&ContextPruningConfig> {
        self.defaults()?.context_pruning.as_ref()
    }

    pub fn context_tokens(&self) -> Option<usize> {
        self.defaults()?.context_tokens
    }
}

fn clamp_ratio(ratio: f64, fallback: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Overlay `contextPruning` config on the default settings.
///
/// Ratios are clamped into `[0, 1]`. An invalid tool pattern drops the tool
/// filter (every tool stays prunable) and logs a warning.
pub fn resolve_pruning_settings(cfg: Option<&Config>) -> PruningSettings {
    let mut settings = PruningSettings::default();
    let Some(raw) = cfg.and_then(Config::context_pruning) else {
        return settings;
    };

    if let Some(n) = raw.keep_last_assistants {
        settings.keep_last_assistants = n;
    }
    if let Some(r) = raw.soft_trim_ratio {
        settings.soft_trim_ratio = clamp_ratio(r, settings.soft_trim_ratio);
    }
    if let Some(r) = raw.hard_clear_ratio {
        settings.hard_clear_ratio = clamp_ratio(r, settings.hard_clear_ratio);
    }
    if let Some(n) = raw.min_prunable_tool_chars {
        settings.min_prunable_tool_chars = n;
    }
    if let Some(trim) = &raw.soft_trim {
        let t = &mut settings.soft_trim;
        t.max_chars = trim.max_chars.unwrap_or(t.max_chars);
        t.head_chars = trim.head_chars.unwrap_or(t.head_chars);
        t.tail_chars = trim.tail_chars.unwrap_or(t.tail_chars);
    }
    if let Some(clear) = &raw.hard_clear {
        let h = &mut settings.hard_clear;
        h.enabled = clear.enabled.unwrap_or(h.enabled);
        if let Some(placeholder) = clear.placeholder.as_deref().map(str::trim)
            && !placeholder.is_empty()
        {
            h.placeholder = placeholder.to_string();
        }
    }
    if let Some(tools) = &raw.tools {
        match ToolMatcher::new(tools.allow.as_slice(), tools.deny.as_slice()) {
            Ok(matcher) => settings.tools = matcher,
            Err(e) => warn!("Ignoring contextPruning.tools: {e}"),
        }
    }
    settings
}

/// Context window from config, or `fallback`. A zero override is ignored.
pub fn resolve_context_window(cfg: Option<&Config>, fallback: usize) -> usize {
    cfg.and_then(Config::context_tokens)
        .filter(|&n| n > 0)
        .unwrap_or(fallback)
}
