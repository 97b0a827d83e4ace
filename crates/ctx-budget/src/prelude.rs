//! Convenience re-exports for common `ctx-budget` types.
//!
//! ```ignore
//! use ctx_budget::prelude::*;
//! ```
//!
//! Covers what a host turn loop needs: the message model, the pruning entry
//! point and settings, the compaction gate, and config resolution. Eviction
//! internals and session entry types stay in their modules.

pub use crate::{ContentBlock, Message, OtherMessage, ToolResultMessage};

pub use crate::budget::{CharEstimator, TokenEstimator, resolve_threshold};
pub use crate::compaction::{
    resolve_proactive_compaction_threshold, should_run_proactive_compaction,
};
pub use crate::config::{Config, resolve_context_window, resolve_pruning_settings};
pub use crate::pruning::{PruneContext, PruneReport, PruningSettings, prune_context_messages};
pub use crate::session::SessionLog;
