//! Config schema: per-domain restrictions and the audit sink.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use readgate_policy::audit::DEFAULT_AUDIT_CAPACITY;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub monday: MondayConfig,
    pub slack: SlackConfig,
    pub audit: AuditConfig,
}

/// Monday.com restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MondayConfig {
    /// Only this board is reachable. Unset or blank disables the restriction.
    pub allowed_board_id: Option<String>,

    /// Also strip other boards out of successful responses.
    pub scope_results: bool,
}

/// Slack restrictions. Private channels, DMs and group DMs are always denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Public channel ids that may be read. Empty means every public channel.
    pub allowed_channels: Vec<String>,

    /// Also strip other channels out of successful listings.
    pub scope_results: bool,
}

/// Where audit records go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines file. When unset, records are emitted as tracing events.
    pub path: Option<PathBuf>,

    /// Bounded queue size; records beyond it are dropped, never awaited.
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

impl MondayConfig {
    /// The allowed board id, trimmed, if the restriction is enabled.
    pub fn allowed_board(&self) -> Option<&str> {
        self.allowed_board_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Split a comma-separated id list, trimming and dropping blanks.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
