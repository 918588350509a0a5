//! Resource scoping: which boards and conversations a call may touch.
//!
//! Monday calls are limited to a single configured board. Slack calls never
//! reach private channels, DMs or group DMs, and when a channel allow-list
//! is configured, public channels outside it are refused as well.

use std::{collections::BTreeSet, fmt, str::FromStr};

use {
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    Arguments,
    error::{GateError, Result},
};

/// Argument keys that may carry a board id.
pub const BOARD_ID_KEYS: &[&str] = &["board_id", "boardId", "boardID", "board_ids", "boardIds"];

/// Key used when injecting the configured board id.
pub const INJECTED_BOARD_KEY: &str = "board_id";

/// Operation-name fragments that mark a call as board-addressed.
const BOARD_OPERATION_HINTS: &[&str] = &["board", "item"];

/// Argument keys that may carry a Slack conversation id.
pub const CHANNEL_ID_KEYS: &[&str] = &["channel", "channel_id", "channelId"];

/// Argument key carrying the conversation category.
pub const CHANNEL_TYPE_KEY: &str = "channel_type";

/// Argument key listing conversation categories (`conversations.list`).
pub const CHANNEL_TYPES_KEY: &str = "types";

/// Listing operations that get `types=public_channel` when none is given.
const CHANNEL_LISTING_OPERATIONS: &[&str] = &["conversations.list", "users.conversations"];

/// What the restrictor did to a permitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// No restriction configured for this domain.
    Unrestricted,
    /// Restriction configured and the call complies as-is.
    Permitted,
    /// An argument was added before forwarding.
    Injected { key: String, value: String },
}

/// Single-board restriction for Monday.
#[derive(Debug, Clone, Default)]
pub struct BoardScope {
    allowed: Option<String>,
}

impl BoardScope {
    /// A blank id disables the restriction.
    pub fn new(allowed: Option<String>) -> Self {
        Self {
            allowed: allowed
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    pub fn allowed(&self) -> Option<&str> {
        self.allowed.as_deref()
    }

    /// Board ids named by the arguments, across every accepted key.
    pub fn requested_ids(args: &Arguments) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for key in BOARD_ID_KEYS {
            if let Some(value) = args.get(*key) {
                collect_ids(key, value, &mut ids)?;
            }
        }
        Ok(ids)
    }

    pub fn enforce(&self, operation: &str, args: &mut Arguments) -> Result<ScopeOutcome> {
        let Some(allowed) = self.allowed.as_deref() else {
            return Ok(ScopeOutcome::Unrestricted);
        };

        let requested = Self::requested_ids(args)?;
        if let Some(other) = requested.iter().find(|id| id.as_str() != allowed) {
            warn!(
                operation,
                board_id = %other,
                allowed_board_id = %allowed,
                "blocked access to board outside scope"
            );
            return Err(GateError::access_denied(
                format!("board {other}"),
                format!("restricted to board {allowed}"),
            ));
        }

        let op = operation.to_lowercase();
        if requested.is_empty() && BOARD_OPERATION_HINTS.iter().any(|h| op.contains(h)) {
            args.insert(INJECTED_BOARD_KEY.into(), Value::String(allowed.into()));
            info!(operation, board_id = %allowed, "injected allowed board id");
            return Ok(ScopeOutcome::Injected {
                key: INJECTED_BOARD_KEY.into(),
                value: allowed.into(),
            });
        }

        Ok(ScopeOutcome::Permitted)
    }
}

fn collect_ids(key: &str, value: &Value, out: &mut Vec<String>) -> Result<()> {
    match value {
        Value::Null => {},
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        },
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) => return Err(unreadable_id(key)),
                    _ => collect_ids(key, item, out)?,
                }
            }
        },
        Value::Bool(_) | Value::Object(_) => return Err(unreadable_id(key)),
    }
    Ok(())
}

fn unreadable_id(key: &str) -> GateError {
    GateError::access_denied(
        format!("argument '{key}'"),
        "board id must be a string, number or list of those",
    )
}

/// Slack conversation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Public,
    Private,
    DirectMessage,
    GroupDirectMessage,
}

impl ChannelKind {
    /// Private channels, DMs and group DMs are never readable.
    pub fn is_forbidden(self) -> bool {
        !matches!(self, Self::Public)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public_channel",
            Self::Private => "private_channel",
            Self::DirectMessage => "im",
            Self::GroupDirectMessage => "mpim",
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Self::Public => "public channel",
            Self::Private => "access to private channels is not allowed",
            Self::DirectMessage => "access to direct messages is not allowed",
            Self::GroupDirectMessage => "access to group direct messages is not allowed",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "public_channel" | "public" => Ok(Self::Public),
            "private_channel" | "private" => Ok(Self::Private),
            "im" => Ok(Self::DirectMessage),
            "mpim" => Ok(Self::GroupDirectMessage),
            other => Err(GateError::access_denied(
                format!("channel type '{other}'"),
                "unrecognized conversation category",
            )),
        }
    }
}

/// Category block-list plus optional id allow-list for Slack.
#[derive(Debug, Clone, Default)]
pub struct ChannelScope {
    allowed: BTreeSet<String>,
}

impl ChannelScope {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|id| id.as_ref().trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated allow-list such as `C01,C02`.
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn has_allow_list(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// Whether a public channel id passes the allow-list.
    pub fn is_channel_allowed(&self, channel_id: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(channel_id.trim())
    }

    /// Check access to one conversation. Category denials win over the allow-list.
    pub fn validate(&self, channel_id: &str, kind: Option<ChannelKind>) -> Result<()> {
        if let Some(kind) = kind
            && kind.is_forbidden()
        {
            warn!(channel_id, channel_type = %kind, "blocked non-public conversation");
            return Err(GateError::access_denied(
                format!("Slack channel {channel_id}"),
                kind.denial(),
            ));
        }
        if !self.is_channel_allowed(channel_id) {
            warn!(channel_id, "blocked channel outside allow-list");
            return Err(GateError::access_denied(
                format!("Slack channel {channel_id}"),
                "channel not in allowed channel list",
            ));
        }
        Ok(())
    }

    pub fn enforce(&self, operation: &str, args: &mut Arguments) -> Result<ScopeOutcome> {
        let kind = match args.get(CHANNEL_TYPE_KEY) {
            Some(Value::String(s)) => Some(s.parse::<ChannelKind>()?),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(GateError::access_denied(
                    format!("argument '{CHANNEL_TYPE_KEY}'"),
                    "conversation category must be a string",
                ));
            },
        };

        let listing = match args.get(CHANNEL_TYPES_KEY) {
            Some(value) => Some(requested_kinds(value)?),
            None => None,
        };
        if let Some(kinds) = &listing
            && let Some(kind) = kinds.iter().find(|k| k.is_forbidden())
        {
            warn!(operation, channel_type = %kind, "blocked listing of non-public conversations");
            return Err(GateError::access_denied(
                "conversation types",
                kind.denial(),
            ));
        }

        let channel_ids = requested_channels(args)?;
        if channel_ids.is_empty()
            && let Some(kind) = kind
            && kind.is_forbidden()
        {
            return Err(GateError::access_denied(
                format!("{kind} conversations"),
                kind.denial(),
            ));
        }
        for id in &channel_ids {
            self.validate(id, kind)?;
        }

        let op = operation.trim().to_lowercase();
        if listing.is_none() && CHANNEL_LISTING_OPERATIONS.contains(&op.as_str()) {
            let value = ChannelKind::Public.as_str();
            args.insert(CHANNEL_TYPES_KEY.into(), Value::String(value.into()));
            debug!(operation, "restricted listing to public channels");
            return Ok(ScopeOutcome::Injected {
                key: CHANNEL_TYPES_KEY.into(),
                value: value.into(),
            });
        }

        if self.has_allow_list() || kind.is_some() || listing.is_some() {
            Ok(ScopeOutcome::Permitted)
        } else {
            Ok(ScopeOutcome::Unrestricted)
        }
    }
}

/// Channel ids named by the arguments, across every accepted key.
fn requested_channels(args: &Arguments) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for key in CHANNEL_ID_KEYS {
        match args.get(*key) {
            None | Some(Value::Null) => {},
            Some(Value::String(s)) => ids.push(s.clone()),
            Some(_) => {
                return Err(GateError::access_denied(
                    format!("argument '{key}'"),
                    "channel id must be a string",
                ));
            },
        }
    }
    Ok(ids)
}

fn requested_kinds(value: &Value) -> Result<Vec<ChannelKind>> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ChannelKind>)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.parse::<ChannelKind>(),
                _ => Err(GateError::access_denied(
                    format!("argument '{CHANNEL_TYPES_KEY}'"),
                    "conversation categories must be strings",
                )),
            })
            .collect(),
        _ => Err(GateError::access_denied(
            format!("argument '{CHANNEL_TYPES_KEY}'"),
            "conversation categories must be a string or list",
        )),
    }
}

/// Per-domain resource restriction applied by the gate.
#[derive(Debug, Clone)]
pub enum ScopeRestrictor {
    Board(BoardScope),
    Channel(ChannelScope),
}

impl ScopeRestrictor {
    pub fn enforce(&self, operation: &str, args: &mut Arguments) -> Result<ScopeOutcome> {
        match self {
            Self::Board(scope) => scope.enforce(operation, args),
            Self::Channel(scope) => scope.enforce(operation, args),
        }
    }
}
