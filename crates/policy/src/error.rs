//! Error taxonomy for the read-only gate.
//!
//! Policy rejections carry [`SECURITY_MARKER`] at the start of their message
//! so callers can tell them apart from transport failures without parsing
//! free text. Use [`GateError::is_policy_rejection`] where a type check is
//! available.

/// Literal tag prefixed to every policy rejection message.
pub const SECURITY_MARKER: &str = "[SECURITY]";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The operation name was denied by the classifier.
    #[error("[SECURITY] write operation blocked: '{operation}' ({reason}); read-only access only")]
    SecurityRejection { operation: String, reason: String },

    /// The call named a resource outside the configured scope.
    #[error("[SECURITY] access denied to {resource}: {reason}")]
    AccessDenied { resource: String, reason: String },

    /// A raw query document contained a mutation.
    #[error("[SECURITY] GraphQL {construct} is blocked in read-only mode")]
    QueryRejected { construct: String },

    /// Opaque failure from the transport, passed through unmodified.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl GateError {
    pub(crate) fn rejection(operation: &str, reason: impl Into<String>) -> Self {
        Self::SecurityRejection {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn access_denied(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// True for classifier, scope and query rejections; false for transport errors.
    pub fn is_policy_rejection(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }

    /// The operation name, for name-level rejections.
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::SecurityRejection { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

/// Invalid rule-set construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    #[error("'{0}' is listed as both allowed and blocked")]
    Overlap(String),

    #[error("allowed operation '{entry}' contains write keyword '{keyword}'")]
    KeywordInWhitelist { entry: String, keyword: String },

    #[error("rule set entries must be non-empty")]
    EmptyEntry,
}

pub type Result<T, E = GateError> = std::result::Result<T, E>;
