//! Read-only access policy for agent tool calls against Monday.com and Slack.
//!
//! Layers, each usable on its own:
//! - [`Classifier`]: operation name to allow/deny, one per [`Domain`].
//! - [`query_guard`]: rejects raw GraphQL documents containing a mutation.
//! - [`scope`]: single-board restriction and Slack channel restrictions.
//! - [`filter_catalog`]: drops write operations from an introspected catalog.
//! - [`CallGate`]: re-checks every call, audits it, then forwards it.

pub mod audit;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod gate;
pub mod query_guard;
pub mod results;
pub mod rules;
pub mod scope;

/// Opaque, ordered argument bag passed to a transport.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

pub use {
    audit::{AuditRecord, AuditSink, JsonlAuditSink, TracingAuditSink},
    catalog::{ToolDescriptor, filter_catalog},
    classifier::{Basis, Classifier, Decision, RuleLists, Verdict},
    error::{GateError, RuleSetError, SECURITY_MARKER},
    gate::{CallGate, DomainPolicy, Transport},
    query_guard::validate_query_document,
    rules::Domain,
    scope::{BoardScope, ChannelKind, ChannelScope, ScopeOutcome, ScopeRestrictor},
};
