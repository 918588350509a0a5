//! The call gate: every outbound invocation goes through [`CallGate::invoke`].
//!
//! The gate re-classifies the operation even when its name came from an
//! already filtered catalog, so bypassing one layer does not bypass the
//! other. Rejections are terminal and synchronous; nothing is retried.
//! Transport errors are returned as [`GateError::Transport`] untouched.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    Arguments,
    audit::{AuditRecord, AuditSink},
    catalog::{ToolDescriptor, filter_catalog},
    classifier::{Classifier, Verdict},
    error::{GateError, Result, RuleSetError},
    query_guard::validate_query_document,
    results::scope_result,
    rules::Domain,
    scope::{BoardScope, ChannelScope, ScopeOutcome, ScopeRestrictor},
};

/// Argument keys that may carry a raw GraphQL document.
pub const QUERY_DOCUMENT_KEYS: &[&str] = &["query", "graphql", "document"];

/// The external client that actually performs calls.
///
/// Connection lifecycle belongs to whoever constructs the transport; the
/// gate only borrows it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Introspect the operations the remote side offers.
    async fn list_operations(&self) -> anyhow::Result<Vec<ToolDescriptor>>;

    /// Perform one call.
    async fn invoke(&self, operation: &str, arguments: Arguments) -> anyhow::Result<Value>;
}

/// Immutable per-domain policy: classifier plus resource scope.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    domain: Domain,
    classifier: Classifier,
    scope: ScopeRestrictor,
}

impl DomainPolicy {
    pub fn new(domain: Domain, scope: ScopeRestrictor) -> Result<Self, RuleSetError> {
        Ok(Self {
            domain,
            classifier: domain.classifier()?,
            scope,
        })
    }

    /// Monday policy, optionally restricted to one board.
    pub fn monday(allowed_board_id: Option<String>) -> Result<Self, RuleSetError> {
        Self::new(
            Domain::Monday,
            ScopeRestrictor::Board(BoardScope::new(allowed_board_id)),
        )
    }

    /// Slack policy with the given channel scope.
    pub fn slack(channels: ChannelScope) -> Result<Self, RuleSetError> {
        Self::new(Domain::Slack, ScopeRestrictor::Channel(channels))
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn scope(&self) -> &ScopeRestrictor {
        &self.scope
    }

    pub fn classify(&self, operation: &str) -> Verdict {
        self.classifier.classify(operation)
    }

    /// Like [`classify`](Self::classify), but a denial is an error.
    pub fn validate_operation(&self, operation: &str) -> Result<Verdict> {
        let verdict = self.classify(operation);
        if verdict.is_allowed() {
            Ok(verdict)
        } else {
            Err(GateError::rejection(operation, verdict.reason()))
        }
    }

    pub fn filter_catalog(&self, tools: &[ToolDescriptor]) -> Vec<ToolDescriptor> {
        filter_catalog(&self.classifier, tools)
    }

    /// Run every check for one call, possibly adding arguments.
    ///
    /// Order: name classification, raw query inspection, resource scope.
    pub fn check_call(&self, operation: &str, args: &mut Arguments) -> Result<ScopeOutcome> {
        self.validate_operation(operation)?;

        if self.domain.accepts_query_documents() {
            for key in QUERY_DOCUMENT_KEYS {
                if let Some(Value::String(document)) = args.get(*key) {
                    validate_query_document(document)?;
                }
            }
        }

        self.scope.enforce(operation, args)
    }
}

/// Guarded entry point for one domain's transport.
#[derive(Clone)]
pub struct CallGate {
    policy: Arc<DomainPolicy>,
    transport: Arc<dyn Transport>,
    audit: Arc<dyn AuditSink>,
    scope_results: bool,
}

impl CallGate {
    pub fn new(
        policy: Arc<DomainPolicy>,
        transport: Arc<dyn Transport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            policy,
            transport,
            audit,
            scope_results: false,
        }
    }

    /// Also strip out-of-scope boards and channels from successful results.
    pub fn with_result_scoping(mut self, enabled: bool) -> Self {
        self.scope_results = enabled;
        self
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    /// The transport's catalog, reduced to read-only operations.
    pub async fn catalog(&self) -> Result<Vec<ToolDescriptor>> {
        let tools = self.transport.list_operations().await?;
        Ok(self.policy.filter_catalog(&tools))
    }

    /// Check, audit and forward one call.
    pub async fn invoke(&self, operation: &str, mut args: Arguments) -> Result<Value> {
        let domain = self.policy.domain();
        if let Err(e) = self.policy.check_call(operation, &mut args) {
            warn!(%domain, operation, error = %e, "call rejected");
            return Err(e);
        }

        self.audit.record(AuditRecord::new(domain, operation, &args));

        debug!(%domain, operation, "forwarding call");
        let result = self.transport.invoke(operation, args).await?;

        if self.scope_results {
            Ok(scope_result(self.policy.scope(), operation, result))
        } else {
            Ok(result)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;

    use {super::*, serde_json::json};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Arguments)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn list_operations(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
            Ok(vec![
                ToolDescriptor::named("get_boards"),
                ToolDescriptor::named("create_item"),
                ToolDescriptor::named("list_items"),
            ])
        }

        async fn invoke(&self, operation: &str, arguments: Arguments) -> anyhow::Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), arguments));
            match &self.fail_with {
                Some(msg) => anyhow::bail!("{msg}"),
                None => Ok(json!({"ok": true})),
            }
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<AuditRecord>>);

    impl AuditSink for Collect {
        fn record(&self, record: AuditRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn monday_gate(board: Option<&str>) -> (CallGate, Arc<Recorder>, Arc<Collect>) {
        let transport = Arc::new(Recorder::default());
        let audit = Arc::new(Collect::default());
        let policy = Arc::new(DomainPolicy::monday(board.map(String::from)).unwrap());
        let gate = CallGate::new(policy, transport.clone(), audit.clone());
        (gate, transport, audit)
    }

    #[tokio::test]
    async fn write_is_rejected_and_never_forwarded() {
        let (gate, transport, audit) = monday_gate(None);
        let err = gate
            .invoke("create_item", args(json!({"board_id": "123"})))
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::SecurityRejection { .. }));
        let msg = err.to_string();
        assert!(msg.contains(crate::SECURITY_MARKER));
        assert!(msg.contains("create_item"));
        assert!(transport.calls.lock().unwrap().is_empty());
        assert!(audit.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn injects_board_and_audits_before_forwarding() {
        let (gate, transport, audit) = monday_gate(Some("555"));
        gate.invoke("get_board_items", Arguments::new()).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.get("board_id"), Some(&json!("555")));

        let records = audit.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "get_board_items");
        assert!(records[0].arguments.contains("555"));
    }

    #[tokio::test]
    async fn other_board_is_denied() {
        let (gate, transport, _) = monday_gate(Some("555"));
        let err = gate
            .invoke("get_board_items", args(json!({"board_id": "999"})))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AccessDenied { .. }));
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mutation_in_query_argument_is_rejected() {
        let (gate, transport, _) = monday_gate(None);
        let err = gate
            .invoke(
                "query",
                args(json!({"query": "mutation { delete_item(item_id: 1) { id } }"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::QueryRejected { .. }));
        assert!(transport.calls.lock().unwrap().is_empty());

        gate.invoke("query", args(json!({"query": "query { boards { id } }"})))
            .await
            .unwrap();
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_errors_pass_through_after_audit() {
        let transport = Arc::new(Recorder {
            fail_with: Some("upstream 502".into()),
            ..Default::default()
        });
        let audit = Arc::new(Collect::default());
        let gate = CallGate::new(
            Arc::new(DomainPolicy::monday(None).unwrap()),
            transport.clone(),
            audit.clone(),
        );

        let err = gate.invoke("get_boards", Arguments::new()).await.unwrap_err();
        assert!(!err.is_policy_rejection());
        assert_eq!(err.to_string(), "upstream 502");
        assert_eq!(audit.0.lock().unwrap().len(), 1);
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn catalog_is_filtered() {
        let (gate, ..) = monday_gate(None);
        let names: Vec<String> = gate
            .catalog()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["get_boards", "list_items"]);
    }

    #[tokio::test]
    async fn slack_private_channel_is_denied() {
        let transport = Arc::new(Recorder::default());
        let gate = CallGate::new(
            Arc::new(DomainPolicy::slack(ChannelScope::from_csv("C1")).unwrap()),
            transport.clone(),
            Arc::new(Collect::default()),
        );
        let err = gate
            .invoke(
                "conversations.history",
                args(json!({"channel": "C1", "channel_type": "private_channel"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AccessDenied { .. }));

        gate.invoke("conversations.history", args(json!({"channel": "C1"})))
            .await
            .unwrap();
        assert_eq!(transport.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn validate_operation_reports_reason() {
        let policy = DomainPolicy::monday(None).unwrap();
        let err = policy.validate_operation("launch_rockets").unwrap_err();
        assert!(err.to_string().contains("fail-safe"));
        assert!(policy.validate_operation("get_boards").is_ok());
    }
}
