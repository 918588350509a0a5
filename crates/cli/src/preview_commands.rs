//! `readgate preview`: run one call through the real gate without a network.

use std::sync::Arc;

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    readgate_config::GateConfig,
    readgate_policy::{
        Arguments, AuditSink, CallGate, Domain, JsonlAuditSink, ToolDescriptor, TracingAuditSink,
        Transport,
    },
    serde_json::{Value, json},
};

use crate::policy_for;

/// Answers every call with the operation and arguments it received.
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn list_operations(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(Vec::new())
    }

    async fn invoke(&self, operation: &str, arguments: Arguments) -> Result<Value> {
        Ok(json!({ "operation": operation, "arguments": arguments }))
    }
}

fn parse_arguments(raw: &str) -> Result<Arguments> {
    match serde_json::from_str(raw).context("arguments must be JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("arguments must be a JSON object, got {other}"),
    }
}

pub async fn preview(
    config: &GateConfig,
    domain: Domain,
    operation: &str,
    arguments: &str,
) -> Result<()> {
    let arguments = parse_arguments(arguments)?;
    let policy = Arc::new(policy_for(domain, config)?);
    let scope_results = match domain {
        Domain::Monday => config.monday.scope_results,
        Domain::Slack => config.slack.scope_results,
    };

    let jsonl = match &config.audit.path {
        Some(path) => Some(Arc::new(JsonlAuditSink::start(path, config.audit.capacity).await?)),
        None => None,
    };
    let audit: Arc<dyn AuditSink> = match &jsonl {
        Some(sink) => sink.clone(),
        None => Arc::new(TracingAuditSink),
    };

    let gate = CallGate::new(policy, Arc::new(EchoTransport), audit)
        .with_result_scoping(scope_results);
    let outcome = gate.invoke(operation, arguments).await;
    drop(gate);

    if let Some(sink) = jsonl.and_then(Arc::into_inner) {
        sink.shutdown().await;
    }

    let forwarded = outcome?;
    println!("{}", serde_json::to_string_pretty(&forwarded)?);
    Ok(())
}
