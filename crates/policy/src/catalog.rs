//! Read-only filtering of a transport's tool catalog.

use {
    serde::{Deserialize, Serialize},
    tracing::{info, warn},
};

use crate::classifier::Classifier;

/// One operation as advertised by a transport's introspection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", alias = "input_schema", default)]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::Value::Null,
        }
    }
}

/// Keep only the entries the classifier allows, in their original order.
pub fn filter_catalog(classifier: &Classifier, tools: &[ToolDescriptor]) -> Vec<ToolDescriptor> {
    let allowed: Vec<ToolDescriptor> = tools
        .iter()
        .filter(|tool| {
            let verdict = classifier.classify(&tool.name);
            if !verdict.is_allowed() {
                warn!(
                    domain = %classifier.label(),
                    tool = %tool.name,
                    reason = %verdict.basis,
                    "removed write operation from catalog"
                );
            }
            verdict.is_allowed()
        })
        .cloned()
        .collect();

    info!(
        domain = %classifier.label(),
        allowed = allowed.len(),
        total = tools.len(),
        "loaded {} read-only tools out of {}",
        allowed.len(),
        tools.len()
    );
    allowed
}
