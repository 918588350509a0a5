use std::{io::Read, path::Path};

use {
    anyhow::{Context, Result},
    readgate_config::GateConfig,
    readgate_policy::{
        ChannelKind, ChannelScope, Decision, DomainPolicy, ToolDescriptor, validate_query_document,
    },
    serde::Deserialize,
};

/// A catalog as saved from `tools/list`: a bare array or `{"tools": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Bare(Vec<ToolDescriptor>),
    Listing { tools: Vec<ToolDescriptor> },
}

impl CatalogFile {
    fn into_tools(self) -> Vec<ToolDescriptor> {
        match self {
            Self::Bare(tools) | Self::Listing { tools } => tools,
        }
    }
}

pub fn classify(policy: &DomainPolicy, operations: &[String]) -> Result<()> {
    println!("{:<6} {:<45} BASIS", "", "OPERATION");
    for operation in operations {
        let verdict = policy.classify(operation);
        let tag = match verdict.decision {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
        };
        println!("{tag:<6} {operation:<45} {}", verdict.basis);
    }
    Ok(())
}

pub fn check_query(file: Option<&Path>) -> Result<()> {
    let document = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        },
    };
    validate_query_document(&document)?;
    println!("read-only: no mutation found");
    Ok(())
}

pub fn filter_catalog(policy: &DomainPolicy, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let catalog: CatalogFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a tool catalog", file.display()))?;
    let allowed = policy.filter_catalog(&catalog.into_tools());
    println!("{}", serde_json::to_string_pretty(&allowed)?);
    Ok(())
}

pub fn check_channel(config: &GateConfig, channel: &str, kind: Option<&str>) -> Result<()> {
    let kind = kind.map(str::parse::<ChannelKind>).transpose()?;
    let scope = ChannelScope::new(&config.slack.allowed_channels);
    scope.validate(channel, kind)?;
    println!("{channel}: readable");
    Ok(())
}
