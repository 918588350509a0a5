//! Name-based operation classifier.
//!
//! One [`Classifier`] is built per domain from its rule lists. Evaluation
//! short-circuits in this order:
//!
//! 1. Normalize: lower-case, trim, strip a known namespace prefix.
//! 2. Exact blacklist match denies.
//! 3. Exact whitelist match allows.
//! 4. A write keyword anywhere in the name denies.
//! 5. Whitelist prefix match (`entry` + `_`) allows.
//! 6. A read-convention prefix allows, with a warning.
//! 7. Anything else is denied.
//!
//! Whitelist entries are rejected at construction if they contain a write
//! keyword, so steps 3 and 4 can never disagree on an exact entry.

use std::{collections::HashSet, fmt};

use tracing::{debug, warn};

use crate::error::RuleSetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Basis {
    ExplicitBlacklist,
    ExplicitWhitelist,
    WhitelistPrefix(String),
    Keyword(String),
    ReadConvention(String),
    FailSafe,
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitBlacklist => f.write_str("explicit blacklist"),
            Self::ExplicitWhitelist => f.write_str("explicit whitelist"),
            Self::WhitelistPrefix(entry) => write!(f, "whitelist prefix '{entry}'"),
            Self::Keyword(keyword) => write!(f, "fuzzy keyword match '{keyword}'"),
            Self::ReadConvention(prefix) => {
                write!(f, "read convention '{prefix}' (not explicitly listed)")
            },
            Self::FailSafe => f.write_str("fail-safe: unrecognized operation"),
        }
    }
}

/// Outcome of classifying one operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// The name after normalization.
    pub operation: String,
    pub decision: Decision,
    pub basis: Basis,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }

    /// Human-readable reason for the decision.
    pub fn reason(&self) -> String {
        self.basis.to_string()
    }
}

/// Raw rule lists for one domain, as written in source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleLists<'a> {
    /// Namespace prefixes stripped before matching, longest first.
    pub namespaces: &'a [&'a str],
    pub whitelist: &'a [&'a str],
    pub blacklist: &'a [&'a str],
    pub keywords: &'a [&'a str],
    pub read_prefixes: &'a [&'a str],
}

/// Immutable allow/deny classifier for one domain.
#[derive(Debug, Clone)]
pub struct Classifier {
    label: String,
    namespaces: Vec<String>,
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
    keywords: Vec<String>,
    read_prefixes: Vec<String>,
}

fn lowered(entries: &[&str]) -> Result<Vec<String>, RuleSetError> {
    entries
        .iter()
        .map(|e| {
            let e = e.trim().to_lowercase();
            if e.is_empty() {
                Err(RuleSetError::EmptyEntry)
            } else {
                Ok(e)
            }
        })
        .collect()
}

impl Classifier {
    /// Build a classifier, validating that the lists are consistent.
    pub fn new(label: impl Into<String>, lists: RuleLists<'_>) -> Result<Self, RuleSetError> {
        let whitelist: HashSet<String> = lowered(lists.whitelist)?.into_iter().collect();
        let blacklist: HashSet<String> = lowered(lists.blacklist)?.into_iter().collect();
        let keywords = lowered(lists.keywords)?;

        if let Some(both) = whitelist.intersection(&blacklist).next() {
            return Err(RuleSetError::Overlap(both.clone()));
        }
        for entry in &whitelist {
            if let Some(keyword) = keywords.iter().find(|k| entry.contains(k.as_str())) {
                return Err(RuleSetError::KeywordInWhitelist {
                    entry: entry.clone(),
                    keyword: keyword.clone(),
                });
            }
        }

        let mut namespaces = lowered(lists.namespaces)?;
        namespaces.sort_by_key(|n| std::cmp::Reverse(n.len()));

        Ok(Self {
            label: label.into(),
            namespaces,
            whitelist,
            blacklist,
            keywords,
            read_prefixes: lowered(lists.read_prefixes)?,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Lower-case, trim, and strip the first matching namespace prefix.
    pub fn normalize(&self, name: &str) -> String {
        let lower = name.trim().to_lowercase();
        for ns in &self.namespaces {
            if let Some(rest) = lower.strip_prefix(ns.as_str())
                && !rest.is_empty()
            {
                return rest.to_string();
            }
        }
        lower
    }

    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.contains(&self.normalize(name))
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(&self.normalize(name))
    }

    /// Iterate the whitelist (unordered).
    pub fn whitelist(&self) -> impl Iterator<Item = &str> {
        self.whitelist.iter().map(String::as_str)
    }

    /// Iterate the blacklist (unordered).
    pub fn blacklist(&self) -> impl Iterator<Item = &str> {
        self.blacklist.iter().map(String::as_str)
    }

    /// Classify an operation name. Stateless; safe to call concurrently.
    pub fn classify(&self, name: &str) -> Verdict {
        let operation = self.normalize(name);
        let basis = self.evaluate(&operation);
        let decision = match basis {
            Basis::ExplicitWhitelist | Basis::WhitelistPrefix(_) | Basis::ReadConvention(_) => {
                Decision::Allow
            },
            Basis::ExplicitBlacklist | Basis::Keyword(_) | Basis::FailSafe => Decision::Deny,
        };

        match (&decision, &basis) {
            (Decision::Deny, _) => {
                warn!(
                    domain = %self.label,
                    operation = %name,
                    reason = %basis,
                    "blocked operation"
                );
            },
            (Decision::Allow, Basis::ReadConvention(_)) => {
                warn!(
                    domain = %self.label,
                    operation = %name,
                    reason = %basis,
                    "allowed unlisted operation by naming convention"
                );
            },
            (Decision::Allow, _) => {
                debug!(
                    domain = %self.label,
                    operation = %name,
                    reason = %basis,
                    "allowed operation"
                );
            },
        }

        Verdict {
            operation,
            decision,
            basis,
        }
    }

    fn evaluate(&self, operation: &str) -> Basis {
        if operation.is_empty() {
            return Basis::FailSafe;
        }
        if self.blacklist.contains(operation) {
            return Basis::ExplicitBlacklist;
        }
        if self.whitelist.contains(operation) {
            return Basis::ExplicitWhitelist;
        }
        if let Some(keyword) = self.keywords.iter().find(|k| operation.contains(k.as_str())) {
            return Basis::Keyword(keyword.clone());
        }
        if let Some(entry) = self
            .whitelist
            .iter()
            .filter(|e| {
                operation
                    .strip_prefix(e.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|e| e.len())
        {
            return Basis::WhitelistPrefix(entry.clone());
        }
        // Dotted method names (`users.getPresence`) carry the verb in the last segment.
        let verb = operation.rsplit('.').next().unwrap_or(operation);
        if let Some(prefix) = self
            .read_prefixes
            .iter()
            .find(|p| verb.starts_with(p.as_str()))
        {
            return Basis::ReadConvention(prefix.clone());
        }
        Basis::FailSafe
    }
}
