//! Mutation detection for raw GraphQL documents.
//!
//! The document is first sanitized: comments (`#`, `//`, `/* */`) are
//! dropped and string literals (`"…"`, `"""…"""`, `'…'`) are emptied, so a
//! keyword inside a comment or a data value cannot trigger a rejection. An
//! unterminated literal or block comment is kept verbatim.
//!
//! The sanitized text is then split into identifier tokens and any
//! `mutation` token (any casing) rejects the document. This is a token scan,
//! not a parser: it does not track nesting, so a field literally named
//! `mutation` is also rejected.

use tracing::{debug, warn};

use crate::error::{GateError, Result};

const MUTATION: &str = "mutation";

/// Remove comments and string-literal contents from a query document.
pub fn sanitize(document: &str) -> String {
    let mut out = String::with_capacity(document.len());
    let mut rest = document;

    while let Some(ch) = rest.chars().next() {
        if ch == '#' || rest.starts_with("//") {
            // GraphQL line terminators: \n, \r\n and a bare \r.
            match rest.find(['\n', '\r']) {
                Some(end) => rest = &rest[end..],
                None => break,
            }
        } else if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(end) => {
                    out.push(' ');
                    rest = &rest[end + 4..];
                },
                None => {
                    out.push_str(rest);
                    break;
                },
            }
        } else if rest.starts_with("\"\"\"") {
            match rest[3..].find("\"\"\"") {
                Some(end) => {
                    out.push_str("\"\"");
                    rest = &rest[end + 6..];
                },
                None => {
                    out.push_str(rest);
                    break;
                },
            }
        } else if ch == '"' || ch == '\'' {
            match closing_quote(&rest[1..], ch) {
                Some(end) => {
                    out.push(ch);
                    out.push(ch);
                    rest = &rest[end + 2..];
                },
                None => {
                    out.push_str(rest);
                    break;
                },
            }
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}

/// Byte offset of the unescaped closing `quote` in `body`, if any.
fn closing_quote(body: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '\n' => return None,
            c if c == quote && !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Punct(char),
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        let ident_char = c == '_' || c.is_ascii_alphanumeric();
        match (start, ident_char) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                tokens.push(Token::Ident(&text[s..i]));
                start = None;
            },
            _ => {},
        }
        if !ident_char && !c.is_whitespace() && c != ',' {
            tokens.push(Token::Punct(c));
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Ident(&text[s..]));
    }
    tokens
}

/// A detected mutation and what it would have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedMutation {
    /// Operation name, or `None` for an anonymous mutation.
    pub name: Option<String>,
    /// First root field of the selection set (the verb), if present.
    pub root_field: Option<String>,
}

impl DetectedMutation {
    /// Describes the construct, e.g. `mutation 'AddItem' (create_item)`.
    pub fn construct(&self) -> String {
        let name = self.name.as_deref().unwrap_or("anonymous");
        match &self.root_field {
            Some(field) => format!("{MUTATION} '{name}' ({field})"),
            None => format!("{MUTATION} '{name}'"),
        }
    }
}

/// Find the first `mutation` token in a document, after sanitizing.
pub fn detect_mutation(document: &str) -> Option<DetectedMutation> {
    let sanitized = sanitize(document);
    let tokens = tokenize(&sanitized);
    let at = tokens
        .iter()
        .position(|t| matches!(t, Token::Ident(w) if w.eq_ignore_ascii_case(MUTATION)))?;

    let after = &tokens[at + 1..];
    let name = match after.first() {
        Some(Token::Ident(n)) => Some((*n).to_string()),
        _ => None,
    };
    let root_field = after
        .iter()
        .position(|t| *t == Token::Punct('{'))
        .and_then(|open| match after.get(open + 1) {
            Some(Token::Ident(f)) => Some((*f).to_string()),
            _ => None,
        });

    Some(DetectedMutation { name, root_field })
}

/// Reject a raw query document that contains a mutation.
pub fn validate_query_document(document: &str) -> Result<()> {
    if let Some(found) = detect_mutation(document) {
        let construct = found.construct();
        warn!(%construct, "blocked GraphQL mutation");
        return Err(GateError::QueryRejected { construct });
    }
    debug!("GraphQL document is read-only");
    Ok(())
}
