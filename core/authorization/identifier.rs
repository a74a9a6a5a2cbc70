//! Identifier grammar and canonicalization.
//!
//! ```text
//! identifier   := path ( ';' kv )*
//! path         := segment ( ':' segment )*
//! segment      := [A-Za-z0-9_]+
//! kv           := key '=' value
//! key          := [A-Za-z][A-Za-z0-9_]*
//! value        := any run of characters excluding ';' and unescaped '='
//! ```

use std::collections::BTreeMap;

use crate::authorization::catalog::{Catalog, READ_WILDCARD, WRITE_WILDCARD};
use crate::authorization::error::Error;

/// The result of parsing `path;k=v;...`. `parameters` preserves the order
/// the caller wrote them in; `identifier` renders them back out sorted by
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentifier {
    pub canonical: String,
    pub parameters: Vec<(String, String)>,
}

impl ParsedIdentifier {
    /// The full canonical rendering: path plus parameters in lexicographic
    /// key order.
    pub fn identifier(&self) -> String {
        if self.parameters.is_empty() {
            return self.canonical.clone();
        }
        let mut sorted: BTreeMap<&str, &str> = BTreeMap::new();
        for (k, v) in &self.parameters {
            sorted.insert(k.as_str(), v.as_str());
        }
        let mut out = self.canonical.clone();
        for (k, v) in sorted {
            out.push(';');
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_key(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Total parse: never panics for any input, returns `None` on malformed
/// input. Used inside the evaluator path, where a malformed directive must
/// not crash the check.
pub fn try_parse(s: &str) -> Option<ParsedIdentifier> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut parts = s.split(';').map(str::trim);
    let path = parts.next()?;
    if path.is_empty() || !path.split(':').all(is_segment) {
        return None;
    }

    let mut parameters = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for kv in parts {
        let (key, value) = kv.split_once('=')?;
        let key = key.trim();
        let value = value.trim();
        if !is_key(key) || value.contains(';') {
            return None;
        }
        if !seen.insert(key.to_string()) {
            return None;
        }
        parameters.push((key.to_string(), value.to_string()));
    }

    Some(ParsedIdentifier {
        canonical: path.to_string(),
        parameters,
    })
}

/// Fallible parse used at admin ingress. Distinguishes a duplicate
/// parameter key from any other malformed input, so callers get
/// `DuplicateParameter` rather than a generic `MalformedIdentifier`.
pub fn parse(s: &str) -> Result<ParsedIdentifier, Error> {
    let trimmed = s.trim();
    let mut seen = std::collections::HashSet::new();
    for kv in trimmed.split(';').skip(1) {
        if let Some((key, _)) = kv.trim().split_once('=') {
            let key = key.trim();
            if !seen.insert(key.to_string()) {
                return Err(Error::DuplicateParameter(key.to_string()));
            }
        }
    }

    try_parse(s).ok_or_else(|| Error::MalformedIdentifier(s.to_string()))
}

/// Validates a parsed identifier against the catalog: the path must exist,
/// and every parameter key must be declared somewhere in the node's
/// hierarchy or reachable set — except for root-level `_read`/`_write`,
/// which accept any parameters.
pub fn validate(parsed: &ParsedIdentifier, catalog: &Catalog) -> Result<(), Error> {
    let node = catalog
        .get(&parsed.canonical)
        .ok_or_else(|| Error::UnknownPath(parsed.canonical.clone()))?;

    let is_root_wildcard = node.parent.is_none()
        && (node.identifier == READ_WILDCARD || node.identifier == WRITE_WILDCARD);
    if is_root_wildcard {
        return Ok(());
    }

    for (key, _) in &parsed.parameters {
        let declared = node.parameter_hierarchy.iter().any(|p| p == key)
            || node.reachable_parameters.contains(key);
        if !declared {
            return Err(Error::InvalidParameter(key.clone()));
        }
    }

    Ok(())
}
