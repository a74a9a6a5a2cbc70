//! Scope directives — `allow|deny;path;k=v;...`.
//!
//! A directive is additive: absent parameters are unconstrained, present
//! ones are exact-match constraints the request must satisfy.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Action {
    Allow,
    Deny,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Deny => write!(f, "deny"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeDirective {
    pub action: Action,
    pub path: String,
    pub parameters: Vec<(String, String)>,
}

impl ScopeDirective {
    pub fn new(action: Action, path: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Total parse: returns `None` for any malformed directive string instead
/// of failing — malformed directives in a claim set are silently dropped,
/// never crash a check.
pub fn try_parse(s: &str) -> Option<ScopeDirective> {
    let mut parts = s.split(';').map(str::trim);

    let action = match parts.next()? {
        "allow" => Action::Allow,
        "deny" => Action::Deny,
        _ => return None,
    };

    let path = parts.next()?;
    if path.is_empty() {
        return None;
    }
    if !path.split(':').all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')) {
        return None;
    }

    let mut parameters = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for kv in parts {
        let (key, value) = kv.split_once('=')?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.contains(';') {
            return None;
        }
        if !seen.insert(key.to_string()) {
            return None;
        }
        parameters.push((key.to_string(), value.to_string()));
    }

    Some(ScopeDirective {
        action,
        path: path.to_string(),
        parameters,
    })
}

/// Parse a space-separated list of directives from one `scope` claim
/// value, dropping anything malformed.
pub fn parse_many(claim_value: &str) -> Vec<ScopeDirective> {
    claim_value
        .split_whitespace()
        .filter_map(try_parse)
        .collect()
}

/// Inverse of [`try_parse`]: parameters are rendered sorted by key.
pub fn format(d: &ScopeDirective) -> String {
    let mut out = format!("{};{}", d.action, d.path);
    if !d.parameters.is_empty() {
        let sorted: BTreeMap<&str, &str> = d
            .parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (k, v) in sorted {
            out.push(';');
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allow_without_parameters() {
        let d = try_parse("allow;api:iam:users:read").unwrap();
        assert_eq!(d.action, Action::Allow);
        assert_eq!(d.path, "api:iam:users:read");
        assert!(d.parameters.is_empty());
    }

    #[test]
    fn parses_deny_with_parameters() {
        let d = try_parse("deny;api:auth:refresh;userId=U1").unwrap();
        assert_eq!(d.action, Action::Deny);
        assert_eq!(d.param("userId"), Some("U1"));
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(try_parse("maybe;api:iam:users:read").is_none());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(try_parse("allow;").is_none());
    }

    #[test]
    fn trims_whitespace() {
        let d = try_parse(" allow ; api:iam:users:read ; userId = U1 ").unwrap();
        assert_eq!(d.path, "api:iam:users:read");
        assert_eq!(d.param("userId"), Some("U1"));
    }

    #[test]
    fn parse_many_drops_malformed_tokens() {
        let directives = parse_many("allow;api:iam:users:read bogus-token deny;api:auth:refresh");
        assert_eq!(directives.len(), 2);
    }

    #[test]
    fn round_trip_format_parse() {
        for s in [
            "allow;api:iam:users:read",
            "deny;api:auth:refresh;userId=U1",
            "allow;_read",
            "allow;api:iam:users:_read",
        ] {
            let parsed = try_parse(s).unwrap();
            assert_eq!(format(&parsed), s);
        }
    }

    #[test]
    fn format_sorts_parameters_by_key() {
        let d = ScopeDirective::new(Action::Allow, "api:iam:users:read")
            .with_parameter("b", "2")
            .with_parameter("a", "1");
        assert_eq!(format(&d), "allow;api:iam:users:read;a=1;b=2");
    }
}
