//! Roles and scope templates.
//!
//! A [`Role`] bundles [`ScopeTemplate`]s; each template's parameter
//! bindings may be literal strings or `{placeholder}` references resolved
//! against an assignment's parameter values at evaluation time. Roles have
//! no hierarchy of their own — every `Role` expands directly to directives.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::authorization::directive::{Action, ScopeDirective};
use crate::authorization::error::Error;

pub type RoleId = Uuid;

/// One binding in a [`ScopeTemplate`]: either a literal value or a
/// placeholder resolved from the assignment's parameters at expansion time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Literal(String),
    Placeholder(String),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Literal(v) => write!(f, "{v}"),
            Binding::Placeholder(name) => write!(f, "{{{name}}}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeTemplate {
    pub action: Action,
    pub path: String,
    pub parameter_bindings: Vec<(String, Binding)>,
}

impl ScopeTemplate {
    pub fn new(action: Action, path: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
            parameter_bindings: Vec::new(),
        }
    }

    pub fn literal(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_bindings.push((key.into(), Binding::Literal(value.into())));
        self
    }

    pub fn placeholder(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.parameter_bindings
            .push((key.into(), Binding::Placeholder(name.into())));
        self
    }

    /// The placeholder names this template requires to expand.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameter_bindings.iter().filter_map(|(_, b)| match b {
            Binding::Placeholder(name) => Some(name.as_str()),
            Binding::Literal(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Case-insensitive unique code, as it appears in a `role` claim.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Static roles are seeded at init and immutable: they cannot be
    /// renamed, retemplated, or deleted.
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub scope_templates: Vec<ScopeTemplate>,
}

impl Role {
    /// Expands a single template against assignment values. A missing or
    /// `None` placeholder value fails with `MissingRoleParameter`.
    pub fn expand_template(
        template: &ScopeTemplate,
        values: &HashMap<String, Option<String>>,
    ) -> Result<ScopeDirective, Error> {
        let mut parameters = Vec::with_capacity(template.parameter_bindings.len());
        for (key, binding) in &template.parameter_bindings {
            let value = match binding {
                Binding::Literal(v) => v.clone(),
                Binding::Placeholder(name) => values
                    .get(name)
                    .and_then(|v| v.clone())
                    .ok_or_else(|| Error::MissingRoleParameter(name.clone()))?,
            };
            parameters.push((key.clone(), value));
        }

        Ok(ScopeDirective {
            action: template.action,
            path: template.path.clone(),
            parameters,
        })
    }

    /// Expands every template whose required parameters are fully
    /// satisfied by `values`, silently skipping the rest — an
    /// under-provisioned assignment must not deny service entirely.
    pub fn expand_all(&self, values: &HashMap<String, Option<String>>) -> Vec<ScopeDirective> {
        self.scope_templates
            .iter()
            .filter_map(|t| Self::expand_template(t, values).ok())
            .collect()
    }
}

/// Parses a `role` claim value `CODE;k=v;...` into a case-preserved code
/// (comparisons against it are case-insensitive) and its assignment
/// parameters. Returns `None` for malformed input — dropped silently during
/// claim extraction.
pub fn parse_role_claim(s: &str) -> Option<(String, HashMap<String, Option<String>>)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut parts = s.split(';').map(str::trim);
    let code = parts.next()?;
    if code.is_empty() {
        return None;
    }

    let mut values = HashMap::new();
    for kv in parts {
        let (key, value) = kv.split_once('=')?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return None;
        }
        values.insert(key.to_string(), Some(value.to_string()));
    }

    Some((code.to_string(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with_template(template: ScopeTemplate) -> Role {
        Role {
            id: Uuid::nil(),
            code: "USER".to_string(),
            name: "User".to_string(),
            description: String::new(),
            is_system: false,
            parameters: vec!["roleUserId".to_string()],
            scope_templates: vec![template],
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    #[test]
    fn expand_template_substitutes_placeholder() {
        let template = ScopeTemplate::new(Action::Allow, "_read").placeholder("userId", "roleUserId");
        let d = Role::expand_template(&template, &values(&[("roleUserId", "U1")])).unwrap();
        assert_eq!(d.param("userId"), Some("U1"));
    }

    #[test]
    fn expand_template_keeps_literals() {
        let template = ScopeTemplate::new(Action::Allow, "api:auth:me").literal("scope", "self");
        let d = Role::expand_template(&template, &HashMap::new()).unwrap();
        assert_eq!(d.param("scope"), Some("self"));
    }

    #[test]
    fn expand_template_fails_on_missing_placeholder() {
        let template = ScopeTemplate::new(Action::Allow, "_read").placeholder("userId", "roleUserId");
        let err = Role::expand_template(&template, &HashMap::new()).unwrap_err();
        assert_eq!(err, Error::MissingRoleParameter("roleUserId".to_string()));
    }

    #[test]
    fn expand_template_fails_on_null_placeholder_value() {
        let template = ScopeTemplate::new(Action::Allow, "_read").placeholder("userId", "roleUserId");
        let mut vals = HashMap::new();
        vals.insert("roleUserId".to_string(), None);
        assert!(Role::expand_template(&template, &vals).is_err());
    }

    /// role `USER;roleUserId=U1` with template
    /// `allow;_read;userId={roleUserId}` expands to a directive scoped to
    /// that one assignment value.
    #[test]
    fn role_expansion_scopes_to_assignment_value() {
        let role = role_with_template(
            ScopeTemplate::new(Action::Allow, "_read").placeholder("userId", "roleUserId"),
        );
        let directives = role.expand_all(&values(&[("roleUserId", "U1")]));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].param("userId"), Some("U1"));
    }

    #[test]
    fn expand_all_skips_templates_missing_their_own_parameters_without_failing() {
        let role = Role {
            id: Uuid::nil(),
            code: "MIXED".to_string(),
            name: "Mixed".to_string(),
            description: String::new(),
            is_system: false,
            parameters: vec![],
            scope_templates: vec![
                ScopeTemplate::new(Action::Allow, "api:auth:me"),
                ScopeTemplate::new(Action::Allow, "_read").placeholder("userId", "missing"),
            ],
        };
        let directives = role.expand_all(&HashMap::new());
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].path, "api:auth:me");
    }

    #[test]
    fn parses_role_claim() {
        let (code, params) = parse_role_claim("USER;roleUserId=U1").unwrap();
        assert_eq!(code, "USER");
        assert_eq!(params.get("roleUserId"), Some(&Some("U1".to_string())));
    }

    #[test]
    fn parses_role_claim_without_parameters() {
        let (code, params) = parse_role_claim("ADMIN").unwrap();
        assert_eq!(code, "ADMIN");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_empty_role_claim() {
        assert!(parse_role_claim("").is_none());
        assert!(parse_role_claim("   ").is_none());
    }
}
