//! The scope evaluator — the heart of the subsystem.
//!
//! Pure and stateless: every input is explicit, nothing is cached here.
//! Combines path hierarchy, read/write wildcards, parameter compatibility
//! and allow/deny precedence into a single boolean.

use std::collections::HashMap;

use crate::authorization::catalog::{AccessCategory, Catalog, READ_WILDCARD, WRITE_WILDCARD};
use crate::authorization::directive::{Action, ScopeDirective};

/// Does directive path `dp` match request path `p`?
pub fn path_matches(catalog: &Catalog, dp: &str, p: &str) -> bool {
    // 1. Exact.
    if dp == p {
        return true;
    }

    // 3/4. Global wildcards at root.
    if dp == READ_WILDCARD || dp == WRITE_WILDCARD {
        let wanted = if dp == READ_WILDCARD {
            AccessCategory::Read
        } else {
            AccessCategory::Write
        };
        return catalog
            .get(p)
            .map(|n| n.access_category == wanted || n.access_category == AccessCategory::Unspecified)
            .unwrap_or(false);
    }

    // 5/6. Scoped wildcards: `X:_read` / `X:_write`.
    if let Some(x) = dp.strip_suffix(&format!(":{READ_WILDCARD}")) {
        return scoped_wildcard_matches(catalog, x, p, AccessCategory::Read);
    }
    if let Some(x) = dp.strip_suffix(&format!(":{WRITE_WILDCARD}")) {
        return scoped_wildcard_matches(catalog, x, p, AccessCategory::Write);
    }

    // 2. Hierarchical container: `dp` is a strict ancestor of `p`, and `dp`
    // is not itself a wildcard suffix (already handled above).
    catalog.is_descendant(dp, p)
}

fn scoped_wildcard_matches(catalog: &Catalog, x: &str, p: &str, category: AccessCategory) -> bool {
    if p == x {
        return catalog.has_wildcard_child(x, category);
    }
    if catalog.is_descendant(x, p) {
        return catalog
            .get(p)
            .map(|n| n.access_category == category)
            .unwrap_or(false);
    }
    false
}

/// Every `(k, v)` in the directive's parameters must be present and equal
/// in the request map. Extra request keys are ignored. Empty directive
/// parameters match anything.
pub fn params_compatible(directive_params: &[(String, String)], request: &HashMap<String, String>) -> bool {
    directive_params
        .iter()
        .all(|(k, v)| request.get(k).map(|rv| rv == v).unwrap_or(false))
}

/// Deny wins: an allow only holds if no matching deny exists. An empty
/// directive set is `false`.
pub fn evaluate(
    catalog: &Catalog,
    directives: &[ScopeDirective],
    path: &str,
    request: &HashMap<String, String>,
) -> bool {
    if directives.is_empty() {
        return false;
    }

    let mut allowed = false;
    let mut denied = false;

    for d in directives {
        if !path_matches(catalog, &d.path, path) || !params_compatible(&d.parameters, request) {
            continue;
        }
        match d.action {
            Action::Allow => allowed = true,
            Action::Deny => denied = true,
        }
        if allowed && denied {
            break;
        }
    }

    allowed && !denied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::catalog::tests::scenario_catalog;
    use crate::authorization::directive::try_parse;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn d(s: &str) -> ScopeDirective {
        try_parse(s).unwrap()
    }

    #[test]
    fn exact_allow_same_params() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users:read;userId=U1")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &params(&[("userId", "U1")])
        ));
    }

    #[test]
    fn exact_allow_mismatched_params() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users:read;userId=U1")];
        assert!(!evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &params(&[("userId", "U2")])
        ));
    }

    #[test]
    fn global_read_wildcard_with_param() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;_read;userId=U1")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &params(&[("userId", "U1")])
        ));
    }

    #[test]
    fn global_read_wildcard_does_not_cover_write() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;_read;userId=U1")];
        assert!(!evaluate(
            &catalog,
            &directives,
            "api:iam:users:update",
            &params(&[("userId", "U1")])
        ));
    }

    #[test]
    fn read_and_write_wildcards_cover_any_leaf() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;_read"), d("allow;_write")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:delete",
            &params(&[("userId", "X")])
        ));
    }

    #[test]
    fn explicit_deny_overrides_write_wildcard() {
        let catalog = scenario_catalog();
        let directives = vec![
            d("allow;_write;userId=U"),
            d("deny;api:auth:refresh;userId=U"),
        ];
        assert!(!evaluate(
            &catalog,
            &directives,
            "api:auth:refresh",
            &params(&[("userId", "U")])
        ));
    }

    #[test]
    fn unrelated_allow_does_not_match() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:auth:refresh;userId=U")];
        assert!(!evaluate(
            &catalog,
            &directives,
            "api:auth:me",
            &params(&[("userId", "U")])
        ));
    }

    #[test]
    fn empty_directive_set_is_false() {
        let catalog = scenario_catalog();
        assert!(!evaluate(&catalog, &[], "api:iam:users:read", &HashMap::new()));
    }

    #[test]
    fn scoped_wildcard_is_local_to_its_subtree() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users:_read")];
        // A sibling container's read leaf is untouched by the scoped wildcard.
        assert!(!evaluate(&catalog, &directives, "api:auth:me", &HashMap::new()));
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &HashMap::new()
        ));
    }

    #[test]
    fn extra_request_parameters_are_accepted() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users:read;userId=U1")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &params(&[("userId", "U1"), ("traceId", "abc")])
        ));
    }

    #[test]
    fn directive_with_no_parameters_matches_any_request() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users:read")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &params(&[("userId", "anything")])
        ));
    }

    #[test]
    fn hierarchical_container_allow_covers_descendant_leaf() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;api:iam:users")];
        assert!(evaluate(
            &catalog,
            &directives,
            "api:iam:users:read",
            &HashMap::new()
        ));
    }

    #[test]
    fn parameter_superset_monotonicity() {
        let catalog = scenario_catalog();
        let directives = vec![d("allow;_read;userId=U1")];
        let r = params(&[("userId", "U1")]);
        assert!(evaluate(&catalog, &directives, "api:iam:users:read", &r));
        let mut r2 = r.clone();
        r2.insert("extra".to_string(), "zzz".to_string());
        assert!(evaluate(&catalog, &directives, "api:iam:users:read", &r2));
    }
}
