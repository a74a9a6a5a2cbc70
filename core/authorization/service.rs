//! The permission service — the orchestrator.
//!
//! Wires claim extraction, role expansion and the evaluator together behind
//! four cancellable, never-throwing `has_*` queries plus the two ingress
//! helpers `validate_identifiers`/`resolve`. Callers hold one of these per
//! catalog/repository pair; it owns neither.

use std::collections::HashMap;

use crate::authorization::cancel::{self, CancellationToken};
use crate::authorization::catalog::{AccessCategory, Catalog, PermissionNode};
use crate::authorization::directive::{self, ScopeDirective};
use crate::authorization::error::Error;
use crate::authorization::evaluator;
use crate::authorization::identifier::{self, ParsedIdentifier};
use crate::authorization::repository::RoleRepository;
use crate::authorization::roles::parse_role_claim;

/// Claim types consumed by the extraction pipeline below.
pub mod claim {
    pub const SCOPE: &str = "scope";
    pub const ROLE: &str = "role";
    pub const RBAC_VERSION: &str = "rbac_version";
}

/// Claims an external token mutation surface must never add, remove, or
/// strip directly.
const RESERVED_CLAIMS: &[&str] = &["sub", "jti", "iat", "name", claim::SCOPE];

/// Refuses mutation of a reserved claim type. Callable by an external token
/// service before it adds/removes/strips a claim; this crate does not
/// perform the mutation itself.
pub fn assert_mutable(claim_type: &str) -> Result<(), Error> {
    if RESERVED_CLAIMS.contains(&claim_type) {
        Err(Error::ReservedClaim(claim_type.to_string()))
    } else {
        Ok(())
    }
}

/// A validated token's claims, keyed by claim type. Multiple occurrences
/// of a repeatable claim (`role`) are all kept; `rbac_version` and `sub`
/// are expected to carry exactly one value.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    values: HashMap<String, Vec<String>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.entry(claim_type.into()).or_default().push(value.into());
        self
    }

    pub fn get_one(&self, claim_type: &str) -> Option<&str> {
        self.values.get(claim_type).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn get_all(&self, claim_type: &str) -> &[String] {
        self.values.get(claim_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Marker trait for whatever external component hands back a validated
/// [`ClaimSet`]; this crate only needs the shape of the result, not the
/// validation itself.
pub trait TokenClaimsSource {
    fn claims(&self) -> &ClaimSet;
}

/// Orchestrates catalog lookups, role expansion and evaluation. Does not
/// own the catalog or the repository; both are injected.
pub struct PermissionService<R: RoleRepository> {
    catalog: Catalog,
    repository: R,
}

impl<R: RoleRepository> PermissionService<R> {
    pub fn new(catalog: Catalog, repository: R) -> Self {
        Self { catalog, repository }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses and validates a requested identifier for evaluation: it must
    /// parse, exist in the catalog, and carry only recognized parameters.
    /// Unlike [`validate_one`](Self::validate_one), a container permission
    /// is accepted here — the evaluator itself decides whether an
    /// `Unspecified`-category path is reachable through a hierarchical or
    /// wildcard directive.
    fn parse_request(&self, s: &str) -> Result<ParsedIdentifier, Error> {
        let parsed = identifier::parse(s)?;
        identifier::validate(&parsed, &self.catalog)?;
        Ok(parsed)
    }

    /// Every identifier must parse, exist in the catalog, be assignable
    /// (not `Unspecified`), and carry only recognized parameters.
    pub fn validate_identifiers(&self, identifiers: &[String]) -> bool {
        identifiers.iter().all(|s| self.validate_one(s).is_ok())
    }

    /// Validates an identifier for the admin-facing surface
    /// (`validate_identifiers`/`resolve`), where only assignable leaves make
    /// sense as a grant target. `has_permission` does not use this — see
    /// [`parse_request`](Self::parse_request).
    fn validate_one(&self, s: &str) -> Result<ParsedIdentifier, Error> {
        let parsed = identifier::parse(s)?;
        identifier::validate(&parsed, &self.catalog)?;
        let node = self
            .catalog
            .get(&parsed.canonical)
            .ok_or_else(|| Error::UnknownPath(parsed.canonical.clone()))?;
        if node.access_category == AccessCategory::Unspecified {
            return Err(Error::UnassignablePermission(parsed.canonical.clone()));
        }
        Ok(parsed)
    }

    /// Parses and filters identifiers down to the catalog nodes they name;
    /// invalid or unassignable entries are dropped rather than failing the
    /// whole batch.
    pub fn resolve(&self, identifiers: &[String]) -> Vec<&PermissionNode> {
        identifiers
            .iter()
            .filter_map(|s| self.validate_one(s).ok())
            .filter_map(|parsed| self.catalog.get(&parsed.canonical))
            .collect()
    }

    /// Gathers direct `scope` directives plus every role claim expanded
    /// against its repository definition. Malformed tokens, unknown role
    /// codes and under-provisioned templates are silently dropped — a
    /// repository failure still aborts the check.
    async fn extract_directives(
        &self,
        claims: &ClaimSet,
        token: &CancellationToken,
    ) -> Result<Vec<ScopeDirective>, Error> {
        cancel::check(token)?;

        let mut directives = Vec::new();
        for scope_value in claims.get_all(claim::SCOPE) {
            directives.extend(directive::parse_many(scope_value));
        }

        let mut assignments: Vec<(String, HashMap<String, Option<String>>)> = Vec::new();
        for role_value in claims.get_all(claim::ROLE) {
            if let Some(parsed) = parse_role_claim(role_value) {
                assignments.push(parsed);
            }
        }

        if assignments.is_empty() {
            return Ok(directives);
        }

        let codes: Vec<String> = {
            let mut seen = std::collections::HashSet::new();
            assignments
                .iter()
                .filter(|(code, _)| seen.insert(code.to_ascii_lowercase()))
                .map(|(code, _)| code.clone())
                .collect()
        };

        cancel::check(token)?;
        let roles = self.repository.get_by_codes(&codes, token).await?;

        for (code, values) in &assignments {
            if let Some(role) = roles
                .iter()
                .find(|r| r.code.eq_ignore_ascii_case(code))
            {
                directives.extend(role.expand_all(values));
            }
        }

        Ok(directives)
    }

    /// Whether `rbac_version` is absent or `"1"` — legacy tokens grant
    /// unconditionally for every valid identifier.
    fn is_legacy(claims: &ClaimSet) -> bool {
        matches!(claims.get_one(claim::RBAC_VERSION), None | Some("1"))
    }

    pub async fn has_permission(
        &self,
        claims: &ClaimSet,
        identifier: &str,
        token: &CancellationToken,
    ) -> Result<bool, Error> {
        let _span = tracing::debug_span!("has_permission", identifier).entered();
        cancel::check(token)?;

        let parsed = match self.parse_request(identifier) {
            Ok(p) => p,
            Err(error) => {
                tracing::debug!(%error, "requested identifier did not validate");
                return Ok(false);
            }
        };

        if Self::is_legacy(claims) {
            tracing::trace!("legacy rbac_version, granting unconditionally");
            return Ok(true);
        }

        let directives = self.extract_directives(claims, token).await?;
        let request: HashMap<String, String> = parsed.parameters.iter().cloned().collect();

        cancel::check(token)?;
        let allowed = evaluator::evaluate(&self.catalog, &directives, &parsed.canonical, &request);
        tracing::debug!(allowed, directive_count = directives.len(), "permission check complete");
        Ok(allowed)
    }

    pub async fn has_any(
        &self,
        claims: &ClaimSet,
        identifiers: &[String],
        token: &CancellationToken,
    ) -> Result<bool, Error> {
        for id in identifiers {
            if self.has_permission(claims, id, token).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn has_all(
        &self,
        claims: &ClaimSet,
        identifiers: &[String],
        token: &CancellationToken,
    ) -> Result<bool, Error> {
        for id in identifiers {
            if !self.has_permission(claims, id, token).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
