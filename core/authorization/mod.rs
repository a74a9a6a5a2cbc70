//! Hierarchical, parameterized role-based access control.
//!
//! The permission tree ([`catalog`]) and identifier grammar ([`identifier`])
//! feed the matcher ([`evaluator`]); [`roles`] expands role assignments into
//! the same directive shape ([`directive`]) the evaluator already
//! understands, and [`service`] ties claim extraction, role resolution and
//! evaluation together behind the public `has_*` queries.

pub mod cancel;
pub mod catalog;
pub mod directive;
pub mod error;
pub mod evaluator;
pub mod identifier;
pub mod repository;
pub mod roles;
pub mod service;

pub use cancel::CancellationToken;
pub use catalog::{AccessCategory, Catalog, NodeSpec, PermissionNode};
pub use directive::{Action, ScopeDirective};
pub use error::{Error, RepositoryError, Result};
pub use evaluator::evaluate;
pub use identifier::ParsedIdentifier;
pub use repository::{InMemoryRoleRepository, RoleRepository};
pub use roles::{Binding, Role, RoleId, ScopeTemplate};
pub use service::{ClaimSet, PermissionService, TokenClaimsSource};
