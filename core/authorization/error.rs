use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced at ingress — token issuance, mutation, or explicit
/// identifier validation. Never returned from a `has_*` check: those
/// answer with a plain `bool`, dropping anything that doesn't parse.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed identifier: {0:?}")]
    MalformedIdentifier(String),

    #[error("unknown permission path: {0}")]
    UnknownPath(String),

    #[error("permission {0} has no access category and cannot be granted")]
    UnassignablePermission(String),

    #[error("parameter {0:?} is not recognized for this permission")]
    InvalidParameter(String),

    #[error("parameter {0:?} is given more than once")]
    DuplicateParameter(String),

    #[error("role template is missing required parameter {0:?}")]
    MissingRoleParameter(String),

    #[error("mutation may not touch reserved claim {0:?}")]
    ReservedClaim(String),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("role repository failed: {0}")]
    Repository(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<RepositoryError> for Error {
    fn from(e: RepositoryError) -> Self {
        Error::Repository(e.0.to_string())
    }
}

/// Opaque failure from a [`RoleRepository`](crate::authorization::repository::RoleRepository)
/// call. Never inspected beyond "it failed": a repository failure aborts
/// the check and surfaces to the caller.
#[derive(Debug, Error, Diagnostic)]
#[error(transparent)]
pub struct RepositoryError(#[from] pub anyhow::Error);
