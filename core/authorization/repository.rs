//! External collaborator contracts: the role store this crate consumes but
//! does not own.
//!
//! Create/update/delete are admin operations served by the repository
//! implementation; a change must be visible to the very next check that
//! reads it, with no caching layer in between.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::authorization::cancel::{self, CancellationToken};
use crate::authorization::error::RepositoryError;
use crate::authorization::roles::{Role, RoleId};

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn get_by_codes(
        &self,
        codes: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<Role>, RepositoryError>;

    async fn get_by_id(
        &self,
        id: RoleId,
        token: &CancellationToken,
    ) -> Result<Option<Role>, RepositoryError>;

    async fn save(&self, role: Role, token: &CancellationToken) -> Result<(), RepositoryError>;

    async fn delete(&self, id: RoleId, token: &CancellationToken) -> Result<(), RepositoryError>;

    async fn list(&self, token: &CancellationToken) -> Result<Vec<Role>, RepositoryError>;
}

/// Reference implementation: an in-process, lock-guarded role store.
/// Writes are serialized by the `RwLock`; reads never block a writer for
/// longer than one `HashMap` clone.
#[derive(Default)]
pub struct InMemoryRoleRepository {
    roles: RwLock<HashMap<RoleId, Role>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a role at construction time, bypassing the async trait —
    /// used to load system roles from config at startup.
    pub fn seed(&self, role: Role) {
        let mut guard = self.roles.write().expect("role repository lock poisoned");
        guard.insert(role.id, role);
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn get_by_codes(
        &self,
        codes: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<Role>, RepositoryError> {
        cancel::check(token).map_err(anyhow::Error::from)?;
        let wanted: Vec<String> = codes.iter().map(|c| c.to_ascii_lowercase()).collect();
        let guard = self.roles.read().expect("role repository lock poisoned");
        Ok(guard
            .values()
            .filter(|r| wanted.contains(&r.code.to_ascii_lowercase()))
            .cloned()
            .collect())
    }

    async fn get_by_id(
        &self,
        id: RoleId,
        token: &CancellationToken,
    ) -> Result<Option<Role>, RepositoryError> {
        cancel::check(token).map_err(anyhow::Error::from)?;
        let guard = self.roles.read().expect("role repository lock poisoned");
        Ok(guard.get(&id).cloned())
    }

    async fn save(&self, role: Role, token: &CancellationToken) -> Result<(), RepositoryError> {
        cancel::check(token).map_err(anyhow::Error::from)?;
        let mut guard = self.roles.write().expect("role repository lock poisoned");
        if let Some(existing) = guard.get(&role.id) {
            if existing.is_system {
                return Err(RepositoryError(anyhow::anyhow!(
                    "system role {:?} is immutable",
                    existing.code
                )));
            }
        }
        tracing::debug!(role_id = %role.id, code = %role.code, "saved role");
        guard.insert(role.id, role);
        Ok(())
    }

    async fn delete(&self, id: RoleId, token: &CancellationToken) -> Result<(), RepositoryError> {
        cancel::check(token).map_err(anyhow::Error::from)?;
        let mut guard = self.roles.write().expect("role repository lock poisoned");
        if let Some(existing) = guard.get(&id) {
            if existing.is_system {
                return Err(RepositoryError(anyhow::anyhow!(
                    "system role {:?} is immutable",
                    existing.code
                )));
            }
        }
        tracing::debug!(role_id = %id, "deleted role");
        guard.remove(&id);
        Ok(())
    }

    async fn list(&self, token: &CancellationToken) -> Result<Vec<Role>, RepositoryError> {
        cancel::check(token).map_err(anyhow::Error::from)?;
        let guard = self.roles.read().expect("role repository lock poisoned");
        Ok(guard.values().cloned().collect())
    }
}
