//! Declarative load path for the process-wide [`Catalog`] and the system
//! role seed. `catalog` and `roles` are the two sections that matter here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod dhall;
pub use dhall::read_config_file as read;

use crate::authorization::catalog::{Catalog, CatalogError, NodeSpec};
use crate::authorization::directive::Action;
use crate::authorization::roles::{Binding, Role, ScopeTemplate};
use crate::logging::LogConfig;

/// One `ScopeTemplate` as it appears in config: bindings are plain
/// `key = "value"` (literal) or `key = "{placeholder}"` (placeholder),
/// distinguished by brace-delimited syntax rather than a tagged enum, so
/// the config file stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTemplateSpec {
    pub action: Action,
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<(String, String)>,
}

fn parse_binding(raw: &str) -> Binding {
    if let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Binding::Placeholder(name.to_string())
    } else {
        Binding::Literal(raw.to_string())
    }
}

impl From<ScopeTemplateSpec> for ScopeTemplate {
    fn from(spec: ScopeTemplateSpec) -> Self {
        ScopeTemplate {
            action: spec.action,
            path: spec.path,
            parameter_bindings: spec
                .parameters
                .into_iter()
                .map(|(k, v)| (k, parse_binding(&v)))
                .collect(),
        }
    }
}

/// A `Role` as it appears in config. Seeded roles always get `is_system =
/// true` forced at load time, so the field isn't even present here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub scope_templates: Vec<ScopeTemplateSpec>,
}

impl RoleSpec {
    fn into_role(self, id: Uuid) -> Role {
        Role {
            id,
            code: self.code,
            name: self.name,
            description: self.description,
            is_system: true,
            parameters: self.parameters,
            scope_templates: self.scope_templates.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The permission tree, loaded as a forest of [`NodeSpec`] roots.
    pub catalog: Vec<NodeSpec>,

    /// System roles seeded at init; each becomes immutable (`is_system =
    /// true`) once loaded, regardless of what's written in the file.
    #[serde(default)]
    pub roles: Vec<RoleSpec>,

    #[serde(default, skip)]
    pub verbosity: isize,

    #[serde(default, skip)]
    pub logging: LogConfig,
}

impl Config {
    pub fn is_quiet(&self) -> bool {
        self.verbosity < 0
    }

    /// Compiles the configured forest into a process-wide [`Catalog`].
    pub fn build_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::build(self.catalog.clone())
    }

    /// Produces the `Role` set to seed a `RoleRepository` with at startup.
    /// Role IDs are deterministic from the role's code (a stable v5 UUID
    /// in a fixed namespace) so `RoleRepository::get_by_id` remains usable
    /// across restarts without a separate ID table in the config file.
    pub fn seed_roles(&self) -> Vec<Role> {
        self.roles
            .iter()
            .cloned()
            .map(|spec| {
                let id = role_id_from_code(&spec.code);
                spec.into_role(id)
            })
            .collect()
    }
}

fn role_id_from_code(code: &str) -> Uuid {
    let namespace = Uuid::from_bytes([
        0x9b, 0x3d, 0x1f, 0x2c, 0x4a, 0x77, 0x4e, 0x61, 0x8b, 0x0a, 0x1d, 0x5e, 0x2f, 0x3c, 0x6b,
        0x90,
    ]);
    Uuid::new_v5(&namespace, code.to_ascii_lowercase().as_bytes())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            catalog: Vec::new(),
            roles: Vec::new(),
            verbosity: 0,
            logging: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::catalog::AccessCategory;

    fn sample_config() -> Config {
        Config {
            catalog: vec![NodeSpec::container("api").with_children([NodeSpec::leaf(
                "me",
                AccessCategory::Read,
            )])],
            roles: vec![RoleSpec {
                code: "USER".to_string(),
                name: "User".to_string(),
                description: String::new(),
                parameters: vec!["roleUserId".to_string()],
                scope_templates: vec![ScopeTemplateSpec {
                    action: Action::Allow,
                    path: "_read".to_string(),
                    parameters: vec![("userId".to_string(), "{roleUserId}".to_string())],
                }],
            }],
            ..Config::default()
        }
    }

    #[test]
    fn builds_catalog_from_config() {
        let catalog = sample_config().build_catalog().unwrap();
        assert!(catalog.get("api:me").is_some());
    }

    #[test]
    fn seeds_system_roles_as_immutable() {
        let roles = sample_config().seed_roles();
        assert_eq!(roles.len(), 1);
        assert!(roles[0].is_system);
        assert_eq!(roles[0].scope_templates[0].path, "_read");
    }

    #[test]
    fn role_ids_are_stable_across_loads() {
        let a = sample_config().seed_roles();
        let b = sample_config().seed_roles();
        assert_eq!(a[0].id, b[0].id);
    }
}
