//! The permission tree.
//!
//! Built once at process start from a declarative [`NodeSpec`] forest and
//! never mutated afterwards — the tree is process-wide and constant, unlike
//! roles, which are mutated at runtime through the role repository.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Whether a node is a read leaf, a write leaf, or neither (a container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum AccessCategory {
    #[default]
    Unspecified,
    Read,
    Write,
}

impl AccessCategory {
    pub fn is_read(&self) -> bool {
        matches!(self, AccessCategory::Read)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, AccessCategory::Write)
    }
}

/// The two reserved identifiers. They may only appear as a child of another
/// node, never as a root.
pub const READ_WILDCARD: &str = "_read";
pub const WRITE_WILDCARD: &str = "_write";

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A declarative description of one node, used only to build a [`Catalog`].
/// Not retained afterwards. Deserializable so the process-wide tree can be
/// loaded from the same config file as the rest of the ambient stack.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeSpec {
    pub identifier: String,
    #[serde(default)]
    pub access_category: AccessCategory,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn container(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            access_category: AccessCategory::Unspecified,
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn leaf(identifier: impl Into<String>, category: AccessCategory) -> Self {
        Self {
            identifier: identifier.into(),
            access_category: category,
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children = children.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    InvalidIdentifier(String),
    ReservedRoot(String),
    DuplicateSibling(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::InvalidIdentifier(id) => write!(f, "invalid identifier segment {id:?}"),
            CatalogError::ReservedRoot(id) => {
                write!(f, "root node must not be a wildcard segment: {id:?}")
            }
            CatalogError::DuplicateSibling(path) => {
                write!(f, "duplicate sibling identifier at {path:?}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// A single node in the permission tree, keyed by its colon-joined `path`
/// in the arena (`Catalog::nodes`). Parents are referenced by path rather
/// than by owning pointer — the tree has no cycles and needs no shared
/// ownership.
#[derive(Debug, Clone)]
pub struct PermissionNode {
    pub identifier: String,
    pub path: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub access_category: AccessCategory,
    pub parameters: Vec<String>,
    pub parameter_hierarchy: Vec<String>,
    pub reachable_parameters: HashSet<String>,
}

impl PermissionNode {
    pub fn is_wildcard_leaf(&self) -> bool {
        self.identifier == READ_WILDCARD || self.identifier == WRITE_WILDCARD
    }
}

/// The process-wide, immutable permission tree.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    nodes: HashMap<String, PermissionNode>,
    assignable: Vec<String>,
}

impl Catalog {
    /// Builds a catalog from a forest of root [`NodeSpec`]s.
    pub fn build(roots: Vec<NodeSpec>) -> Result<Catalog, CatalogError> {
        let mut nodes = HashMap::new();

        for root in &roots {
            if root.identifier == READ_WILDCARD || root.identifier == WRITE_WILDCARD {
                return Err(CatalogError::ReservedRoot(root.identifier.clone()));
            }
        }
        check_no_duplicate_siblings(&roots)?;

        for root in roots {
            insert_subtree(&mut nodes, None, Vec::new(), root)?;
        }

        compute_reachable_parameters(&mut nodes);

        let mut assignable: Vec<String> = nodes
            .values()
            .filter(|n| n.access_category != AccessCategory::Unspecified)
            .map(|n| n.path.clone())
            .collect();
        assignable.sort();

        Ok(Catalog { nodes, assignable })
    }

    pub fn get(&self, path: &str) -> Option<&PermissionNode> {
        self.nodes.get(path)
    }

    pub fn all(&self) -> impl Iterator<Item = &PermissionNode> {
        self.nodes.values()
    }

    /// All paths whose `access_category != Unspecified`, sorted
    /// lexicographically.
    pub fn assignable_identifiers(&self) -> &[String] {
        &self.assignable
    }

    pub fn reachable_parameters(&self, path: &str) -> Option<&HashSet<String>> {
        self.nodes.get(path).map(|n| &n.reachable_parameters)
    }

    pub fn parameter_hierarchy(&self, path: &str) -> Option<&[String]> {
        self.nodes.get(path).map(|n| n.parameter_hierarchy.as_slice())
    }

    /// `true` iff `path` is a strict descendant of `ancestor` in the tree,
    /// i.e. `path` starts with `ancestor + ":"`.
    pub fn is_descendant(&self, ancestor: &str, path: &str) -> bool {
        path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b':'
    }

    /// Whether `container` has a literal `_read`/`_write` wildcard child,
    /// i.e. is itself directly requestable in bulk (a scoped wildcard
    /// directive on `container` matches `container` itself, not just its
    /// descendants, when such a child is present).
    pub fn has_wildcard_child(&self, container: &str, category: AccessCategory) -> bool {
        let wanted = match category {
            AccessCategory::Read => READ_WILDCARD,
            AccessCategory::Write => WRITE_WILDCARD,
            AccessCategory::Unspecified => return false,
        };
        self.nodes
            .get(container)
            .map(|n| n.children.iter().any(|c| c == wanted))
            .unwrap_or(false)
    }
}

fn check_no_duplicate_siblings(children: &[NodeSpec]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for child in children {
        if !seen.insert(child.identifier.clone()) {
            return Err(CatalogError::DuplicateSibling(child.identifier.clone()));
        }
    }
    Ok(())
}

fn insert_subtree(
    nodes: &mut HashMap<String, PermissionNode>,
    parent: Option<String>,
    parent_hierarchy: Vec<String>,
    spec: NodeSpec,
) -> Result<String, CatalogError> {
    if !is_valid_identifier(&spec.identifier) {
        return Err(CatalogError::InvalidIdentifier(spec.identifier));
    }

    check_no_duplicate_siblings(&spec.children)?;

    let path = match &parent {
        Some(p) => format!("{p}:{}", spec.identifier),
        None => spec.identifier.clone(),
    };

    let mut hierarchy = parent_hierarchy;
    for p in &spec.parameters {
        if !hierarchy.contains(p) {
            hierarchy.push(p.clone());
        }
    }

    let mut child_ids = Vec::with_capacity(spec.children.len());
    for child in spec.children {
        let child_path = insert_subtree(nodes, Some(path.clone()), hierarchy.clone(), child)?;
        let child_id = child_path.rsplit(':').next().unwrap().to_string();
        child_ids.push(child_id);
    }

    let node = PermissionNode {
        identifier: spec.identifier,
        path: path.clone(),
        parent,
        children: child_ids,
        access_category: spec.access_category,
        parameters: spec.parameters,
        parameter_hierarchy: hierarchy,
        reachable_parameters: HashSet::new(),
    };

    nodes.insert(path.clone(), node);

    Ok(path)
}

/// Post-order pass computing `reachable_parameters`: a node's own declared
/// parameters unioned with those of every descendant, except underneath a
/// `_read`/`_write` leaf.
fn compute_reachable_parameters(nodes: &mut HashMap<String, PermissionNode>) {
    let mut order: Vec<String> = nodes.keys().cloned().collect();
    order.sort_by_key(|p| std::cmp::Reverse(p.matches(':').count()));

    for path in order {
        let (children, parameters, is_wildcard) = {
            let node = &nodes[&path];
            (node.children.clone(), node.parameters.clone(), node.is_wildcard_leaf())
        };

        let mut reachable: HashSet<String> = parameters.into_iter().collect();

        if !is_wildcard {
            for child_id in &children {
                let child_path = format!("{path}:{child_id}");
                if let Some(child) = nodes.get(&child_path) {
                    if child.is_wildcard_leaf() {
                        continue;
                    }
                    reachable.extend(child.reachable_parameters.iter().cloned());
                }
            }
        }

        nodes.get_mut(&path).unwrap().reachable_parameters = reachable;
    }

    // `_read`/`_write` leaves inherit their parent's reachable set (wildcard
    // inherits scope).
    let wildcard_paths: Vec<(String, String)> = nodes
        .values()
        .filter(|n| n.is_wildcard_leaf())
        .filter_map(|n| n.parent.clone().map(|p| (n.path.clone(), p)))
        .collect();

    for (path, parent) in wildcard_paths {
        let parent_reachable = nodes.get(&parent).map(|n| n.reachable_parameters.clone());
        if let Some(parent_reachable) = parent_reachable {
            if let Some(node) = nodes.get_mut(&path) {
                node.reachable_parameters = parent_reachable;
            }
        }
    }
}
