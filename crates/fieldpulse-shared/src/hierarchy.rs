//! Delegate → Supervisor → Sales Director hierarchy as an id arena.
//!
//! Parent pointers come from the catalog unchecked, so `build` rejects
//! dangling edges, cycles and role inversions before anything walks them.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::model::{Delegate, DelegateId, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: DelegateId,
    pub name: String,
    pub role: Role,
    pub parent: Option<DelegateId>,
    pub children: Vec<DelegateId>,
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: BTreeMap<DelegateId, HierarchyNode>,
}

impl Hierarchy {
    pub fn build(delegates: &[Delegate]) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for d in delegates {
            let node = HierarchyNode {
                id: d.id,
                name: d.name.clone(),
                role: d.role,
                parent: d.supervisor_id,
                children: Vec::new(),
            };
            if nodes.insert(d.id, node).is_some() {
                return Err(MetricsError::invalid(format!("duplicate delegate id {}", d.id)));
            }
        }

        for node in nodes.values() {
            if let Some(parent) = node.parent {
                if !nodes.contains_key(&parent) {
                    return Err(MetricsError::not_found(format!(
                        "supervisor {} of delegate {}",
                        parent, node.id
                    )));
                }
            }
        }

        for &start in nodes.keys() {
            let mut seen = HashSet::new();
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                if !seen.insert(id) {
                    return Err(MetricsError::invalid(format!(
                        "supervisor chain from delegate {} loops back to {}",
                        start, id
                    )));
                }
                cursor = nodes[&id].parent;
            }
        }

        for node in nodes.values() {
            if let Some(parent) = node.parent {
                let parent_role = nodes[&parent].role;
                if parent_role.rank() <= node.role.rank() {
                    return Err(MetricsError::invalid(format!(
                        "{} {} cannot report to {} {}",
                        node.role, node.id, parent_role, parent
                    )));
                }
            }
        }

        let edges: Vec<(DelegateId, DelegateId)> = nodes
            .values()
            .filter_map(|n| n.parent.map(|p| (p, n.id)))
            .collect();
        for (parent, child) in edges {
            if let Some(p) = nodes.get_mut(&parent) {
                p.children.push(child);
            }
        }

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: DelegateId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: DelegateId) -> Result<&HierarchyNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| MetricsError::not_found(format!("delegate {}", id)))
    }

    pub fn parent(&self, id: DelegateId) -> Result<Option<DelegateId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: DelegateId) -> Result<&[DelegateId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn roots(&self) -> Vec<DelegateId> {
        self.nodes
            .values()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// Parent first, ending at the root. Empty for a root.
    pub fn ancestors(&self, id: DelegateId) -> Result<Vec<DelegateId>> {
        let mut chain = Vec::new();
        let mut cursor = self.node(id)?.parent;
        while let Some(parent) = cursor {
            if chain.len() >= self.nodes.len() {
                return Err(MetricsError::invalid(format!(
                    "supervisor chain from delegate {} does not terminate",
                    id
                )));
            }
            chain.push(parent);
            cursor = self.node(parent)?.parent;
        }
        Ok(chain)
    }

    /// The node and every node below it, breadth first.
    pub fn descendants(&self, id: DelegateId) -> Result<Vec<DelegateId>> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            out.push(next);
            queue.extend(self.children(next)?.iter().copied());
        }
        Ok(out)
    }

    /// Root = 0.
    pub fn depth(&self, id: DelegateId) -> Result<usize> {
        Ok(self.ancestors(id)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: DelegateId, role: Role, supervisor_id: Option<DelegateId>) -> Delegate {
        Delegate {
            id,
            name: format!("n{}", id),
            role,
            supervisor_id,
        }
    }

    fn org() -> Vec<Delegate> {
        vec![
            node(1, Role::SalesDirector, None),
            node(10, Role::Supervisor, Some(1)),
            node(11, Role::Supervisor, Some(1)),
            node(100, Role::Delegate, Some(10)),
            node(101, Role::Delegate, Some(10)),
            node(110, Role::Delegate, Some(11)),
            node(200, Role::Delegate, None),
        ]
    }

    #[test]
    fn test_walks() {
        let h = Hierarchy::build(&org()).unwrap();
        assert_eq!(h.len(), 7);
        assert_eq!(h.roots(), vec![1, 200]);
        assert_eq!(h.children(1).unwrap(), &[10, 11]);
        assert_eq!(h.ancestors(101).unwrap(), vec![10, 1]);
        assert_eq!(h.ancestors(1).unwrap(), Vec::<DelegateId>::new());
        assert_eq!(h.descendants(1).unwrap(), vec![1, 10, 11, 100, 101, 110]);
        assert_eq!(h.descendants(11).unwrap(), vec![11, 110]);
        assert_eq!(h.depth(110).unwrap(), 2);
        assert_eq!(h.parent(110).unwrap(), Some(11));
    }

    #[test]
    fn test_supervisor_without_delegates_is_valid() {
        let h = Hierarchy::build(&[node(5, Role::Supervisor, None)]).unwrap();
        assert_eq!(h.descendants(5).unwrap(), vec![5]);
        assert!(h.children(5).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_node_is_not_found() {
        let h = Hierarchy::build(&org()).unwrap();
        assert!(matches!(h.node(999), Err(MetricsError::NotFound(_))));
        assert!(matches!(h.descendants(999), Err(MetricsError::NotFound(_))));
    }

    #[test]
    fn test_dangling_supervisor_is_not_found() {
        let err = Hierarchy::build(&[node(100, Role::Delegate, Some(42))]).unwrap_err();
        assert!(matches!(err, MetricsError::NotFound(_)));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = Hierarchy::build(&[
            node(10, Role::Supervisor, Some(11)),
            node(11, Role::Supervisor, Some(10)),
        ])
        .unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(ref m) if m.contains("loops")));
    }

    #[test]
    fn test_self_parent_rejected() {
        let err = Hierarchy::build(&[node(7, Role::Delegate, Some(7))]).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(_)));
    }

    #[test]
    fn test_role_inversion_rejected() {
        let err = Hierarchy::build(&[
            node(1, Role::Delegate, None),
            node(2, Role::Supervisor, Some(1)),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cannot report to"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        assert!(Hierarchy::build(&[
            node(1, Role::Delegate, None),
            node(1, Role::Delegate, None),
        ])
        .is_err());
    }
}
