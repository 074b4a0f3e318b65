//! Aspect forest with cached ancestor and descendant closures.
//!
//! Nodes live in an arena indexed by position; parent and child links are
//! arena indices. A forest is immutable once built. Catalog changes produce
//! a new forest that replaces the old one inside a [`ForestHandle`], so
//! concurrent readers always see one complete snapshot.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use semrepo_core::{unknown_reference_err, AspectNode, Error, Result};

/// Immutable aspect forest.
#[derive(Debug, Default)]
pub struct AspectForest {
    /// Authored fields only.
    nodes: Vec<AspectNode>,
    index: HashMap<String, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    ancestors: Vec<OnceCell<std::result::Result<Vec<usize>, Error>>>,
    descendants: Vec<OnceCell<Vec<usize>>>,
}

impl AspectForest {
    /// Link nodes into a forest without validating acyclicity.
    ///
    /// A node whose parent is not part of `nodes` becomes a root. When an id
    /// occurs twice the later node wins.
    pub fn new(nodes: impl IntoIterator<Item = AspectNode>) -> Self {
        let mut arena: Vec<AspectNode> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for node in nodes {
            let node = node.without_derived();
            match index.get(&node.id) {
                Some(&i) => {
                    tracing::warn!("Duplicate aspect node {}, keeping the last one", node.id);
                    arena[i] = node;
                }
                None => {
                    index.insert(node.id.clone(), arena.len());
                    arena.push(node);
                }
            }
        }

        let mut parent = vec![None; arena.len()];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
        for (i, node) in arena.iter().enumerate() {
            if node.parent_id.is_empty() {
                continue;
            }
            match index.get(&node.parent_id) {
                Some(&p) => {
                    parent[i] = Some(p);
                    children[p].push(i);
                }
                None => tracing::warn!(
                    "Aspect node {} references missing parent {}, treating it as a root",
                    node.id,
                    node.parent_id
                ),
            }
        }
        for list in &mut children {
            list.sort_by(|a, b| arena[*a].id.cmp(&arena[*b].id));
        }

        let n = arena.len();
        Self {
            nodes: arena,
            index,
            parent,
            children,
            ancestors: (0..n).map(|_| OnceCell::new()).collect(),
            descendants: (0..n).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Link and validate. Fails with `CycleDetected` if any parent chain loops.
    pub fn build(nodes: impl IntoIterator<Item = AspectNode>) -> Result<Self> {
        let forest = Self::new(nodes);
        forest.validate()?;
        Ok(forest)
    }

    /// Walk every node's ancestor chain, filling the cache as a side effect.
    pub fn validate(&self) -> Result<()> {
        for i in 0..self.nodes.len() {
            self.ancestor_indices(i)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&AspectNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Root nodes sorted by id.
    pub fn roots(&self) -> Vec<&AspectNode> {
        let mut roots: Vec<&AspectNode> = self
            .parent
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| &self.nodes[i])
            .collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| unknown_reference_err!("aspect node {}", id))
    }

    fn ancestor_indices(&self, i: usize) -> Result<&[usize]> {
        match self.ancestors[i].get_or_init(|| self.walk_ancestors(i)) {
            Ok(chain) => Ok(chain),
            Err(e) => Err(e.clone()),
        }
    }

    fn walk_ancestors(&self, start: usize) -> std::result::Result<Vec<usize>, Error> {
        let mut chain = Vec::new();
        let mut current = self.parent[start];
        while let Some(p) = current {
            if p == start || chain.len() >= self.nodes.len() {
                let mut path = vec![self.nodes[start].id.clone()];
                path.extend(chain.iter().map(|&c: &usize| self.nodes[c].id.clone()));
                path.push(self.nodes[p].id.clone());
                return Err(Error::CycleDetected {
                    node_id: self.nodes[start].id.clone(),
                    path,
                });
            }
            chain.push(p);
            current = self.parent[p];
        }
        Ok(chain)
    }

    fn descendant_indices(&self, start: usize) -> &[usize] {
        self.descendants[start].get_or_init(|| {
            let mut seen = vec![false; self.nodes.len()];
            seen[start] = true;
            let mut order = Vec::new();
            let mut queue: VecDeque<usize> = self.children[start].iter().copied().collect();
            while let Some(i) = queue.pop_front() {
                if seen[i] {
                    continue;
                }
                seen[i] = true;
                order.push(i);
                queue.extend(self.children[i].iter().copied());
            }
            order
        })
    }

    /// Ancestors ordered from the immediate parent to the root.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&AspectNode>> {
        let i = self.position(id)?;
        Ok(self
            .ancestor_indices(i)?
            .iter()
            .map(|&a| &self.nodes[a])
            .collect())
    }

    /// Every node below `id`, breadth first.
    pub fn descendants(&self, id: &str) -> Result<Vec<&AspectNode>> {
        let i = self.position(id)?;
        Ok(self
            .descendant_indices(i)
            .iter()
            .map(|&d| &self.nodes[d])
            .collect())
    }

    /// Topmost ancestor, or the node itself for roots.
    pub fn root(&self, id: &str) -> Result<&AspectNode> {
        let i = self.position(id)?;
        let root = self.ancestor_indices(i)?.last().copied().unwrap_or(i);
        Ok(&self.nodes[root])
    }

    /// Whether `ancestor` lies strictly above `node`. Unknown ids and broken
    /// chains yield `false`.
    pub fn is_strict_ancestor(&self, ancestor: &str, node: &str) -> bool {
        let (Some(&a), Some(&n)) = (self.index.get(ancestor), self.index.get(node)) else {
            return false;
        };
        match self.ancestor_indices(n) {
            Ok(chain) => chain.contains(&a),
            Err(e) => {
                tracing::debug!("Ancestor check on broken chain: {}", e);
                false
            }
        }
    }

    /// Whether `descendant` lies strictly below `node`.
    pub fn is_strict_descendant(&self, descendant: &str, node: &str) -> bool {
        self.is_strict_ancestor(node, descendant)
    }

    /// Node with `child_ids`, `root_id`, `ancestor_ids` and `descendent_ids` filled.
    pub fn enriched(&self, id: &str) -> Result<AspectNode> {
        let i = self.position(id)?;
        let ancestors = self.ancestor_indices(i)?;
        let mut node = self.nodes[i].clone();
        node.child_ids = self.children[i]
            .iter()
            .map(|&c| self.nodes[c].id.clone())
            .collect();
        node.ancestor_ids = ancestors.iter().map(|&a| self.nodes[a].id.clone()).collect();
        node.root_id = self.nodes[ancestors.last().copied().unwrap_or(i)].id.clone();
        node.descendent_ids = self
            .descendant_indices(i)
            .iter()
            .map(|&d| self.nodes[d].id.clone())
            .collect();
        Ok(node)
    }

    /// Every node enriched, sorted by id.
    pub fn enriched_nodes(&self) -> Result<Vec<AspectNode>> {
        let mut ids: Vec<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| self.enriched(id)).collect()
    }
}

/// Shared, atomically replaceable forest snapshot.
#[derive(Debug, Default)]
pub struct ForestHandle {
    current: RwLock<Arc<AspectForest>>,
    generation: AtomicU64,
}

impl ForestHandle {
    pub fn new(forest: AspectForest) -> Self {
        Self {
            current: RwLock::new(Arc::new(forest)),
            generation: AtomicU64::new(0),
        }
    }

    /// The current snapshot. Holding it never blocks a rebuild.
    pub fn snapshot(&self) -> Arc<AspectForest> {
        self.current.read().clone()
    }

    /// Number of completed replacements.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, forest: AspectForest) -> Arc<AspectForest> {
        let next = Arc::new(forest);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        self.generation.fetch_add(1, Ordering::AcqRel);
        previous
    }

    /// Build and validate a forest from `nodes`, swapping it in only on success.
    pub fn rebuild(&self, nodes: impl IntoIterator<Item = AspectNode>) -> Result<Arc<AspectForest>> {
        let forest = AspectForest::build(nodes)?;
        tracing::info!("Aspect forest rebuilt with {} nodes", forest.len());
        self.replace(forest);
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> AspectForest {
        AspectForest::new(vec![
            AspectNode::new("root", "Root"),
            AspectNode::new("mid", "Mid").with_parent("root"),
            AspectNode::new("leaf", "Leaf").with_parent("mid"),
            AspectNode::new("leaf2", "Leaf 2").with_parent("mid"),
        ])
    }

    fn ids(nodes: Vec<&AspectNode>) -> Vec<&str> {
        nodes.into_iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_ancestors_are_ordered_parent_first() {
        let forest = chain();
        assert_eq!(ids(forest.ancestors("leaf").unwrap()), vec!["mid", "root"]);
        assert!(forest.ancestors("root").unwrap().is_empty());
        assert_eq!(forest.root("leaf").unwrap().id, "root");
        assert_eq!(forest.root("root").unwrap().id, "root");
    }

    #[test]
    fn test_descendants_breadth_first() {
        let forest = chain();
        assert_eq!(
            ids(forest.descendants("root").unwrap()),
            vec!["mid", "leaf", "leaf2"]
        );
        assert!(forest.descendants("leaf").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_id() {
        let forest = chain();
        assert!(matches!(
            forest.ancestors("nope"),
            Err(Error::UnknownReference(_))
        ));
        assert!(!forest.is_strict_ancestor("nope", "leaf"));
    }

    #[test]
    fn test_cycle_detected_on_ancestors() {
        let forest = AspectForest::new(vec![
            AspectNode::new("A", "A").with_parent("B"),
            AspectNode::new("B", "B").with_parent("A"),
        ]);
        let err = forest.ancestors("A").unwrap_err();
        match err {
            Error::CycleDetected { node_id, path } => {
                assert_eq!(node_id, "A");
                assert_eq!(path, vec!["A", "B", "A"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(forest.roots().is_empty());
    }

    #[test]
    fn test_cycle_above_node_is_detected() {
        let forest = AspectForest::new(vec![
            AspectNode::new("C", "C").with_parent("A"),
            AspectNode::new("A", "A").with_parent("B"),
            AspectNode::new("B", "B").with_parent("A"),
        ]);
        assert!(matches!(
            forest.ancestors("C"),
            Err(Error::CycleDetected { .. })
        ));
        assert!(AspectForest::build(forest.nodes.clone()).is_err());
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = AspectForest::build(vec![AspectNode::new("A", "A").with_parent("A")]).unwrap_err();
        assert!(err.is_data_integrity_error());
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let forest = AspectForest::build(vec![AspectNode::new("orphan", "Orphan").with_parent("gone")])
            .unwrap();
        assert_eq!(ids(forest.roots()), vec!["orphan"]);
    }

    #[test]
    fn test_enriched_fields() {
        let forest = chain();
        let mid = forest.enriched("mid").unwrap();
        assert_eq!(mid.child_ids, vec!["leaf", "leaf2"]);
        assert_eq!(mid.ancestor_ids, vec!["root"]);
        assert_eq!(mid.root_id, "root");
        assert_eq!(mid.descendent_ids, vec!["leaf", "leaf2"]);

        let root = forest.enriched("root").unwrap();
        assert_eq!(root.root_id, "root");
        assert_eq!(forest.enriched_nodes().unwrap().len(), 4);
    }

    #[test]
    fn test_input_derived_fields_are_ignored() {
        let mut bogus = AspectNode::new("root", "Root");
        bogus.child_ids = vec!["ghost".to_string()];
        let forest = AspectForest::new(vec![bogus]);
        assert!(forest.enriched("root").unwrap().child_ids.is_empty());
    }

    #[test]
    fn test_handle_keeps_old_snapshot_on_failed_rebuild() {
        let handle = ForestHandle::new(chain());
        let before = handle.snapshot();
        assert_eq!(handle.generation(), 0);

        let err = handle
            .rebuild(vec![
                AspectNode::new("A", "A").with_parent("B"),
                AspectNode::new("B", "B").with_parent("A"),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
        assert_eq!(handle.generation(), 0);
        assert!(Arc::ptr_eq(&before, &handle.snapshot()));

        handle.rebuild(vec![AspectNode::new("x", "X")]).unwrap();
        assert_eq!(handle.generation(), 1);
        assert_eq!(handle.snapshot().len(), 1);
        // Readers holding the old snapshot are unaffected.
        assert_eq!(before.len(), 4);
    }
}
