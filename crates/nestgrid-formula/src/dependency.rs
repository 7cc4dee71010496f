//! Dependency tracking for formula calculation
//!
//! One [`FunctionNode`] per formula cell, stored in an arena and linked by
//! [`NodeId`] index lists. Edges point from a formula to the formulas it
//! reads (its parents); an edge that would close a cycle is refused.

use ahash::{AHashMap, AHashSet};
use nestgrid_core::CellId;
use std::collections::VecDeque;
use thiserror::Error;

/// Index of a node in its [`DependencyGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A formula cell in the dependency graph
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub cell: CellId,
    /// Nodes this formula reads
    pub parents: Vec<NodeId>,
    /// Nodes that read this formula
    pub children: Vec<NodeId>,
    /// 0 without parents, else one more than the deepest parent
    pub depth: usize,
}

impl FunctionNode {
    fn new(cell: CellId) -> Self {
        Self {
            cell,
            parents: Vec::new(),
            children: Vec::new(),
            depth: 0,
        }
    }
}

/// Refused edge: `parent` already depends on `child`, directly or transitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cell {child_cell} cannot read cell {parent_cell}: it already depends on it")]
pub struct CycleError {
    pub child: NodeId,
    pub parent: NodeId,
    pub child_cell: CellId,
    pub parent_cell: CellId,
}

/// Dependency graph for formula cells
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<FunctionNode>,
    index: AHashMap<CellId, NodeId>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// The node for `cell`, created on first use
    pub fn add_node(&mut self, cell: CellId) -> NodeId {
        if let Some(&id) = self.index.get(&cell) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(FunctionNode::new(cell));
        self.index.insert(cell, id);
        id
    }

    pub fn node(&self, id: NodeId) -> &FunctionNode {
        &self.nodes[id.0]
    }

    /// The node of a formula cell, if it has one
    pub fn node_for(&self, cell: CellId) -> Option<NodeId> {
        self.index.get(&cell).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &FunctionNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Record that `child` reads `parent`
    ///
    /// Refused when `parent` is `child` itself or already one of its
    /// dependents. Adding an existing edge again is a no-op.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), CycleError> {
        if child == parent || self.is_ancestor(child, parent) {
            return Err(CycleError {
                child,
                parent,
                child_cell: self.nodes[child.0].cell,
                parent_cell: self.nodes[parent.0].cell,
            });
        }
        if self.nodes[child.0].parents.contains(&parent) {
            return Ok(());
        }
        self.nodes[child.0].parents.push(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Whether `ancestor` is reached by following parent links up from `node`
    ///
    /// Put differently: whether `node` transitively reads `ancestor`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut visited = AHashSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            for &parent in &self.nodes[current.0].parents {
                if parent == ancestor {
                    return true;
                }
                if visited.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        false
    }

    /// Assign every node its depth: 0 without parents, else one more than the
    /// deepest parent
    pub fn compute_depths(&mut self) {
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.parents.len()).collect();
        let mut queue: VecDeque<NodeId> = self
            .ids()
            .filter(|id| pending[id.0] == 0)
            .collect();

        for node in &mut self.nodes {
            node.depth = 0;
        }

        while let Some(id) = queue.pop_front() {
            let depth = self.nodes[id.0].depth;
            for i in 0..self.nodes[id.0].children.len() {
                let child = self.nodes[id.0].children[i];
                let entry = &mut self.nodes[child.0];
                entry.depth = entry.depth.max(depth + 1);
                pending[child.0] -= 1;
                if pending[child.0] == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    /// `start` and every node that transitively reads it
    pub fn dependents_closure(&self, start: NodeId) -> AHashSet<NodeId> {
        let mut closure = AHashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if closure.insert(id) {
                stack.extend(self.nodes[id.0].children.iter().copied());
            }
        }
        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestgrid_core::Table;
    use pretty_assertions::assert_eq;

    /// Distinct cell ids for test nodes
    fn cells(n: u32) -> Vec<CellId> {
        let table = Table::new(n, 1);
        table.cells().map(|c| c.id()).collect()
    }

    #[test]
    fn test_add_parent_links_both_ways() {
        let ids = cells(2);
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(ids[0]);
        let b = graph.add_node(ids[1]);

        graph.add_parent(b, a).unwrap();
        graph.add_parent(b, a).unwrap();

        assert_eq!(graph.node(b).parents, vec![a]);
        assert_eq!(graph.node(a).children, vec![b]);
        assert_eq!(graph.add_node(ids[0]), a);
        assert_eq!(graph.node_for(ids[1]), Some(b));
    }

    #[test]
    fn test_cycles_are_refused() {
        let ids = cells(3);
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(ids[0]);
        let b = graph.add_node(ids[1]);
        let c = graph.add_node(ids[2]);

        assert!(graph.add_parent(a, a).is_err());

        graph.add_parent(b, a).unwrap();
        graph.add_parent(c, b).unwrap();
        let err = graph.add_parent(a, c).unwrap_err();
        assert_eq!((err.child, err.parent), (a, c));
        assert!(graph.node(a).parents.is_empty());
        assert!(graph.is_ancestor(a, c));
        assert!(!graph.is_ancestor(c, a));
    }

    #[test]
    fn test_depths_follow_longest_path() {
        // a -> b -> c, and a -> c directly
        let ids = cells(4);
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(ids[0]);
        let b = graph.add_node(ids[1]);
        let c = graph.add_node(ids[2]);
        let lone = graph.add_node(ids[3]);
        graph.add_parent(c, a).unwrap();
        graph.add_parent(b, a).unwrap();
        graph.add_parent(c, b).unwrap();

        graph.compute_depths();
        let depths: Vec<usize> = [a, b, c, lone].iter().map(|&id| graph.node(id).depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_dependents_closure() {
        let ids = cells(4);
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(ids[0]);
        let b = graph.add_node(ids[1]);
        let c = graph.add_node(ids[2]);
        let d = graph.add_node(ids[3]);
        graph.add_parent(b, a).unwrap();
        graph.add_parent(c, b).unwrap();

        let closure = graph.dependents_closure(a);
        assert_eq!(closure.len(), 3);
        assert!(closure.contains(&c));
        assert!(!closure.contains(&d));
    }
}
