//! Evaluation order for a dependency graph

use crate::dependency::{DependencyGraph, NodeId};
use ahash::AHashSet;
use std::collections::VecDeque;

/// How a recompute pass orders formula evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScheduleMode {
    /// In-degree counting: a node runs once, after all of its parents
    #[default]
    Kahn,
    /// Breadth-first by depth level, enqueueing each child whose depth is one
    /// more than the running node's; a child with several such parents runs
    /// once per parent
    DepthMatched,
}

/// Order the nodes of `graph` for evaluation, leaving out `excluded`
pub fn order(graph: &DependencyGraph, excluded: &AHashSet<NodeId>, mode: ScheduleMode) -> Vec<NodeId> {
    match mode {
        ScheduleMode::Kahn => kahn_order(graph, excluded),
        ScheduleMode::DepthMatched => depth_matched_order(graph, excluded),
    }
}

/// Topological order by in-degree counting
///
/// Ready nodes run in id order, so the result is deterministic for a given
/// graph. Excluded nodes neither run nor hold back their children's counts;
/// their dependents are expected to be excluded along with them.
pub fn kahn_order(graph: &DependencyGraph, excluded: &AHashSet<NodeId>) -> Vec<NodeId> {
    let mut waiting: Vec<usize> = graph
        .iter()
        .map(|(_, node)| node.parents.iter().filter(|p| !excluded.contains(*p)).count())
        .collect();

    let mut queue: VecDeque<NodeId> = graph
        .ids()
        .filter(|id| !excluded.contains(id) && waiting[id.0] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &child in &graph.node(id).children {
            if excluded.contains(&child) {
                continue;
            }
            waiting[child.0] -= 1;
            if waiting[child.0] == 0 {
                queue.push_back(child);
            }
        }
    }

    order
}

/// Breadth-first order seeded with depth-0 nodes
///
/// Needs [`DependencyGraph::compute_depths`] to have run. A child is enqueued
/// whenever a parent one level above it runs and it has not run yet, so the
/// result can hold a node more than once.
pub fn depth_matched_order(graph: &DependencyGraph, excluded: &AHashSet<NodeId>) -> Vec<NodeId> {
    let mut queue: VecDeque<NodeId> = graph
        .iter()
        .filter(|(id, node)| node.depth == 0 && !excluded.contains(id))
        .map(|(id, _)| id)
        .collect();
    let mut executed = AHashSet::new();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        executed.insert(id);

        let depth = graph.node(id).depth;
        for &child in &graph.node(id).children {
            if excluded.contains(&child) || executed.contains(&child) {
                continue;
            }
            if graph.node(child).depth == depth + 1 {
                queue.push_back(child);
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestgrid_core::Table;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// a feeds b and c, both feed d, and d also reads a directly
    fn diamond() -> (DependencyGraph, [NodeId; 4]) {
        let table = Table::new(4, 1);
        let ids: Vec<_> = table.cells().map(|c| c.id()).collect();
        let mut graph = DependencyGraph::new();
        // insert the sink first so id order alone would be wrong
        let d = graph.add_node(ids[3]);
        let c = graph.add_node(ids[2]);
        let b = graph.add_node(ids[1]);
        let a = graph.add_node(ids[0]);
        graph.add_parent(b, a).unwrap();
        graph.add_parent(c, a).unwrap();
        graph.add_parent(d, b).unwrap();
        graph.add_parent(d, c).unwrap();
        graph.add_parent(d, a).unwrap();
        graph.compute_depths();
        (graph, [a, b, c, d])
    }

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&n| n == id).unwrap()
    }

    #[test]
    fn test_kahn_runs_parents_first_once() {
        let (graph, [a, b, c, d]) = diamond();
        let order = kahn_order(&graph, &AHashSet::new());

        assert_eq!(order.len(), 4);
        for (child, parent) in [(b, a), (c, a), (d, b), (d, c), (d, a)] {
            assert!(position(&order, parent) < position(&order, child));
        }
    }

    #[test]
    fn test_kahn_skips_excluded() {
        let (graph, [a, b, c, d]) = diamond();
        let excluded = graph.dependents_closure(b);
        let order = kahn_order(&graph, &excluded);
        assert_eq!(order, vec![a, c]);
        assert!(excluded.contains(&d));
    }

    #[test]
    fn test_depth_matched_repeats_shared_children() {
        let (graph, [a, b, c, d]) = diamond();
        let order = depth_matched_order(&graph, &AHashSet::new());
        assert_eq!(order, vec![a, b, c, d, d]);
    }

    #[test]
    fn test_order_dispatch() {
        let (graph, _) = diamond();
        let none = AHashSet::new();
        assert_eq!(order(&graph, &none, ScheduleMode::default()), kahn_order(&graph, &none));
        assert_eq!(
            order(&graph, &none, ScheduleMode::DepthMatched),
            depth_matched_order(&graph, &none)
        );
    }

    /// Graph over `count` nodes with an edge from the lower to the higher end
    /// of every pair, nodes inserted back to front
    fn random_dag(count: usize, pairs: &[(usize, usize)]) -> (DependencyGraph, Vec<NodeId>) {
        let table = Table::new(count as u32, 1);
        let cells: Vec<_> = table.cells().map(|c| c.id()).collect();
        let mut graph = DependencyGraph::new();
        let mut nodes: Vec<NodeId> = cells.iter().rev().map(|&cell| graph.add_node(cell)).collect();
        nodes.reverse();
        for &(x, y) in pairs {
            let (parent, child) = (x.min(y) % count, x.max(y) % count);
            if parent < child {
                graph.add_parent(nodes[child], nodes[parent]).unwrap();
            }
        }
        graph.compute_depths();
        (graph, nodes)
    }

    proptest! {
        #[test]
        fn kahn_order_is_topological_and_complete(
            count in 1usize..12,
            pairs in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let (graph, nodes) = random_dag(count, &pairs);
            let order = kahn_order(&graph, &AHashSet::new());

            let mut sorted = order.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), order.len());
            prop_assert_eq!(order.len(), nodes.len());

            for (id, node) in graph.iter() {
                for &parent in &node.parents {
                    prop_assert!(position(&order, parent) < position(&order, id));
                }
            }
        }

        #[test]
        fn depth_matched_runs_children_after_every_parent(
            count in 1usize..12,
            pairs in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let (graph, nodes) = random_dag(count, &pairs);
            let order = depth_matched_order(&graph, &AHashSet::new());

            for &id in &nodes {
                prop_assert!(order.contains(&id));
            }
            for (at, &id) in order.iter().enumerate() {
                for &parent in &graph.node(id).parents {
                    prop_assert!(position(&order, parent) < at);
                }
            }
        }
    }
}
