use std::collections::HashMap;

use super::graph::ThreadGraph;
use super::hash::display_key;
use super::node::{ResultNode, TreeNode};
use crate::Component;

const ROOT: usize = 0;

#[derive(Clone, Debug)]
struct Branch<C> {
    node: TreeNode<C>,
    children: Vec<usize>,
}

/// Process-wide tree of one component type, built from merged thread graphs.
#[derive(Clone, Debug)]
pub struct MasterTree<C> {
    branches: Vec<Branch<C>>,
    lookup: HashMap<(usize, u64), usize>,
    merged: usize,
}

impl<C: Component> Default for MasterTree<C> {
    fn default() -> Self {
        Self {
            branches: vec![Branch {
                node: TreeNode::dummy(),
                children: Vec::new(),
            }],
            lookup: HashMap::new(),
            merged: 0,
        }
    }
}

impl<C: Component> MasterTree<C> {
    /// Number of nodes, the root excluded.
    pub fn len(&self) -> usize {
        self.branches.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of thread graphs merged so far.
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// Folds a thread graph in, matching nodes by hash along the path.
    pub fn merge(&mut self, graph: &ThreadGraph<C>) {
        if graph.is_empty() {
            return;
        }
        let vertices = graph.vertices();
        let mut mapping = vec![ROOT; vertices.len()];
        for (index, vertex) in vertices.iter().enumerate().skip(1) {
            let Some(parent) = vertex.parent else {
                continue;
            };
            let mut incoming = TreeNode::from_graph(&vertex.graph);
            for child in &vertex.children {
                incoming
                    .exclusive_mut()
                    .data_mut()
                    .subtract(vertices[*child].graph.obj());
            }

            let target_parent = mapping[parent];
            let hash = vertex.graph.hash();
            let existing = self
                .lookup
                .get(&(target_parent, hash))
                .copied()
                .filter(|_| !vertex.distinct);
            let target = match existing {
                Some(existing) => {
                    self.branches[existing].node += &incoming;
                    existing
                }
                None => self.add_branch(target_parent, incoming, vertex.distinct),
            };
            mapping[index] = target;
        }
        self.merged += 1;
        tracing::debug!(
            component = C::LABEL,
            tid = graph.tid(),
            nodes = graph.len(),
            total = self.len(),
            "merged thread graph"
        );
    }

    /// Depth-first flattening with inclusive values.
    pub fn results(&self) -> Vec<ResultNode<C>> {
        self.flatten(false)
    }

    /// Depth-first flattening with each node's children subtracted.
    pub fn exclusive_results(&self) -> Vec<ResultNode<C>> {
        self.flatten(true)
    }

    /// Tree nodes in depth-first order, the root excluded.
    pub fn nodes(&self) -> Vec<&TreeNode<C>> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<usize> = self.branches[ROOT].children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            out.push(&self.branches[index].node);
            stack.extend(self.branches[index].children.iter().rev().copied());
        }
        out
    }

    fn flatten(&self, exclusive: bool) -> Vec<ResultNode<C>> {
        let mut out = Vec::with_capacity(self.len());
        let mut hierarchy = Vec::new();
        for child in &self.branches[ROOT].children {
            self.visit(*child, exclusive, &mut hierarchy, &mut out);
        }
        out
    }

    fn visit(
        &self,
        index: usize,
        exclusive: bool,
        hierarchy: &mut Vec<u64>,
        out: &mut Vec<ResultNode<C>>,
    ) {
        let node = &self.branches[index].node;
        let entry = if exclusive {
            node.exclusive()
        } else {
            node.inclusive()
        };
        hierarchy.push(node.hash());
        out.push(ResultNode {
            tid: node.tids().iter().next().copied().unwrap_or_default(),
            pid: node.pids().iter().next().copied().unwrap_or_default(),
            depth: node.depth(),
            hash: node.hash(),
            rolling_hash: ResultNode::<C>::rolling_hash_of(hierarchy),
            prefix: ResultNode::<C>::format_prefix(node.depth(), &display_key(node.hash())),
            hierarchy: hierarchy.clone(),
            laps: node.laps(),
            data: entry.data().clone(),
            stats: entry.stats().clone(),
        });
        for child in &self.branches[index].children {
            self.visit(*child, exclusive, hierarchy, out);
        }
        hierarchy.pop();
    }

    fn add_branch(&mut self, parent: usize, node: TreeNode<C>, distinct: bool) -> usize {
        let index = self.branches.len();
        if !distinct {
            self.lookup.insert((parent, node.hash()), index);
        }
        self.branches.push(Branch {
            node,
            children: Vec::new(),
        });
        self.branches[parent].children.push(index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TripCount;
    use crate::Scope;

    fn trips(n: u64) -> TripCount {
        let mut trip = TripCount::default();
        for _ in 0..n {
            trip.start();
        }
        trip
    }

    fn nested(tid: u64, outer: u64, inner: u64) -> ThreadGraph<TripCount> {
        let mut graph = ThreadGraph::new(tid, 1);
        let a = graph.insert(100, Scope::Tree, 64).unwrap();
        let b = graph.insert(200, Scope::Tree, 64).unwrap();
        graph.record(b, &trips(inner));
        graph.pop(b);
        graph.record(a, &trips(outer));
        graph.pop(a);
        graph
    }

    #[test]
    fn merges_matching_paths() {
        let mut tree = MasterTree::default();
        tree.merge(&nested(1, 10, 4));
        tree.merge(&nested(2, 6, 2));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.merged(), 2);

        let inclusive = tree.results();
        assert_eq!(inclusive[0].data.get(), 16);
        assert_eq!(inclusive[0].laps, 2);
        assert_eq!(inclusive[1].data.get(), 6);

        let nodes = tree.nodes();
        assert_eq!(nodes[0].tids().len(), 2);
    }

    #[test]
    fn exclusive_subtracts_children() {
        let mut tree = MasterTree::default();
        tree.merge(&nested(1, 10, 4));
        let exclusive = tree.exclusive_results();
        assert_eq!(exclusive[0].data.get(), 6);
        assert_eq!(exclusive[1].data.get(), 4);
    }

    #[test]
    fn timeline_nodes_stay_distinct() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        for _ in 0..3 {
            let node = graph.insert(7, Scope::Timeline, 64).unwrap();
            graph.record(node, &trips(1));
            graph.pop(node);
        }
        let mut tree = MasterTree::default();
        tree.merge(&graph);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn empty_graph_is_ignored() {
        let mut tree = MasterTree::<TripCount>::default();
        tree.merge(&ThreadGraph::new(1, 1));
        assert!(tree.is_empty());
        assert_eq!(tree.merged(), 0);
    }
}
