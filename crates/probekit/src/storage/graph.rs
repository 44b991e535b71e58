use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::hash::{add_hash_id, display_key};
use super::node::{Graph, ResultNode};
use super::NodeId;
use crate::{Component, Scope};

const ROOT: usize = 0;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub(crate) struct Vertex<C> {
    pub(crate) graph: Graph<C>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    /// Never merged with siblings of the same hash.
    pub(crate) distinct: bool,
}

/// Call graph of one component type on one thread.
#[derive(Clone, Debug)]
pub struct ThreadGraph<C> {
    id: u64,
    vertices: Vec<Vertex<C>>,
    lookup: HashMap<(usize, u64), usize>,
    cursor: usize,
    generation: u64,
    tid: u64,
    pid: u32,
}

impl<C: Component> ThreadGraph<C> {
    pub fn new(tid: u64, pid: u32) -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            vertices: vec![Vertex {
                graph: Graph::dummy(tid, pid),
                parent: None,
                children: Vec::new(),
                distinct: false,
            }],
            lookup: HashMap::new(),
            cursor: ROOT,
            generation: 0,
            tid,
            pid,
        }
    }

    pub fn tid(&self) -> u64 {
        self.tid
    }

    /// Number of recorded nodes, the root excluded.
    pub fn len(&self) -> usize {
        self.vertices.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> usize {
        self.vertices[self.cursor].graph.depth()
    }

    pub(crate) fn vertices(&self) -> &[Vertex<C>] {
        &self.vertices
    }

    /// Links a new measurement point under the cursor and moves the cursor to it.
    ///
    /// Returns `None` when the node would sit deeper than `max_depth`.
    pub fn insert(&mut self, hash: u64, scope: Scope, max_depth: usize) -> Option<NodeId> {
        let parent = match scope {
            Scope::Flat => ROOT,
            Scope::Tree | Scope::Timeline => self.cursor,
        };
        let depth = self.vertices[parent].graph.depth() + 1;
        if depth > max_depth {
            tracing::trace!(hash, depth, max_depth, "skipping node beyond max depth");
            return None;
        }

        let index = match scope {
            Scope::Timeline => self.add_child(parent, hash, true),
            Scope::Tree | Scope::Flat => match self.lookup.get(&(parent, hash)) {
                Some(index) => *index,
                None => self.add_child(parent, hash, false),
            },
        };

        let prev = self.cursor;
        self.cursor = index;
        tracing::trace!(
            key = %display_key(hash),
            depth,
            scope = %scope,
            "push"
        );
        Some(NodeId {
            graph: self.id,
            index,
            generation: self.generation,
            prev,
        })
    }

    /// Restores the cursor to where it was before `node` was inserted.
    pub fn pop(&mut self, node: NodeId) {
        if !self.is_live(node) {
            tracing::warn!(index = node.index, "pop of unknown node");
            return;
        }
        tracing::trace!(key = %display_key(self.vertices[node.index].graph.hash()), "pop");
        self.cursor = node.prev;
    }

    pub fn record(&mut self, node: NodeId, value: &C) {
        if !self.is_live(node) {
            tracing::warn!(index = node.index, "record into unknown node");
            return;
        }
        self.vertices[node.index].graph.record(value);
    }

    /// Records `value` into the child of `node` keyed `"<node key>/<name>"`.
    pub fn append_secondary(&mut self, node: NodeId, name: &str, value: &C, max_depth: usize) {
        if !self.is_live(node) {
            tracing::warn!(index = node.index, "secondary entry for unknown node");
            return;
        }
        let parent = &self.vertices[node.index].graph;
        if parent.depth() + 1 > max_depth {
            return;
        }
        let hash = add_hash_id(&format!("{}/{}", display_key(parent.hash()), name));
        let index = match self.lookup.get(&(node.index, hash)) {
            Some(index) => *index,
            None => self.add_child(node.index, hash, false),
        };
        self.vertices[index].graph.record(value);
    }

    /// Drops every node and invalidates the ids handed out so far.
    pub fn clear(&mut self) {
        self.vertices.truncate(1);
        self.vertices[ROOT].children.clear();
        self.lookup.clear();
        self.cursor = ROOT;
        self.generation += 1;
    }

    /// Depth-first flattening, the root excluded.
    pub fn results(&self) -> Vec<ResultNode<C>> {
        let mut out = Vec::with_capacity(self.len());
        let mut hierarchy = Vec::new();
        for child in &self.vertices[ROOT].children {
            self.flatten(*child, &mut hierarchy, &mut out);
        }
        out
    }

    fn flatten(&self, index: usize, hierarchy: &mut Vec<u64>, out: &mut Vec<ResultNode<C>>) {
        let graph = &self.vertices[index].graph;
        hierarchy.push(graph.hash());
        out.push(ResultNode {
            tid: graph.tid(),
            pid: graph.pid(),
            depth: graph.depth(),
            hash: graph.hash(),
            rolling_hash: ResultNode::<C>::rolling_hash_of(hierarchy),
            prefix: ResultNode::<C>::format_prefix(graph.depth(), &display_key(graph.hash())),
            hierarchy: hierarchy.clone(),
            laps: graph.laps(),
            data: graph.obj().clone(),
            stats: graph.stats().clone(),
        });
        for child in &self.vertices[index].children {
            self.flatten(*child, hierarchy, out);
        }
        hierarchy.pop();
    }

    fn add_child(&mut self, parent: usize, hash: u64, distinct: bool) -> usize {
        let index = self.vertices.len();
        let depth = self.vertices[parent].graph.depth() + 1;
        self.vertices.push(Vertex {
            graph: Graph::new(hash, C::default(), depth, self.tid, self.pid, false),
            parent: Some(parent),
            children: Vec::new(),
            distinct,
        });
        self.vertices[parent].children.push(index);
        if !distinct {
            self.lookup.insert((parent, hash), index);
        }
        index
    }

    /// Ids from another graph (another thread) or from before a `clear` are rejected.
    fn is_live(&self, node: NodeId) -> bool {
        node.graph == self.id
            && node.generation == self.generation
            && node.index < self.vertices.len()
            && node.prev < self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TripCount;

    fn one() -> TripCount {
        let mut trip = TripCount::default();
        trip.start();
        trip
    }

    #[test]
    fn tree_scope_reuses_nodes() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        for _ in 0..3 {
            let outer = graph.insert(10, Scope::Tree, 64).unwrap();
            let inner = graph.insert(20, Scope::Tree, 64).unwrap();
            graph.record(inner, &one());
            graph.pop(inner);
            graph.record(outer, &one());
            graph.pop(outer);
        }
        let results = graph.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].depth, 1);
        assert_eq!(results[0].laps, 3);
        assert_eq!(results[1].depth, 2);
        assert_eq!(results[1].hierarchy, vec![10, 20]);
        assert_eq!(results[1].rolling_hash, 30);
        assert_eq!(graph.depth(), 0);
    }

    #[test]
    fn flat_scope_attaches_to_root() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        let outer = graph.insert(10, Scope::Tree, 64).unwrap();
        let flat = graph.insert(20, Scope::Flat, 64).unwrap();
        assert_eq!(graph.depth(), 1);
        graph.pop(flat);
        assert_eq!(graph.depth(), 1);
        graph.pop(outer);
        let depths: Vec<usize> = graph.results().iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![1, 1]);
    }

    #[test]
    fn timeline_scope_never_reuses() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        for _ in 0..4 {
            let node = graph.insert(10, Scope::Timeline, 64).unwrap();
            graph.pop(node);
        }
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn max_depth_limits_insertion() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        let first = graph.insert(1, Scope::Tree, 1).unwrap();
        assert!(graph.insert(2, Scope::Tree, 1).is_none());
        graph.pop(first);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn clear_invalidates_ids() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        let node = graph.insert(1, Scope::Tree, 64).unwrap();
        graph.clear();
        graph.record(node, &one());
        graph.pop(node);
        assert!(graph.is_empty());
        assert_eq!(graph.depth(), 0);
    }

    #[test]
    fn ids_from_another_graph_are_rejected() {
        let mut owner = ThreadGraph::<TripCount>::new(1, 1);
        let mut other = ThreadGraph::<TripCount>::new(2, 1);
        let foreign = owner.insert(10, Scope::Tree, 64).unwrap();
        let local = other.insert(10, Scope::Tree, 64).unwrap();
        assert_eq!(foreign.index, local.index);

        other.record(foreign, &one());
        other.pop(foreign);
        assert_eq!(other.depth(), 1);
        assert_eq!(other.results()[0].laps, 0);

        other.pop(local);
        assert_eq!(other.depth(), 0);
    }

    #[test]
    fn secondary_entries_become_children() {
        let mut graph = ThreadGraph::<TripCount>::new(1, 1);
        let key = add_hash_id("graph-secondary-parent");
        let node = graph.insert(key, Scope::Tree, 64).unwrap();
        graph.append_secondary(node, "io", &one(), 64);
        graph.append_secondary(node, "io", &one(), 64);
        graph.pop(node);
        let results = graph.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].prefix, "|_graph-secondary-parent/io");
        assert_eq!(results[1].laps, 2);
    }
}
