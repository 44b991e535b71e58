//! Vertices of the call graph and their report projections.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::{AddAssign, SubAssign};

use super::hash::display_key;
use super::stats::Statistics;
use crate::Component;

/// A component value paired with the statistics of the values it aggregates.
#[derive(Clone, Debug, Default)]
pub struct Entry<C> {
    data: C,
    stats: Statistics,
}

impl<C: Component> Entry<C> {
    pub fn new(data: C, stats: Statistics) -> Self {
        Self { data, stats }
    }

    pub fn data(&self) -> &C {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut C {
        &mut self.data
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }
}

impl<C: Component> AddAssign<&Entry<C>> for Entry<C> {
    fn add_assign(&mut self, rhs: &Entry<C>) {
        self.data.accumulate(&rhs.data);
        self.stats += &rhs.stats;
    }
}

impl<C: Component> SubAssign<&Entry<C>> for Entry<C> {
    fn sub_assign(&mut self, rhs: &Entry<C>) {
        self.data.subtract(&rhs.data);
        self.stats -= &rhs.stats;
    }
}

impl<C: Component> Serialize for Entry<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Entry", 2)?;
        state.serialize_field("entry", &self.data.get())?;
        state.serialize_field("stats", &self.stats)?;
        state.end()
    }
}

/// One vertex of a per-thread call graph.
#[derive(Clone, Debug)]
pub struct Graph<C> {
    is_dummy: bool,
    tid: u64,
    pid: u32,
    hash: u64,
    depth: usize,
    laps: u64,
    obj: C,
    stats: Statistics,
}

impl<C: Component> Graph<C> {
    pub fn new(hash: u64, obj: C, depth: usize, tid: u64, pid: u32, is_dummy: bool) -> Self {
        Self {
            is_dummy,
            tid,
            pid,
            hash,
            depth,
            laps: 0,
            obj,
            stats: Statistics::default(),
        }
    }

    /// Root placeholder of a graph.
    pub fn dummy(tid: u64, pid: u32) -> Self {
        Self::new(0, C::default(), 0, tid, pid, true)
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn tid(&self) -> u64 {
        self.tid
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of measurements recorded into the node.
    pub fn laps(&self) -> u64 {
        self.laps
    }

    pub fn obj(&self) -> &C {
        &self.obj
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Adds one measurement to the node.
    pub fn record(&mut self, value: &C) {
        self.laps += 1;
        self.obj.accumulate(value);
        if let Some(stat) = value.statistic() {
            self.stats.push(stat);
        }
    }
}

impl<C> PartialEq for Graph<C> {
    fn eq(&self, rhs: &Self) -> bool {
        self.hash == rhs.hash && self.depth == rhs.depth
    }
}

impl<C: Component> AddAssign<&Graph<C>> for Graph<C> {
    fn add_assign(&mut self, rhs: &Graph<C>) {
        self.laps += rhs.laps;
        self.obj.accumulate(&rhs.obj);
        self.stats += &rhs.stats;
    }
}

impl<C: Component> SubAssign<&Graph<C>> for Graph<C> {
    fn sub_assign(&mut self, rhs: &Graph<C>) {
        self.laps = self.laps.saturating_sub(rhs.laps);
        self.obj.subtract(&rhs.obj);
        self.stats -= &rhs.stats;
    }
}

impl<C: Component> Serialize for Graph<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Graph", 9)?;
        state.serialize_field("hash", &self.hash)?;
        state.serialize_field("prefix", &display_key(self.hash))?;
        state.serialize_field("laps", &self.laps)?;
        state.serialize_field("entry", &self.obj.get())?;
        state.serialize_field("depth", &self.depth)?;
        state.serialize_field("stats", &self.stats)?;
        state.serialize_field("tid", &self.tid)?;
        state.serialize_field("pid", &self.pid)?;
        state.serialize_field("dummy", &self.is_dummy)?;
        state.end()
    }
}

/// A vertex of the process-wide tree, aggregated over threads and processes.
#[derive(Clone, Debug)]
pub struct TreeNode<C> {
    is_dummy: bool,
    hash: u64,
    depth: usize,
    laps: u64,
    tids: BTreeSet<u64>,
    pids: BTreeSet<u32>,
    inclusive: Entry<C>,
    exclusive: Entry<C>,
}

impl<C: Component> TreeNode<C> {
    pub fn dummy() -> Self {
        Self {
            is_dummy: true,
            hash: 0,
            depth: 0,
            laps: 0,
            tids: BTreeSet::new(),
            pids: BTreeSet::new(),
            inclusive: Entry::default(),
            exclusive: Entry::default(),
        }
    }

    /// Builds a node from a graph vertex. The exclusive entry starts equal to
    /// the inclusive one; callers subtract the children.
    pub fn from_graph(graph: &Graph<C>) -> Self {
        let entry = Entry::new(graph.obj.clone(), graph.stats.clone());
        Self {
            is_dummy: graph.is_dummy,
            hash: graph.hash,
            depth: graph.depth,
            laps: graph.laps,
            tids: BTreeSet::from([graph.tid]),
            pids: BTreeSet::from([graph.pid]),
            inclusive: entry.clone(),
            exclusive: entry,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.is_dummy
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn laps(&self) -> u64 {
        self.laps
    }

    pub fn tids(&self) -> &BTreeSet<u64> {
        &self.tids
    }

    pub fn pids(&self) -> &BTreeSet<u32> {
        &self.pids
    }

    pub fn inclusive(&self) -> &Entry<C> {
        &self.inclusive
    }

    pub fn exclusive(&self) -> &Entry<C> {
        &self.exclusive
    }

    pub(crate) fn exclusive_mut(&mut self) -> &mut Entry<C> {
        &mut self.exclusive
    }
}

impl<C> PartialEq for TreeNode<C> {
    fn eq(&self, rhs: &Self) -> bool {
        self.is_dummy == rhs.is_dummy && self.hash == rhs.hash && self.depth == rhs.depth
    }
}

impl<C: Component> AddAssign<&TreeNode<C>> for TreeNode<C> {
    fn add_assign(&mut self, rhs: &TreeNode<C>) {
        self.laps += rhs.laps;
        self.inclusive += &rhs.inclusive;
        self.exclusive += &rhs.exclusive;
        self.tids.extend(rhs.tids.iter().copied());
        self.pids.extend(rhs.pids.iter().copied());
    }
}

impl<C: Component> SubAssign<&TreeNode<C>> for TreeNode<C> {
    fn sub_assign(&mut self, rhs: &TreeNode<C>) {
        self.laps = self.laps.saturating_sub(rhs.laps);
        self.inclusive -= &rhs.inclusive;
        self.exclusive -= &rhs.exclusive;
    }
}

impl<C: Component> Serialize for TreeNode<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TreeNode", 9)?;
        state.serialize_field("hash", &self.hash)?;
        state.serialize_field("prefix", &display_key(self.hash))?;
        state.serialize_field("laps", &self.laps)?;
        state.serialize_field("tid", &self.tids)?;
        state.serialize_field("pid", &self.pids)?;
        state.serialize_field("depth", &self.depth)?;
        state.serialize_field("is_dummy", &self.is_dummy)?;
        state.serialize_field("inclusive", &self.inclusive)?;
        state.serialize_field("exclusive", &self.exclusive)?;
        state.end()
    }
}

/// Flattened node handed out for reporting.
///
/// Two results are equal when depth, hash, rolling hash and prefix match;
/// thread ids and data are not part of the identity.
#[derive(Clone, Debug)]
pub struct ResultNode<C> {
    pub tid: u64,
    pub pid: u32,
    pub depth: usize,
    pub hash: u64,
    pub rolling_hash: u64,
    pub prefix: String,
    pub hierarchy: Vec<u64>,
    pub laps: u64,
    pub data: C,
    pub stats: Statistics,
}

impl<C> ResultNode<C> {
    /// Display prefix for a node at `depth` whose key is `key`.
    pub fn format_prefix(depth: usize, key: &str) -> String {
        if depth <= 1 {
            key.to_string()
        } else {
            format!("{:indent$}|_{}", "", key, indent = 2 * (depth - 2))
        }
    }

    /// Sum of the hashes on the path from the root.
    pub fn rolling_hash_of(hierarchy: &[u64]) -> u64 {
        hierarchy.iter().fold(0u64, |acc, h| acc.wrapping_add(*h))
    }
}

impl<C> PartialEq for ResultNode<C> {
    fn eq(&self, rhs: &Self) -> bool {
        self.depth == rhs.depth
            && self.hash == rhs.hash
            && self.rolling_hash == rhs.rolling_hash
            && self.prefix == rhs.prefix
    }
}

impl<C: Component> AddAssign<&ResultNode<C>> for ResultNode<C> {
    fn add_assign(&mut self, rhs: &ResultNode<C>) {
        self.laps += rhs.laps;
        self.data.accumulate(&rhs.data);
        self.stats += &rhs.stats;
    }
}

impl<C: Component> SubAssign<&ResultNode<C>> for ResultNode<C> {
    fn sub_assign(&mut self, rhs: &ResultNode<C>) {
        self.laps = self.laps.saturating_sub(rhs.laps);
        self.data.subtract(&rhs.data);
        self.stats -= &rhs.stats;
    }
}

impl<C: Component> Serialize for ResultNode<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResultNode", 7)?;
        state.serialize_field("hash", &self.hash)?;
        state.serialize_field("prefix", &self.prefix)?;
        state.serialize_field("depth", &self.depth)?;
        state.serialize_field("laps", &self.laps)?;
        state.serialize_field("entry", &self.data.get())?;
        state.serialize_field("stats", &self.stats)?;
        state.serialize_field("rolling_hash", &self.rolling_hash)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TripCount;

    fn trips(n: u64) -> TripCount {
        let mut trip = TripCount::default();
        for _ in 0..n {
            trip.start();
        }
        trip
    }

    fn result(depth: usize, hash: u64, prefix: &str, data: u64) -> ResultNode<TripCount> {
        ResultNode {
            tid: 1,
            pid: 1,
            depth,
            hash,
            rolling_hash: hash,
            prefix: prefix.to_string(),
            hierarchy: vec![hash],
            laps: 1,
            data: trips(data),
            stats: Statistics::default(),
        }
    }

    #[test]
    fn graph_identity_is_hash_and_depth() {
        let a = Graph::new(7, trips(1), 2, 10, 1, false);
        let b = Graph::new(7, trips(5), 2, 11, 2, false);
        let c = Graph::new(7, trips(1), 3, 10, 1, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn graph_merge_adds_obj_and_stats() {
        let mut a = Graph::new(7, TripCount::default(), 1, 10, 1, false);
        a.record(&trips(2));
        let mut b = Graph::new(7, TripCount::default(), 1, 10, 1, false);
        b.record(&trips(3));
        a += &b;
        assert_eq!(a.obj().get(), 5);
        assert_eq!(a.stats().count(), 2);
        assert_eq!(a.laps(), 2);
        a -= &b;
        assert_eq!(a.obj().get(), 2);
        assert_eq!(a.stats().count(), 1);
    }

    #[test]
    fn tree_merge_unions_ids() {
        let mut lhs = TreeNode::from_graph(&Graph::new(3, trips(1), 1, 100, 1, false));
        let rhs = TreeNode::from_graph(&Graph::new(3, trips(2), 1, 200, 1, false));
        lhs += &rhs;
        assert_eq!(lhs.inclusive().data().get(), 3);
        assert_eq!(lhs.tids().iter().copied().collect::<Vec<_>>(), vec![100, 200]);
        assert_eq!(lhs.pids().len(), 1);
    }

    #[test]
    fn result_equality_ignores_data() {
        let a = result(1, 9, "main", 1);
        let b = result(1, 9, "main", 50);
        let c = result(1, 9, "other", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn prefix_indents_by_depth() {
        assert_eq!(ResultNode::<TripCount>::format_prefix(1, "main"), "main");
        assert_eq!(ResultNode::<TripCount>::format_prefix(2, "work"), "|_work");
        assert_eq!(ResultNode::<TripCount>::format_prefix(3, "leaf"), "  |_leaf");
    }

    #[test]
    fn result_serializes_entry_value() {
        let json = serde_json::to_value(result(2, 5, "|_x", 4)).unwrap();
        assert_eq!(json["entry"], 4);
        assert_eq!(json["depth"], 2);
        assert_eq!(json["prefix"], "|_x");
    }
}
