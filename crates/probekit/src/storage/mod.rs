//! Per-thread call graphs and the process-wide trees they merge into.
//!
//! Each thread keeps one [`ThreadGraph`] per component type. Bundles push a
//! node on start and record into it on stop. When the thread exits, or when
//! [`finalize`] is called, the graph is folded into the [`MasterTree`] of its
//! component type, which is what reports read.

mod graph;
mod hash;
mod node;
mod stats;
mod tree;

pub use graph::ThreadGraph;
pub use hash::{add_hash_alias, add_hash_id, hash_identifier, hash_key};
pub(crate) use hash::display_key;
pub use node::{Entry, Graph, ResultNode, TreeNode};
pub use stats::Statistics;
pub use tree::MasterTree;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::output::{ComponentReport, ReportRow};
use crate::tid::{current_pid, current_tid};
use crate::{settings, Component, Scope};

/// Handle to a node of the calling thread's graph.
///
/// Ids from before a [`reset`] or [`finalize`], or from another thread's
/// graph, are stale and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId {
    pub(crate) graph: u64,
    pub(crate) index: usize,
    pub(crate) generation: u64,
    pub(crate) prev: usize,
}

trait ErasedGraph {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn merge_into(&self, master: &mut HashMap<TypeId, Box<dyn ErasedTree>>);
    fn clear(&mut self);
}

impl<C: Component> ErasedGraph for ThreadGraph<C> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn merge_into(&self, master: &mut HashMap<TypeId, Box<dyn ErasedTree>>) {
        let tree = master
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(MasterTree::<C>::default()));
        if let Some(tree) = tree.as_any_mut().downcast_mut::<MasterTree<C>>() {
            tree.merge(self);
        }
    }

    fn clear(&mut self) {
        ThreadGraph::clear(self);
    }
}

trait ErasedTree: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn report(&self) -> ComponentReport;
}

impl<C: Component> ErasedTree for MasterTree<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn report(&self) -> ComponentReport {
        component_report(self)
    }
}

#[derive(Default)]
struct ThreadStorage {
    graphs: HashMap<TypeId, Box<dyn ErasedGraph>>,
    order: Vec<TypeId>,
}

impl Drop for ThreadStorage {
    fn drop(&mut self) {
        let mut master = master();
        for id in &self.order {
            if let Some(graph) = self.graphs.get(id) {
                graph.merge_into(&mut master);
            }
        }
        register_order(&self.order);
    }
}

thread_local! {
    static THREAD: RefCell<ThreadStorage> = RefCell::new(ThreadStorage::default());
}

static MASTER: LazyLock<Mutex<HashMap<TypeId, Box<dyn ErasedTree>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// First-seen order of component types, so reports are stable.
static ORDER: LazyLock<Mutex<Vec<TypeId>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn master() -> MutexGuard<'static, HashMap<TypeId, Box<dyn ErasedTree>>> {
    MASTER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn register_order(ids: &[TypeId]) {
    let mut order = ORDER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    for id in ids {
        if !order.contains(id) {
            order.push(*id);
        }
    }
}

/// Runs `f` on the calling thread's graph for `C`, creating it on first use.
///
/// Returns `None` while the thread is being torn down.
fn with_graph<C: Component, R>(f: impl FnOnce(&mut ThreadGraph<C>) -> R) -> Option<R> {
    THREAD
        .try_with(|storage| {
            let mut storage = storage.try_borrow_mut().ok()?;
            let storage = &mut *storage;
            let id = TypeId::of::<C>();
            if !storage.graphs.contains_key(&id) {
                storage.order.push(id);
                storage
                    .graphs
                    .insert(id, Box::new(ThreadGraph::<C>::new(current_tid(), current_pid())));
            }
            let graph = storage
                .graphs
                .get_mut(&id)?
                .as_any_mut()
                .downcast_mut::<ThreadGraph<C>>()?;
            Some(f(graph))
        })
        .ok()
        .flatten()
}

pub(crate) fn insert<C: Component>(hash: u64, scope: Scope) -> Option<NodeId> {
    let max_depth = settings::get().max_depth;
    with_graph::<C, _>(|graph| graph.insert(hash, scope, max_depth)).flatten()
}

pub(crate) fn pop<C: Component>(node: NodeId) {
    with_graph::<C, _>(|graph| graph.pop(node));
}

pub(crate) fn record<C: Component>(node: NodeId, value: &C) {
    with_graph::<C, _>(|graph| graph.record(node, value));
}

pub(crate) fn append_secondary<C: Component>(node: NodeId, name: &str, value: &C) {
    let max_depth = settings::get().max_depth;
    with_graph::<C, _>(|graph| graph.append_secondary(node, name, value, max_depth));
}

/// Depth of the calling thread's cursor for `C`.
pub fn depth<C: Component>() -> usize {
    with_graph::<C, _>(|graph| graph.depth()).unwrap_or_default()
}

/// Moves the calling thread's graph for `C` into the process-wide tree.
///
/// Nodes still open on this thread stop recording.
pub fn finalize<C: Component>() {
    with_graph::<C, _>(|graph| {
        graph.merge_into(&mut master());
        graph.clear();
    });
    register_order(&[TypeId::of::<C>()]);
}

/// [`finalize`] for every component type the calling thread has touched.
pub fn finalize_all() {
    let order = THREAD
        .try_with(|storage| {
            let Ok(mut storage) = storage.try_borrow_mut() else {
                return Vec::new();
            };
            let storage = &mut *storage;
            let mut master = master();
            for id in &storage.order {
                if let Some(graph) = storage.graphs.get_mut(id) {
                    graph.merge_into(&mut master);
                    graph.clear();
                }
            }
            storage.order.clone()
        })
        .unwrap_or_default();
    register_order(&order);
}

/// Process-wide results for `C`, including what the calling thread has
/// recorded so far. Nothing is moved out of the thread graph.
pub fn results<C: Component>() -> Vec<ResultNode<C>> {
    snapshot::<C>().results()
}

/// Like [`results`] with each node's children subtracted.
pub fn exclusive_results<C: Component>() -> Vec<ResultNode<C>> {
    snapshot::<C>().exclusive_results()
}

/// Results recorded by the calling thread only.
pub fn thread_results<C: Component>() -> Vec<ResultNode<C>> {
    with_graph::<C, _>(|graph| graph.results()).unwrap_or_default()
}

/// Drops the process-wide tree and the calling thread's graph for `C`.
pub fn reset<C: Component>() {
    master().remove(&TypeId::of::<C>());
    with_graph::<C, _>(|graph| graph.clear());
}

fn snapshot<C: Component>() -> MasterTree<C> {
    let mut tree = master()
        .get(&TypeId::of::<C>())
        .and_then(|tree| tree.as_any().downcast_ref::<MasterTree<C>>())
        .cloned()
        .unwrap_or_default();
    with_graph::<C, _>(|graph| tree.merge(graph));
    tree
}

/// Reports for every component type in the process-wide store.
pub(crate) fn report_all() -> Vec<ComponentReport> {
    let order = ORDER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    let master = master();
    order
        .iter()
        .filter_map(|id| master.get(id))
        .map(|tree| tree.report())
        .filter(|report| !report.rows.is_empty())
        .collect()
}

pub(crate) fn component_report<C: Component>(tree: &MasterTree<C>) -> ComponentReport {
    let exclusive = tree.exclusive_results();
    let rows = tree
        .results()
        .into_iter()
        .zip(exclusive)
        .map(|(inclusive, exclusive)| ReportRow {
            prefix: inclusive.prefix.clone(),
            depth: inclusive.depth,
            hash: inclusive.hash,
            laps: inclusive.laps,
            value: inclusive.data.display(),
            exclusive: exclusive.data.display(),
            mean: stat_cell::<C>(&inclusive.stats, Statistics::mean),
            min: stat_cell::<C>(&inclusive.stats, Statistics::min),
            max: stat_cell::<C>(&inclusive.stats, Statistics::max),
            stddev: stat_cell::<C>(&inclusive.stats, Statistics::stddev),
            raw: serde_json::to_value(inclusive.data.get()).unwrap_or_default(),
        })
        .collect();
    ComponentReport {
        label: C::LABEL.to_string(),
        description: C::DESCRIPTION.to_string(),
        units: C::UNITS.to_string(),
        rows,
    }
}

fn stat_cell<C: Component>(stats: &Statistics, f: fn(&Statistics) -> f64) -> Option<String> {
    if stats.is_empty() {
        None
    } else {
        Some(C::format_statistic(f(stats)))
    }
}
