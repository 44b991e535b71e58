//! Heterogeneous collections of components that share a key and a lifecycle.

mod hybrid;
mod init;
mod list;
mod tuple;

pub use hybrid::ComponentHybrid;
pub use list::ComponentList;
pub use tuple::ComponentTuple;

use std::fmt;

use crate::component::{AuditEvent, Peers};
use crate::operation::{
    AddSecondary, Assemble, Audit, CollectPeers, Count, Derive, Describe, Divide, FindComponent,
    ForType, Inspect, Mark, MarkBegin, MarkEnd, Measure, Operation, Pass, Pop, Push, Reset, Sample,
    SetPrefix, SetScope, Start, Stop, Store, WithComponent,
};
use crate::storage::{add_hash_id, display_key};
use crate::{settings, Component, Scope};

/// Key, counters and flags shared by every bundle flavour.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BundleCore {
    hash: u64,
    laps: u64,
    store: bool,
    scope: Scope,
    is_pushed: bool,
    is_running: bool,
}

impl BundleCore {
    pub fn new(hash: u64) -> Self {
        Self {
            hash,
            laps: 0,
            store: true,
            scope: settings::get().scope,
            is_pushed: false,
            is_running: false,
        }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn laps(&self) -> u64 {
        self.laps
    }

    pub fn store(&self) -> bool {
        self.store
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_pushed(&self) -> bool {
        self.is_pushed
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }
}

/// Common surface of [`ComponentTuple`], [`ComponentList`] and [`ComponentHybrid`].
///
/// Implementors provide traversal and value access; every lifecycle verb is
/// built on top of [`Bundle::invoke`].
pub trait Bundle: Clone + Default + Send + 'static {
    type Value: Clone + fmt::Debug;
    type Labeled: Clone + fmt::Debug;

    /// Some member reads its peers in `assemble`/`derive`.
    const DERIVES: bool;

    fn from_core(core: BundleCore) -> Self;
    fn core(&self) -> &BundleCore;
    fn core_mut(&mut self) -> &mut BundleCore;

    /// Applies `op` to every active component in declaration order.
    fn invoke<O: Operation>(&mut self, op: &mut O);
    fn inspect<I: Inspect>(&self, visitor: &mut I);

    fn get(&self) -> Self::Value;
    fn get_labeled(&self) -> Self::Labeled;

    /// Component-wise merge. Keys are not compared.
    fn accumulate_components(&mut self, rhs: &Self);
    fn subtract_components(&mut self, rhs: &Self);

    fn new(key: &str) -> Self {
        Self::with_hash(add_hash_id(key))
    }

    /// Bundle for a key registered earlier with [`add_hash_id`](crate::storage::add_hash_id).
    fn with_hash(hash: u64) -> Self {
        let mut bundle = Self::from_core(BundleCore::new(hash));
        bundle.initialize();
        bundle.configure();
        bundle
    }

    /// Runs on every bundle built by [`new`](Bundle::new) and
    /// [`with_hash`](Bundle::with_hash), before `configure`. Bundles with
    /// optional components apply their registered default initializer here.
    fn initialize(&mut self) {}

    fn key(&self) -> String {
        display_key(self.core().hash)
    }

    fn hash(&self) -> u64 {
        self.core().hash
    }

    fn laps(&self) -> u64 {
        self.core().laps
    }

    /// Whether `start`/`stop` link the bundle into call-graph storage.
    fn store(&self) -> bool {
        self.core().store
    }

    fn set_store(&mut self, store: bool) {
        self.core_mut().store = store;
    }

    fn scope(&self) -> Scope {
        self.core().scope
    }

    fn is_running(&self) -> bool {
        self.core().is_running
    }

    /// Number of components currently held.
    fn count(&self) -> usize {
        let mut count = Count::default();
        self.inspect(&mut count);
        count.0
    }

    fn push(&mut self) {
        let core = self.core();
        if !core.store || core.is_pushed || !settings::get().enabled {
            return;
        }
        let mut push = Push::new(core.hash, core.scope);
        self.invoke(&mut push);
        self.core_mut().is_pushed = true;
    }

    fn pop(&mut self) {
        if !self.core().is_pushed {
            return;
        }
        self.invoke(&mut Pop);
        self.core_mut().is_pushed = false;
    }

    fn start(&mut self) {
        if self.core().is_running {
            return;
        }
        self.push();
        for pass in Pass::ALL {
            self.invoke(&mut Start::new(pass));
        }
        self.core_mut().is_running = true;
    }

    fn stop(&mut self) {
        if !self.core().is_running {
            return;
        }
        for pass in Pass::ALL {
            self.invoke(&mut Stop::new(pass));
        }
        self.derive();
        let core = self.core_mut();
        core.is_running = false;
        core.laps += 1;
        self.pop();
    }

    fn mark(&mut self) {
        self.invoke(&mut Mark);
    }

    fn mark_begin(&mut self) {
        self.invoke(&mut MarkBegin);
    }

    fn mark_end(&mut self) {
        self.invoke(&mut MarkEnd);
    }

    fn audit(&mut self, event: AuditEvent<'_>) {
        self.invoke(&mut Audit::new(event));
    }

    /// Hands `value` to every component's `store`.
    fn record(&mut self, value: f64) {
        self.invoke(&mut Store(value));
    }

    fn measure(&mut self) {
        self.invoke(&mut Measure);
    }

    fn sample(&mut self) {
        self.invoke(&mut Sample);
    }

    /// Snapshot of the current components, for `assemble`/`derive`.
    fn peers(&self) -> Peers {
        let mut collect = CollectPeers::default();
        self.inspect(&mut collect);
        collect.peers
    }

    fn assemble(&mut self) {
        if Self::DERIVES {
            let peers = self.peers();
            self.invoke(&mut Assemble::new(&peers));
        }
    }

    fn derive(&mut self) {
        if Self::DERIVES {
            let peers = self.peers();
            self.invoke(&mut Derive::new(&peers));
        }
    }

    /// Forwards a named entry to the component of type `T`, if it accepts secondary data.
    fn add_secondary<T: Component>(&mut self, name: &str, value: T) {
        self.invoke(&mut AddSecondary::new(name, value));
    }

    fn set_prefix(&mut self, prefix: &str) {
        let hash = self.core().hash;
        self.invoke(&mut SetPrefix::new(hash, prefix));
    }

    fn set_scope(&mut self, scope: Scope) {
        self.core_mut().scope = scope;
        self.invoke(&mut SetScope(scope));
    }

    /// Moves the bundle to a new key. Has no effect on an open storage node.
    fn rekey(&mut self, key: &str) {
        let hash = add_hash_id(key);
        self.core_mut().hash = hash;
        self.invoke(&mut SetPrefix::new(hash, key));
    }

    /// Zeroes every component and counter. Key, store flag and scope are kept.
    ///
    /// A running bundle is stopped first, so its open storage nodes are
    /// recorded and closed.
    fn reset(&mut self) {
        self.stop();
        self.pop();
        clear_state(self);
    }

    /// Copy with the same configuration and zeroed components.
    ///
    /// The copy is not linked to the storage nodes of `self`, which stay open.
    fn clone_fresh(&self) -> Self {
        let mut fresh = self.clone();
        clear_state(&mut fresh);
        fresh
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.accumulate_components(rhs);
        self.core_mut().laps += rhs.core().laps;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.subtract_components(rhs);
        let core = self.core_mut();
        core.laps = core.laps.saturating_sub(rhs.core().laps);
    }

    fn divide(&mut self, denominator: u64) {
        if denominator == 0 {
            return;
        }
        self.invoke(&mut Divide(denominator));
        self.core_mut().laps /= denominator;
    }

    /// Copy of the component of type `T`, if the bundle holds an active one.
    fn get_component<T: Component>(&self) -> Option<T> {
        let mut find = FindComponent::<T>::default();
        self.inspect(&mut find);
        find.found
    }

    /// Runs `f` on the component of type `T`. Returns `false` when there is none.
    fn with_component<T: Component, F: FnOnce(&mut T)>(&mut self, f: F) -> bool {
        let mut op = WithComponent::<T, F>::new(f);
        self.invoke(&mut op);
        op.was_applied()
    }

    /// Sets prefix and scope on every component and lets derived components
    /// look at their peers.
    fn configure(&mut self) {
        let key = self.key();
        let hash = self.core().hash;
        let scope = self.core().scope;
        self.invoke(&mut SetPrefix::new(hash, &key));
        self.invoke(&mut SetScope(scope));
        self.assemble();
    }

    /// `key : part, part [laps: n]`
    fn describe(&self) -> String {
        let mut describe = Describe::default();
        self.inspect(&mut describe);
        format!(
            "{} : {} [laps: {}]",
            self.key(),
            describe.parts.join(", "),
            self.core().laps
        )
    }
}

/// Zeroes components and counters and forgets storage links without popping.
fn clear_state<B: Bundle>(bundle: &mut B) {
    bundle.invoke(&mut Reset);
    let core = bundle.core_mut();
    core.laps = 0;
    core.is_pushed = false;
    core.is_running = false;
    bundle.configure();
}

/// Stops the component of type `T` if the bundle is running and closes its
/// storage node, ahead of removing it from the bundle.
pub(crate) fn close_component<B: Bundle, T: Component>(bundle: &mut B) {
    if bundle.core().is_running {
        for pass in Pass::ALL {
            bundle.invoke(&mut ForType::<T, _>::new(Stop::new(pass)));
        }
    }
    if bundle.core().is_pushed {
        bundle.invoke(&mut ForType::<T, _>::new(Pop));
    }
}

/// Arithmetic and `Display` for a bundle type in terms of [`Bundle`].
macro_rules! bundle_ops {
    ([$($generics:tt)*] $ty:ty) => {
        impl<$($generics)*> ::std::ops::AddAssign<&$ty> for $ty {
            fn add_assign(&mut self, rhs: &$ty) {
                $crate::Bundle::accumulate(self, rhs);
            }
        }

        impl<$($generics)*> ::std::ops::SubAssign<&$ty> for $ty {
            fn sub_assign(&mut self, rhs: &$ty) {
                $crate::Bundle::subtract(self, rhs);
            }
        }

        impl<$($generics)*> ::std::ops::Sub<&$ty> for &$ty {
            type Output = $ty;

            fn sub(self, rhs: &$ty) -> $ty {
                let mut out = self.clone();
                $crate::Bundle::subtract(&mut out, rhs);
                out
            }
        }

        impl<$($generics)*> ::std::ops::Div<u64> for $ty {
            type Output = $ty;

            fn div(mut self, rhs: u64) -> $ty {
                $crate::Bundle::divide(&mut self, rhs);
                self
            }
        }

        impl<$($generics)*> ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&$crate::Bundle::describe(self))
            }
        }
    };
}

pub(crate) use bundle_ops;
