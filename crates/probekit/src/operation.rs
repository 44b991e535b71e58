//! One operation per verb, applied across every component of a bundle.
//!
//! Bundles never call component methods directly; they hand an operation to
//! [`ComponentSet::apply`](crate::ComponentSet::apply), which visits each
//! component in declaration order. Runtime enablement and probe state checks
//! live here so every bundle flavour behaves the same way.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::component::{AuditEvent, Peers, Probe};
use crate::storage::{self, NodeId};
use crate::{runtime, settings, Component, Scope};

/// A mutating traversal over the components of a bundle.
pub trait Operation {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>);
}

/// A read-only traversal over the components of a bundle.
pub trait Inspect {
    fn inspect<C: Component>(&mut self, probe: &Probe<C>);
}

/// Ordering class of a component for `start` and `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Priority below zero.
    Priority,
    /// Priority equal to zero.
    Standard,
    /// Priority above zero.
    Delayed,
}

impl Pass {
    pub const ALL: [Pass; 3] = [Pass::Priority, Pass::Standard, Pass::Delayed];

    #[inline]
    pub fn matches(self, priority: i32) -> bool {
        match self {
            Pass::Priority => priority < 0,
            Pass::Standard => priority == 0,
            Pass::Delayed => priority > 0,
        }
    }
}

pub struct Start {
    pass: Pass,
}

impl Start {
    pub fn new(pass: Pass) -> Self {
        Self { pass }
    }
}

impl Operation for Start {
    #[inline]
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if !self.pass.matches(C::START_PRIORITY) || !runtime::is_enabled::<C>() {
            return;
        }
        if probe.running {
            return;
        }
        probe.running = true;
        probe.component.start();
    }
}

pub struct Stop {
    pass: Pass,
}

impl Stop {
    pub fn new(pass: Pass) -> Self {
        Self { pass }
    }
}

impl Operation for Stop {
    #[inline]
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if !self.pass.matches(C::STOP_PRIORITY) || !runtime::is_enabled::<C>() {
            return;
        }
        if !probe.running {
            return;
        }
        probe.running = false;
        probe.component.stop();
        probe.laps += 1;
    }
}

macro_rules! simple_operation {
    ($(#[$meta:meta])* $name:ident, $method:ident) => {
        $(#[$meta])*
        pub struct $name;

        impl Operation for $name {
            #[inline]
            fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
                if runtime::is_enabled::<C>() {
                    probe.component.$method();
                }
            }
        }
    };
}

simple_operation!(Mark, mark);
simple_operation!(MarkBegin, mark_begin);
simple_operation!(MarkEnd, mark_end);
simple_operation!(
    /// Takes a standalone reading without a start/stop pair.
    Measure,
    measure
);
simple_operation!(Sample, sample);

pub struct Audit<'a> {
    event: AuditEvent<'a>,
}

impl<'a> Audit<'a> {
    pub fn new(event: AuditEvent<'a>) -> Self {
        Self { event }
    }
}

impl Operation for Audit<'_> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if runtime::is_enabled::<C>() {
            probe.component.audit(&self.event);
        }
    }
}

/// Hands a value to every component's `store`.
pub struct Store(pub f64);

impl Operation for Store {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if runtime::is_enabled::<C>() {
            probe.component.store(self.0);
        }
    }
}

pub struct Assemble<'p> {
    peers: &'p Peers,
}

impl<'p> Assemble<'p> {
    pub fn new(peers: &'p Peers) -> Self {
        Self { peers }
    }
}

impl Operation for Assemble<'_> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if C::DERIVES && runtime::is_enabled::<C>() {
            probe.derived = probe.component.assemble(self.peers);
        }
    }
}

pub struct Derive<'p> {
    peers: &'p Peers,
}

impl<'p> Derive<'p> {
    pub fn new(peers: &'p Peers) -> Self {
        Self { peers }
    }
}

impl Operation for Derive<'_> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if C::DERIVES && runtime::is_enabled::<C>() {
            probe.component.derive(self.peers);
        }
    }
}

/// Copies every component into a [`Peers`] snapshot.
#[derive(Default)]
pub struct CollectPeers {
    pub peers: Peers,
}

impl Inspect for CollectPeers {
    fn inspect<C: Component>(&mut self, probe: &Probe<C>) {
        self.peers.insert(&probe.component);
    }
}

/// Forwards a named secondary entry to components that accept one.
pub struct AddSecondary<'a, T> {
    name: &'a str,
    value: Option<T>,
}

impl<'a, T: Component> AddSecondary<'a, T> {
    pub fn new(name: &'a str, value: T) -> Self {
        Self {
            name,
            value: Some(value),
        }
    }
}

impl<T: Component> Operation for AddSecondary<'_, T> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if !C::SECONDARY || !runtime::is_enabled::<C>() || !settings::get().add_secondary {
            return;
        }
        let Some(target) = (&mut probe.component as &mut dyn Any).downcast_mut::<T>() else {
            return;
        };
        if let Some(value) = self.value.take() {
            target.add_secondary(self.name, value);
        }
    }
}

pub struct SetPrefix<'a> {
    hash: u64,
    prefix: &'a str,
}

impl<'a> SetPrefix<'a> {
    pub fn new(hash: u64, prefix: &'a str) -> Self {
        Self { hash, prefix }
    }
}

impl Operation for SetPrefix<'_> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if runtime::is_enabled::<C>() {
            probe.component.set_prefix_hash(self.hash);
            probe.component.set_prefix(self.prefix);
        }
    }
}

pub struct SetScope(pub Scope);

impl Operation for SetScope {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if runtime::is_enabled::<C>() {
            probe.component.set_scope(self.0);
        }
    }
}

/// Links each component to a node of its thread-local call graph.
pub struct Push {
    hash: u64,
    scope: Scope,
}

impl Push {
    pub fn new(hash: u64, scope: Scope) -> Self {
        Self { hash, scope }
    }
}

impl Operation for Push {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if probe.node.is_some() || !runtime::is_enabled::<C>() {
            return;
        }
        probe.node = storage::insert::<C>(self.hash, self.scope);
    }
}

/// Records each component into its node and moves the cursor back up.
///
/// Only the change since the previous pop is recorded, so a bundle that is
/// started and stopped many times adds each lap exactly once.
pub struct Pop;

impl Operation for Pop {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        let Some(node) = probe.node.take() else {
            return;
        };
        let mut delta = probe.component.clone();
        if let Some(previous) = probe.recorded.as_ref() {
            delta.subtract(previous);
        }
        record_node(node, &delta);
        storage::pop::<C>(node);
        probe.recorded = Some(probe.component.clone());
    }
}

fn record_node<C: Component>(node: NodeId, delta: &C) {
    storage::record::<C>(node, delta);
    if C::SECONDARY && settings::get().add_secondary {
        for (name, value) in delta.get_secondary() {
            storage::append_secondary::<C>(node, &name, &value);
        }
    }
}

/// Returns components to their default state and forgets storage links.
pub struct Reset;

impl Operation for Reset {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        probe.component = C::default();
        probe.running = false;
        probe.laps = 0;
        probe.node = None;
        probe.recorded = None;
        probe.derived = false;
    }
}

pub struct Divide(pub u64);

impl Operation for Divide {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if self.0 > 0 {
            probe.component.divide(self.0);
            probe.laps /= self.0;
        }
    }
}

/// Applies `op` to the component of type `T` only.
pub struct ForType<T, O> {
    op: O,
    _marker: PhantomData<fn(&T)>,
}

impl<T, O> ForType<T, O> {
    pub fn new(op: O) -> Self {
        Self {
            op,
            _marker: PhantomData,
        }
    }
}

impl<T: Component, O: Operation> Operation for ForType<T, O> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if TypeId::of::<C>() == TypeId::of::<T>() {
            self.op.apply(probe);
        }
    }
}

/// Runs a closure on the component of type `T`, if the bundle holds one.
pub struct WithComponent<T, F> {
    f: Option<F>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T, F> WithComponent<T, F> {
    pub fn new(f: F) -> Self {
        Self {
            f: Some(f),
            _marker: PhantomData,
        }
    }

    pub fn was_applied(&self) -> bool {
        self.f.is_none()
    }
}

impl<T: Component, F: FnOnce(&mut T)> Operation for WithComponent<T, F> {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        if let Some(target) = (&mut probe.component as &mut dyn Any).downcast_mut::<T>() {
            if let Some(f) = self.f.take() {
                f(target);
            }
        }
    }
}

/// Clones the component of type `T`, if the bundle holds one.
pub struct FindComponent<T> {
    pub found: Option<T>,
}

impl<T> Default for FindComponent<T> {
    fn default() -> Self {
        Self { found: None }
    }
}

impl<T: Component> Inspect for FindComponent<T> {
    fn inspect<C: Component>(&mut self, probe: &Probe<C>) {
        if self.found.is_none() {
            if let Some(component) = (&probe.component as &dyn Any).downcast_ref::<T>() {
                self.found = Some(component.clone());
            }
        }
    }
}

/// Renders each component for `Display` implementations of bundles.
#[derive(Default)]
pub struct Describe {
    pub parts: Vec<String>,
}

impl Inspect for Describe {
    fn inspect<C: Component>(&mut self, probe: &Probe<C>) {
        if runtime::is_enabled::<C>() {
            self.parts.push(probe.component.display());
        }
    }
}

/// Counts the components a bundle currently holds.
#[derive(Default)]
pub struct Count(pub usize);

impl Inspect for Count {
    fn inspect<C: Component>(&mut self, _probe: &Probe<C>) {
        self.0 += 1;
    }
}
