use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::storage::NodeId;

/// Where a bundle inserts its node in the per-thread call graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Child of the current node, reused when the same key is seen again.
    #[default]
    Tree,
    /// Child of the root regardless of the current call stack.
    Flat,
    /// Child of the current node, always a new entry.
    Timeline,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Tree => write!(f, "tree"),
            Scope::Flat => write!(f, "flat"),
            Scope::Timeline => write!(f, "timeline"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditKind {
    Entry,
    Exit,
}

/// Payload handed to [`Component::audit`].
#[derive(Clone, Copy, Debug)]
pub struct AuditEvent<'a> {
    pub kind: AuditKind,
    pub message: &'a str,
}

impl<'a> AuditEvent<'a> {
    pub fn entry(message: &'a str) -> Self {
        Self {
            kind: AuditKind::Entry,
            message,
        }
    }

    pub fn exit(message: &'a str) -> Self {
        Self {
            kind: AuditKind::Exit,
            message,
        }
    }
}

/// A measurable probe.
///
/// Every operation has a no-op default, so a component only implements the
/// verbs it cares about. Bundles call each verb on every component they hold
/// and the compiler drops the calls that resolve to the empty default.
///
/// # Examples
///
/// ```rust
/// use probekit::{Component, ComponentTuple, Bundle};
///
/// #[derive(Clone, Default)]
/// struct Ticks(u64);
///
/// impl Component for Ticks {
///     type Value = u64;
///     const LABEL: &'static str = "ticks";
///
///     fn start(&mut self) {
///         self.0 += 1;
///     }
///
///     fn get(&self) -> u64 {
///         self.0
///     }
///
///     fn accumulate(&mut self, rhs: &Self) {
///         self.0 += rhs.0;
///     }
///
///     fn subtract(&mut self, rhs: &Self) {
///         self.0 = self.0.saturating_sub(rhs.0);
///     }
/// }
///
/// let mut bundle = ComponentTuple::<(Ticks,)>::new("example");
/// bundle.start();
/// bundle.stop();
/// assert_eq!(bundle.get().0, 1);
/// ```
pub trait Component: Clone + Default + Send + 'static {
    type Value: Clone + fmt::Debug + Serialize;

    /// Short identifier, used for report headers and [`initialize_by_name`](crate::ComponentList::initialize_by_name).
    const LABEL: &'static str;
    const DESCRIPTION: &'static str = "";
    const UNITS: &'static str = "";

    /// Negative values start before standard components, positive after.
    const START_PRIORITY: i32 = 0;
    /// Negative values stop before standard components, positive after.
    const STOP_PRIORITY: i32 = 0;

    /// The component reads other components of its bundle in `assemble`/`derive`.
    const DERIVES: bool = false;
    /// The component reports extra named entries through `get_secondary`.
    const SECONDARY: bool = false;

    fn start(&mut self) {}
    fn stop(&mut self) {}
    fn mark(&mut self) {}
    fn mark_begin(&mut self) {}
    fn mark_end(&mut self) {}
    fn audit(&mut self, _event: &AuditEvent<'_>) {}
    fn store(&mut self, _value: f64) {}
    fn measure(&mut self) {}
    fn sample(&mut self) {}

    /// Inspect the rest of the bundle once. Return `true` when the component
    /// will take its measurement from peers instead of measuring itself.
    fn assemble(&mut self, _peers: &Peers) -> bool {
        false
    }

    /// Pull measurements from peers after they stopped.
    fn derive(&mut self, _peers: &Peers) -> bool {
        false
    }

    fn set_prefix(&mut self, _prefix: &str) {}
    fn set_prefix_hash(&mut self, _hash: u64) {}
    fn set_scope(&mut self, _scope: Scope) {}

    fn get_secondary(&self) -> Vec<(String, Self)> {
        Vec::new()
    }

    fn add_secondary(&mut self, _name: &str, _value: Self) {}

    fn get(&self) -> Self::Value;

    fn accumulate(&mut self, rhs: &Self);
    fn subtract(&mut self, rhs: &Self);

    fn divide(&mut self, _denominator: u64) {}

    /// Scalar fed into the running statistics of the storage node.
    fn statistic(&self) -> Option<f64> {
        None
    }

    /// Renders a statistic produced by [`Component::statistic`].
    fn format_statistic(value: f64) -> String {
        let precision = crate::settings::get().precision;
        if Self::UNITS.is_empty() {
            format!("{:.*}", precision, value)
        } else {
            format!("{:.*} {}", precision, value, Self::UNITS)
        }
    }

    fn display(&self) -> String {
        if Self::UNITS.is_empty() {
            format!("{:?} {}", self.get(), Self::LABEL)
        } else {
            format!("{:?} {} {}", self.get(), Self::UNITS, Self::LABEL)
        }
    }
}

/// A component together with its lifecycle state inside a bundle.
#[derive(Clone, Default)]
pub struct Probe<C> {
    pub(crate) component: C,
    pub(crate) running: bool,
    pub(crate) laps: u64,
    pub(crate) node: Option<NodeId>,
    pub(crate) recorded: Option<C>,
    pub(crate) derived: bool,
}

impl<C: Component> Probe<C> {
    pub fn new(component: C) -> Self {
        Self {
            component,
            running: false,
            laps: 0,
            node: None,
            recorded: None,
            derived: false,
        }
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn laps(&self) -> u64 {
        self.laps
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// `true` when `assemble` reported that the measurement comes from peers.
    pub fn is_derived(&self) -> bool {
        self.derived
    }

    pub(crate) fn accumulate(&mut self, rhs: &Self) {
        self.component.accumulate(&rhs.component);
        self.laps += rhs.laps;
    }

    pub(crate) fn subtract(&mut self, rhs: &Self) {
        self.component.subtract(&rhs.component);
        self.laps = self.laps.saturating_sub(rhs.laps);
    }
}

impl<C> Deref for Probe<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.component
    }
}

impl<C> DerefMut for Probe<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.component
    }
}

impl<C: Component> fmt::Debug for Probe<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("label", &C::LABEL)
            .field("value", &self.component.get())
            .field("running", &self.running)
            .field("laps", &self.laps)
            .finish()
    }
}

/// Read-only snapshot of the components of a bundle, looked up by type.
#[derive(Default)]
pub struct Peers {
    entries: Vec<(TypeId, Box<dyn Any>)>,
}

impl Peers {
    pub(crate) fn insert<C: Component>(&mut self, component: &C) {
        self.entries
            .push((TypeId::of::<C>(), Box::new(component.clone())));
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.entries
            .iter()
            .find(|(id, _)| *id == TypeId::of::<C>())
            .and_then(|(_, value)| value.downcast_ref::<C>())
    }

    pub fn contains<C: Component>(&self) -> bool {
        self.get::<C>().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
