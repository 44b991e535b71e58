use std::fmt;

use super::{bundle_ops, Bundle, BundleCore};
use crate::operation::{Inspect, Operation};
use crate::ComponentSet;

/// A bundle in which every component of `T` is always present.
///
/// ```rust
/// use probekit::components::{TripCount, WallClock};
/// use probekit::{Bundle, ComponentTuple};
///
/// let mut bundle = ComponentTuple::<(WallClock, TripCount)>::new("tuple-doc");
/// bundle.start();
/// bundle.stop();
/// let (_wall, trips) = bundle.get();
/// assert_eq!(trips, 1);
/// ```
pub struct ComponentTuple<T: ComponentSet> {
    core: BundleCore,
    probes: T::Probes,
}

impl<T: ComponentSet> ComponentTuple<T> {
    pub fn probes(&self) -> &T::Probes {
        &self.probes
    }

    pub fn probes_mut(&mut self) -> &mut T::Probes {
        &mut self.probes
    }

    pub fn labels() -> Vec<&'static str> {
        T::labels()
    }
}

impl<T: ComponentSet> Clone for ComponentTuple<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            probes: self.probes.clone(),
        }
    }
}

impl<T: ComponentSet> Default for ComponentTuple<T> {
    fn default() -> Self {
        Self {
            core: BundleCore::default(),
            probes: T::Probes::default(),
        }
    }
}

impl<T: ComponentSet> fmt::Debug for ComponentTuple<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTuple")
            .field("core", &self.core)
            .field("values", &T::values(&self.probes))
            .finish()
    }
}

impl<T: ComponentSet> Bundle for ComponentTuple<T> {
    type Value = T::Values;
    type Labeled = T::Labeled;

    const DERIVES: bool = T::DERIVES;

    fn from_core(core: BundleCore) -> Self {
        Self {
            core,
            probes: T::Probes::default(),
        }
    }

    fn core(&self) -> &BundleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BundleCore {
        &mut self.core
    }

    #[inline]
    fn invoke<O: Operation>(&mut self, op: &mut O) {
        T::apply(&mut self.probes, op);
    }

    #[inline]
    fn inspect<I: Inspect>(&self, visitor: &mut I) {
        T::inspect(&self.probes, visitor);
    }

    fn get(&self) -> T::Values {
        T::values(&self.probes)
    }

    fn get_labeled(&self) -> T::Labeled {
        T::labeled(&self.probes)
    }

    fn accumulate_components(&mut self, rhs: &Self) {
        T::accumulate(&mut self.probes, &rhs.probes);
    }

    fn subtract_components(&mut self, rhs: &Self) {
        T::subtract(&mut self.probes, &rhs.probes);
    }
}

bundle_ops!([T: ComponentSet] ComponentTuple<T>);
