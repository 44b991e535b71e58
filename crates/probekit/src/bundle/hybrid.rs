use std::any::TypeId;
use std::fmt;

use super::{bundle_ops, init, Bundle, BundleCore};
use crate::operation::{ForType, Inspect, Operation, Pass, Pop, Stop};
use crate::{Component, ComponentSet};

/// Always-present components `T` plus optional components `L`, sharing one
/// key and lifecycle.
pub struct ComponentHybrid<T: ComponentSet, L: ComponentSet> {
    core: BundleCore,
    probes: T::Probes,
    slots: L::Optional,
}

impl<T: ComponentSet, L: ComponentSet> ComponentHybrid<T, L> {
    /// Enables the optional component of type `C`.
    pub fn init<C: Component>(&mut self) -> bool {
        if !L::init_slot(&mut self.slots, TypeId::of::<C>()) {
            return false;
        }
        self.configure();
        true
    }

    /// Disables the optional component of type `C`, closing its storage node.
    pub fn disable<C: Component>(&mut self) -> bool {
        if L::is_slot_active(&self.slots, TypeId::of::<C>()) {
            if self.core.is_running() {
                for pass in Pass::ALL {
                    L::apply_optional(&mut self.slots, &mut ForType::<C, _>::new(Stop::new(pass)));
                }
            }
            if self.core.is_pushed() {
                L::apply_optional(&mut self.slots, &mut ForType::<C, _>::new(Pop));
            }
        }
        L::disable_slot(&mut self.slots, TypeId::of::<C>())
    }

    /// Registers `initializer` to run on every `ComponentHybrid<T, L>` built with
    /// [`Bundle::new`], replacing an earlier one.
    pub fn set_default_initializer<F>(initializer: F)
    where
        F: Fn(&mut Self) + Send + Sync + 'static,
    {
        init::register::<Self, F>(initializer);
    }

    pub fn clear_default_initializer() -> bool {
        init::unregister::<Self>()
    }

    pub fn is_active<C: Component>(&self) -> bool {
        L::is_slot_active(&self.slots, TypeId::of::<C>())
    }

    pub fn initialize_by_name<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let mut matched = 0;
        for name in names {
            let name = name.as_ref().trim();
            if L::init_slot_by_label(&mut self.slots, name) {
                matched += 1;
            } else {
                tracing::warn!(name, available = ?L::labels(), "unknown component name");
            }
        }
        if matched > 0 {
            self.configure();
        }
        matched
    }

    pub fn tuple_values(&self) -> T::Values {
        T::values(&self.probes)
    }

    pub fn list_values(&self) -> L::OptionalValues {
        L::optional_values(&self.slots)
    }
}

impl<T: ComponentSet, L: ComponentSet> Clone for ComponentHybrid<T, L> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            probes: self.probes.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<T: ComponentSet, L: ComponentSet> Default for ComponentHybrid<T, L> {
    fn default() -> Self {
        Self::from_core(BundleCore::default())
    }
}

impl<T: ComponentSet, L: ComponentSet> fmt::Debug for ComponentHybrid<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHybrid")
            .field("core", &self.core)
            .field("tuple", &self.tuple_values())
            .field("list", &self.list_values())
            .finish()
    }
}

impl<T: ComponentSet, L: ComponentSet> Bundle for ComponentHybrid<T, L> {
    type Value = (T::Values, L::OptionalValues);
    type Labeled = (T::Labeled, L::OptionalLabeled);

    const DERIVES: bool = T::DERIVES || L::DERIVES;

    fn from_core(core: BundleCore) -> Self {
        Self {
            core,
            probes: T::Probes::default(),
            slots: L::Optional::default(),
        }
    }

    fn initialize(&mut self) {
        init::apply(self);
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
        L::apply_optional(&mut self.slots, op);
    }

    #[inline]
    fn inspect<I: Inspect>(&self, visitor: &mut I) {
        T::inspect(&self.probes, visitor);
        L::inspect_optional(&self.slots, visitor);
    }

    fn get(&self) -> Self::Value {
        (self.tuple_values(), self.list_values())
    }

    fn get_labeled(&self) -> Self::Labeled {
        (T::labeled(&self.probes), L::optional_labeled(&self.slots))
    }

    fn accumulate_components(&mut self, rhs: &Self) {
        T::accumulate(&mut self.probes, &rhs.probes);
        L::accumulate_optional(&mut self.slots, &rhs.slots);
    }

    fn subtract_components(&mut self, rhs: &Self) {
        T::subtract(&mut self.probes, &rhs.probes);
        L::subtract_optional(&mut self.slots, &rhs.slots);
    }
}

bundle_ops!([T: ComponentSet, L: ComponentSet] ComponentHybrid<T, L>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Counter, TripCount, WallClock};

    type Hybrid = ComponentHybrid<(TripCount,), (WallClock, Counter)>;

    #[test]
    fn tuple_part_always_runs() {
        let mut hybrid = Hybrid::new("hybrid-tuple");
        hybrid.set_store(false);
        hybrid.start();
        hybrid.stop();
        let ((trips,), (wall, counter)) = hybrid.get();
        assert_eq!(trips, 1);
        assert!(wall.is_none());
        assert!(counter.is_none());
        assert_eq!(hybrid.count(), 1);
    }

    #[test]
    fn list_part_is_optional() {
        let mut hybrid = Hybrid::new("hybrid-list");
        hybrid.set_store(false);
        assert!(hybrid.init::<Counter>());
        assert!(!hybrid.init::<TripCount>());
        hybrid.record(4.0);
        assert_eq!(hybrid.count(), 2);
        assert_eq!(hybrid.get().1 .1.map(|value| value.sum), Some(4.0));
        assert!(hybrid.disable::<Counter>());
        assert_eq!(hybrid.count(), 1);
    }

    #[test]
    fn labeled_values_carry_labels() {
        let mut hybrid = Hybrid::new("hybrid-labels");
        hybrid.initialize_by_name(&["wall_clock"]);
        let ((trip,), (wall, counter)) = hybrid.get_labeled();
        assert_eq!(trip.0, "trip_count");
        assert_eq!(wall.map(|(label, _)| label), Some("wall_clock"));
        assert!(counter.is_none());
    }
}
