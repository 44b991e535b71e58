use std::any::TypeId;
use std::fmt;

use super::{bundle_ops, close_component, init, Bundle, BundleCore};
use crate::operation::{Inspect, Operation};
use crate::{Component, ComponentSet};

/// A bundle in which each component of `T` is optional and heap-allocated.
///
/// Components are off until enabled with [`init`](ComponentList::init) or
/// [`initialize_by_name`](ComponentList::initialize_by_name); every verb
/// skips the ones that are off.
pub struct ComponentList<T: ComponentSet> {
    core: BundleCore,
    slots: T::Optional,
}

impl<T: ComponentSet> ComponentList<T> {
    /// Bundle with every component of `T` enabled.
    pub fn new_all(key: &str) -> Self {
        let mut list = Self::new(key);
        for label in T::labels() {
            T::init_slot_by_label(&mut list.slots, label);
        }
        list.configure();
        list
    }

    /// Enables the component of type `C`. Returns `false` when `T` has no such member.
    pub fn init<C: Component>(&mut self) -> bool {
        if !T::init_slot(&mut self.slots, TypeId::of::<C>()) {
            return false;
        }
        self.configure();
        true
    }

    /// Disables the component of type `C`, dropping its data. A running
    /// component is stopped and its open storage node closed first.
    pub fn disable<C: Component>(&mut self) -> bool {
        if T::is_slot_active(&self.slots, TypeId::of::<C>()) {
            close_component::<Self, C>(self);
        }
        T::disable_slot(&mut self.slots, TypeId::of::<C>())
    }

    /// Registers `initializer` to run on every `ComponentList<T>` built with
    /// [`Bundle::new`], replacing an earlier one. It must not build a
    /// `ComponentList<T>` itself.
    ///
    /// ```rust
    /// use probekit::components::{TripCount, WallClock};
    /// use probekit::{Bundle, ComponentList};
    ///
    /// type Timers = ComponentList<(WallClock, TripCount)>;
    /// Timers::set_default_initializer(|list| {
    ///     list.init::<WallClock>();
    /// });
    /// assert_eq!(Timers::new("init-doc").count(), 1);
    /// Timers::clear_default_initializer();
    /// ```
    pub fn set_default_initializer<F>(initializer: F)
    where
        F: Fn(&mut Self) + Send + Sync + 'static,
    {
        init::register::<Self, F>(initializer);
    }

    /// Removes the default initializer. Returns `false` when none was set.
    pub fn clear_default_initializer() -> bool {
        init::unregister::<Self>()
    }

    pub fn is_active<C: Component>(&self) -> bool {
        T::is_slot_active(&self.slots, TypeId::of::<C>())
    }

    /// Enables components by their `LABEL`, ignoring case. Unknown names are
    /// logged and skipped. Returns how many names matched.
    pub fn initialize_by_name<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let mut matched = 0;
        for name in names {
            let name = name.as_ref().trim();
            if T::init_slot_by_label(&mut self.slots, name) {
                matched += 1;
            } else {
                tracing::warn!(name, available = ?T::labels(), "unknown component name");
            }
        }
        if matched > 0 {
            self.configure();
        }
        matched
    }

    pub fn slots(&self) -> &T::Optional {
        &self.slots
    }

    pub fn labels() -> Vec<&'static str> {
        T::labels()
    }
}

impl<T: ComponentSet> Clone for ComponentList<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<T: ComponentSet> Default for ComponentList<T> {
    fn default() -> Self {
        Self {
            core: BundleCore::default(),
            slots: T::Optional::default(),
        }
    }
}

impl<T: ComponentSet> fmt::Debug for ComponentList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentList")
            .field("core", &self.core)
            .field("values", &T::optional_values(&self.slots))
            .finish()
    }
}

impl<T: ComponentSet> Bundle for ComponentList<T> {
    type Value = T::OptionalValues;
    type Labeled = T::OptionalLabeled;

    const DERIVES: bool = T::DERIVES;

    fn from_core(core: BundleCore) -> Self {
        Self {
            core,
            slots: T::Optional::default(),
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
        T::apply_optional(&mut self.slots, op);
    }

    #[inline]
    fn inspect<I: Inspect>(&self, visitor: &mut I) {
        T::inspect_optional(&self.slots, visitor);
    }

    fn get(&self) -> T::OptionalValues {
        T::optional_values(&self.slots)
    }

    fn get_labeled(&self) -> T::OptionalLabeled {
        T::optional_labeled(&self.slots)
    }

    fn accumulate_components(&mut self, rhs: &Self) {
        T::accumulate_optional(&mut self.slots, &rhs.slots);
    }

    fn subtract_components(&mut self, rhs: &Self) {
        T::subtract_optional(&mut self.slots, &rhs.slots);
    }
}

bundle_ops!([T: ComponentSet] ComponentList<T>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Counter, TripCount, WallClock};

    type List = ComponentList<(WallClock, TripCount, Counter)>;

    #[test]
    fn empty_list_does_nothing() {
        let mut list = List::new("list-empty");
        list.set_store(false);
        list.start();
        list.stop();
        assert_eq!(list.count(), 0);
        assert_eq!(list.get(), (None, None, None));
    }

    #[test]
    fn init_and_disable() {
        let mut list = List::new("list-init");
        list.set_store(false);
        assert!(list.init::<TripCount>());
        list.start();
        list.stop();
        assert_eq!(list.count(), 1);
        assert_eq!(list.get().1, Some(1));
        assert!(list.disable::<TripCount>());
        assert!(!list.is_active::<TripCount>());
        assert_eq!(list.count(), 0);
    }

    #[test]
    fn init_unknown_type_is_rejected() {
        let mut list = ComponentList::<(TripCount,)>::new("list-unknown");
        assert!(!list.init::<WallClock>());
        assert!(!list.disable::<WallClock>());
    }

    #[test]
    fn initialize_by_name_ignores_case() {
        let mut list = List::new("list-names");
        let matched = list.initialize_by_name(&["TRIP_COUNT", " counter", "missing"]);
        assert_eq!(matched, 2);
        assert!(list.is_active::<TripCount>());
        assert!(list.is_active::<Counter>());
        assert!(!list.is_active::<WallClock>());
        assert_eq!(list.get_component::<Counter>().unwrap().prefix(), "list-names");
    }

    #[test]
    fn accumulate_fills_missing_slots() {
        let mut lhs = List::new("list-merge");
        lhs.set_store(false);
        let mut rhs = lhs.clone();
        rhs.init::<TripCount>();
        rhs.start();
        rhs.stop();
        lhs += &rhs;
        assert_eq!(lhs.get().1, Some(1));
        assert_eq!(lhs.laps(), 1);
    }

    #[test]
    fn new_all_enables_everything() {
        let list = List::new_all("list-all");
        assert_eq!(list.count(), 3);
    }
}
