//! Traversal over heterogeneous tuples of components.
//!
//! `ComponentSet` is implemented for tuples of 1 to 12 components. The same
//! tuple type describes both the always-present probes of a
//! [`ComponentTuple`](crate::ComponentTuple) and the optional, heap-held
//! probes of a [`ComponentList`](crate::ComponentList).

use std::any::TypeId;
use std::fmt::Debug;

use crate::component::{Component, Probe};
use crate::operation::{Inspect, Operation};

pub trait ComponentSet: 'static {
    /// `(Probe<A>, Probe<B>, ..)`
    type Probes: Clone + Default + Send;
    /// `(Option<Box<Probe<A>>>, Option<Box<Probe<B>>>, ..)`
    type Optional: Clone + Default + Send;
    /// `(A::Value, B::Value, ..)`
    type Values: Clone + Debug;
    /// `(Option<A::Value>, Option<B::Value>, ..)`
    type OptionalValues: Clone + Debug;
    /// `((&str, A::Value), (&str, B::Value), ..)`
    type Labeled: Clone + Debug;
    /// `(Option<(&str, A::Value)>, ..)`
    type OptionalLabeled: Clone + Debug;

    const SIZE: usize;
    /// Some member reads its peers in `assemble`/`derive`.
    const DERIVES: bool;

    fn labels() -> Vec<&'static str>;

    fn apply<O: Operation>(probes: &mut Self::Probes, op: &mut O);
    fn inspect<I: Inspect>(probes: &Self::Probes, visitor: &mut I);
    fn values(probes: &Self::Probes) -> Self::Values;
    fn labeled(probes: &Self::Probes) -> Self::Labeled;
    fn accumulate(lhs: &mut Self::Probes, rhs: &Self::Probes);
    fn subtract(lhs: &mut Self::Probes, rhs: &Self::Probes);

    fn apply_optional<O: Operation>(slots: &mut Self::Optional, op: &mut O);
    fn inspect_optional<I: Inspect>(slots: &Self::Optional, visitor: &mut I);
    fn optional_values(slots: &Self::Optional) -> Self::OptionalValues;
    fn optional_labeled(slots: &Self::Optional) -> Self::OptionalLabeled;
    fn accumulate_optional(lhs: &mut Self::Optional, rhs: &Self::Optional);
    fn subtract_optional(lhs: &mut Self::Optional, rhs: &Self::Optional);

    /// Allocates the slot for `id`. Returns `false` when the set has no such member.
    fn init_slot(slots: &mut Self::Optional, id: TypeId) -> bool;
    /// Allocates the slot whose component `LABEL` equals `label`.
    fn init_slot_by_label(slots: &mut Self::Optional, label: &str) -> bool;
    /// Drops the slot for `id`. Returns `false` when the set has no such member.
    fn disable_slot(slots: &mut Self::Optional, id: TypeId) -> bool;
    fn is_slot_active(slots: &Self::Optional, id: TypeId) -> bool;
}

fn accumulate_slot<C: Component>(lhs: &mut Option<Box<Probe<C>>>, rhs: &Option<Box<Probe<C>>>) {
    match (lhs.as_deref_mut(), rhs.as_deref()) {
        (Some(lhs), Some(rhs)) => lhs.accumulate(rhs),
        (None, Some(rhs)) => *lhs = Some(Box::new(rhs.clone())),
        _ => {}
    }
}

fn subtract_slot<C: Component>(lhs: &mut Option<Box<Probe<C>>>, rhs: &Option<Box<Probe<C>>>) {
    if let (Some(lhs), Some(rhs)) = (lhs.as_deref_mut(), rhs.as_deref()) {
        lhs.subtract(rhs);
    }
}

macro_rules! impl_component_set {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Probes = ($(Probe<$name>,)+);
            type Optional = ($(Option<Box<Probe<$name>>>,)+);
            type Values = ($($name::Value,)+);
            type OptionalValues = ($(Option<$name::Value>,)+);
            type Labeled = ($((&'static str, $name::Value),)+);
            type OptionalLabeled = ($(Option<(&'static str, $name::Value)>,)+);

            const SIZE: usize = [$(stringify!($name)),+].len();
            const DERIVES: bool = false $(|| $name::DERIVES)+;

            fn labels() -> Vec<&'static str> {
                vec![$($name::LABEL),+]
            }

            #[inline]
            fn apply<O: Operation>(probes: &mut Self::Probes, op: &mut O) {
                $(op.apply(&mut probes.$idx);)+
            }

            #[inline]
            fn inspect<I: Inspect>(probes: &Self::Probes, visitor: &mut I) {
                $(visitor.inspect(&probes.$idx);)+
            }

            fn values(probes: &Self::Probes) -> Self::Values {
                ($(probes.$idx.component.get(),)+)
            }

            fn labeled(probes: &Self::Probes) -> Self::Labeled {
                ($(($name::LABEL, probes.$idx.component.get()),)+)
            }

            fn accumulate(lhs: &mut Self::Probes, rhs: &Self::Probes) {
                $(lhs.$idx.accumulate(&rhs.$idx);)+
            }

            fn subtract(lhs: &mut Self::Probes, rhs: &Self::Probes) {
                $(lhs.$idx.subtract(&rhs.$idx);)+
            }

            #[inline]
            fn apply_optional<O: Operation>(slots: &mut Self::Optional, op: &mut O) {
                $(if let Some(probe) = slots.$idx.as_deref_mut() {
                    op.apply(probe);
                })+
            }

            #[inline]
            fn inspect_optional<I: Inspect>(slots: &Self::Optional, visitor: &mut I) {
                $(if let Some(probe) = slots.$idx.as_deref() {
                    visitor.inspect(probe);
                })+
            }

            fn optional_values(slots: &Self::Optional) -> Self::OptionalValues {
                ($(slots.$idx.as_deref().map(|probe| probe.component.get()),)+)
            }

            fn optional_labeled(slots: &Self::Optional) -> Self::OptionalLabeled {
                ($(slots.$idx.as_deref().map(|probe| ($name::LABEL, probe.component.get())),)+)
            }

            fn accumulate_optional(lhs: &mut Self::Optional, rhs: &Self::Optional) {
                $(accumulate_slot(&mut lhs.$idx, &rhs.$idx);)+
            }

            fn subtract_optional(lhs: &mut Self::Optional, rhs: &Self::Optional) {
                $(subtract_slot(&mut lhs.$idx, &rhs.$idx);)+
            }

            fn init_slot(slots: &mut Self::Optional, id: TypeId) -> bool {
                $(if id == TypeId::of::<$name>() {
                    if slots.$idx.is_none() {
                        slots.$idx = Some(Box::default());
                    }
                    return true;
                })+
                false
            }

            fn init_slot_by_label(slots: &mut Self::Optional, label: &str) -> bool {
                $(if label.eq_ignore_ascii_case($name::LABEL) {
                    if slots.$idx.is_none() {
                        slots.$idx = Some(Box::default());
                    }
                    return true;
                })+
                false
            }

            fn disable_slot(slots: &mut Self::Optional, id: TypeId) -> bool {
                $(if id == TypeId::of::<$name>() {
                    slots.$idx = None;
                    return true;
                })+
                false
            }

            fn is_slot_active(slots: &Self::Optional, id: TypeId) -> bool {
                $(if id == TypeId::of::<$name>() {
                    return slots.$idx.is_some();
                })+
                false
            }
        }
    };
}

impl_component_set!(T0: 0);
impl_component_set!(T0: 0, T1: 1);
impl_component_set!(T0: 0, T1: 1, T2: 2);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10);
impl_component_set!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10, T11: 11);
