//! Per-component runtime enablement.
//!
//! Every operation first checks whether its component type is enabled, so a
//! disabled type turns into a no-op in every bundle that contains it.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, RwLock};

use crate::Component;

static ANY_DISABLED: AtomicBool = AtomicBool::new(false);
static DISABLED: LazyLock<RwLock<HashSet<TypeId>>> = LazyLock::new(|| RwLock::new(HashSet::new()));

#[inline]
pub fn is_enabled<C: Component>() -> bool {
    if !ANY_DISABLED.load(Ordering::Acquire) {
        return true;
    }
    match DISABLED.read() {
        Ok(set) => !set.contains(&TypeId::of::<C>()),
        Err(poisoned) => !poisoned.into_inner().contains(&TypeId::of::<C>()),
    }
}

/// Enables or disables all operations on component type `C`.
///
/// Returns the previous state.
pub fn set_enabled<C: Component>(enabled: bool) -> bool {
    let mut set = DISABLED.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    let previous = !set.contains(&TypeId::of::<C>());
    if enabled {
        set.remove(&TypeId::of::<C>());
    } else {
        set.insert(TypeId::of::<C>());
    }
    ANY_DISABLED.store(!set.is_empty(), Ordering::Release);
    tracing::debug!(component = C::LABEL, enabled, "component runtime state changed");
    previous
}
