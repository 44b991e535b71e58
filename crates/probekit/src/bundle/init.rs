//! Per-type default initializers for bundles with optional components.
//!
//! A registered initializer runs on every bundle of its type built through
//! [`Bundle::new`] or [`Bundle::with_hash`], before the bundle is configured.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, RwLock};

use super::Bundle;

type Initializer = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

static ANY_REGISTERED: AtomicBool = AtomicBool::new(false);
static INITIALIZERS: LazyLock<RwLock<HashMap<TypeId, Initializer>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub(crate) fn register<B, F>(init: F)
where
    B: Bundle,
    F: Fn(&mut B) + Send + Sync + 'static,
{
    let erased: Initializer = Arc::new(move |bundle: &mut dyn Any| {
        if let Some(bundle) = bundle.downcast_mut::<B>() {
            init(bundle);
        }
    });
    let mut map = INITIALIZERS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    map.insert(TypeId::of::<B>(), erased);
    ANY_REGISTERED.store(true, Ordering::Release);
    tracing::debug!(bundle = std::any::type_name::<B>(), "default initializer registered");
}

/// Returns `true` when an initializer was registered for `B`.
pub(crate) fn unregister<B: Bundle>() -> bool {
    let mut map = INITIALIZERS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let removed = map.remove(&TypeId::of::<B>()).is_some();
    ANY_REGISTERED.store(!map.is_empty(), Ordering::Release);
    removed
}

/// Runs the initializer registered for `B`, if any.
pub(crate) fn apply<B: Bundle>(bundle: &mut B) -> bool {
    if !ANY_REGISTERED.load(Ordering::Acquire) {
        return false;
    }
    // the lock is released before the call so an initializer may build bundles of other types
    let init = {
        let map = INITIALIZERS
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(&TypeId::of::<B>()).cloned()
    };
    match init {
        Some(init) => {
            init(bundle);
            true
        }
        None => false,
    }
}
