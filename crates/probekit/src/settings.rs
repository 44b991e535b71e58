//! Process-wide configuration.
//!
//! Settings are swapped atomically so hot paths only pay for an `Arc` load.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::Scope;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch. Bundles created while disabled never start or store.
    pub enabled: bool,
    /// Append secondary entries reported by components below their node.
    pub add_secondary: bool,
    /// Scope guards print their bundle when dropped.
    pub destructor_report: bool,
    /// Default insertion scope for new bundles.
    pub scope: Scope,
    /// Nodes deeper than this are not recorded.
    pub max_depth: usize,
    /// Decimal places used by reporters.
    pub precision: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            add_secondary: true,
            destructor_report: false,
            scope: Scope::Tree,
            max_depth: 64,
            precision: 3,
        }
    }
}

static SETTINGS: OnceLock<ArcSwap<Settings>> = OnceLock::new();

fn cell() -> &'static ArcSwap<Settings> {
    SETTINGS.get_or_init(|| ArcSwap::from_pointee(Settings::default()))
}

#[inline]
pub fn get() -> Arc<Settings> {
    cell().load_full()
}

pub fn set(settings: Settings) {
    cell().store(Arc::new(settings));
}

/// Applies `f` to a copy of the current settings and publishes the result.
pub fn update(f: impl Fn(&mut Settings)) {
    cell().rcu(|current| {
        let mut next = Settings::clone(current);
        f(&mut next);
        next
    });
}
