//! Scope guards that start a bundle on construction and stop it on drop.

use std::ops::{Deref, DerefMut};

use crate::storage::add_hash_id;
use crate::{settings, Bundle, BundleCore, ComponentHybrid, ComponentList, ComponentTuple, Scope};

/// Construction options for an [`AutoBundle`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoOptions {
    /// Do not start on construction.
    pub explicit_start: bool,
    /// Do not stop on drop.
    pub explicit_stop: bool,
    /// Print the bundle when the guard drops. Also on when
    /// [`Settings::destructor_report`](crate::Settings::destructor_report) is set.
    pub report_at_exit: bool,
    pub scope: Option<Scope>,
    pub store: Option<bool>,
}

impl AutoOptions {
    pub fn explicit_start(mut self) -> Self {
        self.explicit_start = true;
        self
    }

    pub fn explicit_stop(mut self) -> Self {
        self.explicit_stop = true;
        self
    }

    pub fn report_at_exit(mut self) -> Self {
        self.report_at_exit = true;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn store(mut self, store: bool) -> Self {
        self.store = Some(store);
        self
    }
}

/// Owns a bundle for the duration of a scope.
///
/// ```rust
/// use probekit::components::TripCount;
/// use probekit::{AutoTuple, Bundle, ComponentTuple};
///
/// let mut total = ComponentTuple::<(TripCount,)>::new("auto-doc");
/// for _ in 0..3 {
///     let _guard = AutoTuple::from_reference(&mut total);
/// }
/// assert_eq!(total.get().0, 3);
/// ```
pub struct AutoBundle<'a, B: Bundle> {
    bundle: B,
    enabled: bool,
    report_at_exit: bool,
    explicit_stop: bool,
    reference: Option<&'a mut B>,
}

pub type AutoTuple<'a, T> = AutoBundle<'a, ComponentTuple<T>>;
pub type AutoList<'a, T> = AutoBundle<'a, ComponentList<T>>;
pub type AutoHybrid<'a, T, L> = AutoBundle<'a, ComponentHybrid<T, L>>;

impl<'a, B: Bundle> AutoBundle<'a, B> {
    pub fn new(key: &str) -> Self {
        Self::with_options(key, AutoOptions::default())
    }

    pub fn with_options(key: &str, options: AutoOptions) -> Self {
        Self::from_bundle(B::new(key), options)
    }

    /// Builds the bundle with `init` instead of the default initializer of
    /// its type, then starts it.
    ///
    /// ```rust
    /// use probekit::components::{Counter, TripCount};
    /// use probekit::{AutoList, Bundle};
    ///
    /// let guard = AutoList::<(TripCount, Counter)>::with_initializer("init-guard", |list| {
    ///     list.init::<TripCount>();
    /// });
    /// assert_eq!(guard.count(), 1);
    /// ```
    pub fn with_initializer<F: FnOnce(&mut B)>(key: &str, init: F) -> Self {
        let mut bundle = B::from_core(BundleCore::new(add_hash_id(key)));
        init(&mut bundle);
        bundle.configure();
        Self::from_bundle(bundle, AutoOptions::default())
    }

    /// Wraps an existing bundle, typically one whose optional components were
    /// already initialised.
    pub fn from_bundle(mut bundle: B, options: AutoOptions) -> Self {
        let settings = settings::get();
        let enabled = settings.enabled;
        if let Some(scope) = options.scope {
            bundle.set_scope(scope);
        }
        if let Some(store) = options.store {
            bundle.set_store(store);
        }
        let mut guard = Self {
            bundle,
            enabled,
            report_at_exit: options.report_at_exit || settings.destructor_report,
            explicit_stop: options.explicit_stop,
            reference: None,
        };
        if enabled && !options.explicit_start {
            guard.bundle.start();
        }
        guard
    }

    /// Measures into a fresh copy of `reference` and adds the copy back on drop.
    pub fn from_reference(reference: &'a mut B) -> Self {
        let mut guard = Self::from_bundle(reference.clone_fresh(), AutoOptions::default());
        guard.reference = Some(reference);
        guard
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reports_at_exit(&self) -> bool {
        self.report_at_exit
    }

    pub fn set_report_at_exit(&mut self, report: bool) {
        self.report_at_exit = report;
    }

    pub fn start(&mut self) {
        if self.enabled {
            self.bundle.start();
        }
    }

    pub fn stop(&mut self) {
        if self.enabled {
            self.bundle.stop();
        }
    }

    pub fn bundle(&self) -> &B {
        &self.bundle
    }

    pub fn bundle_mut(&mut self) -> &mut B {
        &mut self.bundle
    }
}

impl<B: Bundle> Deref for AutoBundle<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.bundle
    }
}

impl<B: Bundle> DerefMut for AutoBundle<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.bundle
    }
}

impl<B: Bundle> Drop for AutoBundle<'_, B> {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        if !self.explicit_stop {
            self.bundle.stop();
        }
        if self.report_at_exit {
            println!("{}", self.bundle.describe());
        }
        if let Some(reference) = self.reference.as_deref_mut() {
            reference.accumulate(&self.bundle);
        }
    }
}

/// Path of the enclosing function, e.g. `my_crate::worker::run`.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.trim_end_matches("::{{closure}}")
    }};
}

/// Key of a scope guard: the enclosing function, or `function/suffix`.
#[macro_export]
#[doc(hidden)]
macro_rules! __scope_key {
    () => {
        ::std::string::String::from($crate::function_name!())
    };
    ($($arg:tt)+) => {
        ::std::format!("{}/{}", $crate::function_name!(), ::std::format_args!($($arg)+))
    };
}

/// Starts an [`AutoTuple`] keyed by the enclosing function and an optional
/// formatted suffix.
///
/// ```rust
/// use probekit::components::{TripCount, WallClock};
///
/// fn work(i: usize) {
///     let _guard = probekit::auto_tuple!((WallClock, TripCount), "iteration-{}", i % 2);
/// }
/// work(1);
/// ```
#[macro_export]
macro_rules! auto_tuple {
    ($types:ty) => {
        $crate::AutoTuple::<$types>::new(&$crate::__scope_key!())
    };
    ($types:ty, $($arg:tt)+) => {
        $crate::AutoTuple::<$types>::new(&$crate::__scope_key!($($arg)+))
    };
}

/// Like [`auto_tuple!`] for a [`ComponentList`]. Optional components are
/// enabled by their labels before the guard starts.
#[macro_export]
macro_rules! auto_list {
    ($types:ty, [$($name:expr),* $(,)?]) => {{
        let mut list = <$crate::ComponentList<$types> as $crate::Bundle>::new(&$crate::__scope_key!());
        let names: &[&str] = &[$($name),*];
        list.initialize_by_name(names);
        $crate::AutoList::<$types>::from_bundle(list, $crate::AutoOptions::default())
    }};
    ($types:ty, [$($name:expr),* $(,)?], $($arg:tt)+) => {{
        let mut list = <$crate::ComponentList<$types> as $crate::Bundle>::new(&$crate::__scope_key!($($arg)+));
        let names: &[&str] = &[$($name),*];
        list.initialize_by_name(names);
        $crate::AutoList::<$types>::from_bundle(list, $crate::AutoOptions::default())
    }};
}

/// Like [`auto_tuple!`] for a [`ComponentHybrid`] with optional components
/// enabled by label.
#[macro_export]
macro_rules! auto_hybrid {
    ($tuple:ty, $list:ty, [$($name:expr),* $(,)?]) => {{
        let mut hybrid = <$crate::ComponentHybrid<$tuple, $list> as $crate::Bundle>::new(&$crate::__scope_key!());
        let names: &[&str] = &[$($name),*];
        hybrid.initialize_by_name(names);
        $crate::AutoHybrid::<$tuple, $list>::from_bundle(hybrid, $crate::AutoOptions::default())
    }};
    ($tuple:ty, $list:ty, [$($name:expr),* $(,)?], $($arg:tt)+) => {{
        let mut hybrid = <$crate::ComponentHybrid<$tuple, $list> as $crate::Bundle>::new(&$crate::__scope_key!($($arg)+));
        let names: &[&str] = &[$($name),*];
        hybrid.initialize_by_name(names);
        $crate::AutoHybrid::<$tuple, $list>::from_bundle(hybrid, $crate::AutoOptions::default())
    }};
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::components::{Counter, TripCount, WallClock};
    use crate::Component;

    thread_local! {
        static STOPS: Cell<u32> = const { Cell::new(0) };
    }

    /// Counts `stop` calls on the current thread.
    #[derive(Clone, Debug, Default)]
    struct StopCount;

    impl Component for StopCount {
        type Value = u32;
        const LABEL: &'static str = "stop_count";

        fn stop(&mut self) {
            STOPS.with(|stops| stops.set(stops.get() + 1));
        }

        fn get(&self) -> u32 {
            STOPS.with(Cell::get)
        }

        fn accumulate(&mut self, _rhs: &Self) {}
        fn subtract(&mut self, _rhs: &Self) {}
    }

    #[test]
    fn guard_starts_and_stops() {
        let mut guard = AutoTuple::<(TripCount,)>::with_options(
            "auto-basic",
            AutoOptions::default().store(false),
        );
        assert!(guard.is_running());
        guard.stop();
        assert!(!guard.is_running());
        assert_eq!(guard.get().0, 1);
    }

    #[test]
    fn explicit_start_waits() {
        let guard = AutoTuple::<(TripCount,)>::with_options(
            "auto-explicit",
            AutoOptions::default().explicit_start().store(false),
        );
        assert!(!guard.is_running());
        assert_eq!(guard.laps(), 0);
    }

    #[test]
    fn reference_accumulates_on_drop() {
        let mut total = ComponentTuple::<(TripCount,)>::new("auto-reference");
        total.set_store(false);
        for _ in 0..4 {
            let guard = AutoTuple::from_reference(&mut total);
            assert!(guard.is_running());
        }
        assert_eq!(total.get().0, 4);
        assert_eq!(total.laps(), 4);
    }

    #[test]
    fn function_name_names_enclosing_fn() {
        let name = crate::function_name!();
        assert!(name.ends_with("function_name_names_enclosing_fn"), "{name}");
    }

    #[test]
    fn list_macro_enables_by_name() {
        let guard = crate::auto_list!((TripCount, Counter), ["trip_count"], "suffix");
        assert_eq!(guard.count(), 1);
        assert!(guard.key().ends_with("list_macro_enables_by_name/suffix"));
    }

    #[test]
    fn report_at_exit_option_is_kept() {
        let mut guard = AutoTuple::<(TripCount,)>::with_options(
            "auto-report",
            AutoOptions::default().report_at_exit().store(false),
        );
        assert!(guard.reports_at_exit());
        guard.set_report_at_exit(false);
        assert!(!guard.reports_at_exit());
    }

    #[test]
    fn explicit_stop_leaves_bundle_running_on_drop() {
        {
            let _guard = AutoTuple::<(StopCount,)>::with_options(
                "auto-implicit-stop",
                AutoOptions::default().store(false),
            );
        }
        assert_eq!(STOPS.with(Cell::get), 1);

        {
            let guard = AutoTuple::<(StopCount,)>::with_options(
                "auto-explicit-stop",
                AutoOptions::default().explicit_stop().store(false),
            );
            assert!(guard.is_running());
        }
        assert_eq!(STOPS.with(Cell::get), 1);

        {
            let mut guard = AutoTuple::<(StopCount,)>::with_options(
                "auto-manual-stop",
                AutoOptions::default().explicit_stop().store(false),
            );
            guard.stop();
        }
        assert_eq!(STOPS.with(Cell::get), 2);
    }

    #[test]
    fn default_initializer_applies_to_new_lists() {
        type Initialized = ComponentList<(Counter, WallClock, TripCount)>;
        Initialized::set_default_initializer(|list| {
            list.init::<TripCount>();
            list.set_store(false);
        });

        let guard = AutoList::<(Counter, WallClock, TripCount)>::new("auto-default-init");
        assert_eq!(guard.count(), 1);
        assert!(guard.is_active::<TripCount>());
        assert!(!guard.store());

        let explicit = AutoList::<(Counter, WallClock, TripCount)>::with_initializer(
            "auto-explicit-init",
            |list| {
                list.init::<Counter>();
                list.set_store(false);
            },
        );
        assert!(explicit.is_active::<Counter>());
        assert!(!explicit.is_active::<TripCount>());
        assert!(explicit.is_running());

        assert!(Initialized::clear_default_initializer());
        assert!(!Initialized::clear_default_initializer());
        assert_eq!(Initialized::new("auto-no-init").count(), 0);
    }

    #[test]
    fn default_initializer_applies_to_hybrids() {
        type Initialized = ComponentHybrid<(TripCount,), (Counter, WallClock)>;
        Initialized::set_default_initializer(|hybrid| {
            hybrid.init::<Counter>();
        });

        let hybrid = Initialized::new("auto-hybrid-init");
        assert!(hybrid.is_active::<Counter>());
        assert!(!hybrid.is_active::<WallClock>());
        assert_eq!(hybrid.count(), 2);

        let guard = AutoHybrid::<(TripCount,), (Counter, WallClock)>::with_initializer(
            "auto-hybrid-explicit",
            |hybrid| {
                hybrid.init::<WallClock>();
                hybrid.set_store(false);
            },
        );
        assert!(guard.is_active::<WallClock>());
        assert!(!guard.is_active::<Counter>());
        assert!(Initialized::clear_default_initializer());
    }
}
