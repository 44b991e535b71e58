//! Composable profiling components with per-thread call-graph storage.
//! Bundle timers, CPU clocks, memory samplers and your own probes, wrap them in scope guards,
//! and merge what every thread recorded into one process-wide call tree.
//! ## Setup & Usage
//! Put components in a [`ComponentTuple`] (always present), a [`ComponentList`]
//! (enabled at runtime) or a [`ComponentHybrid`] (both), then measure with
//! [`auto_tuple!`], [`#[probekit::measure]`](measure) or a bundle's own
//! `start`/`stop`. A [`Profiler`] prints the merged tree when dropped.

pub mod auto;
pub mod bundle;
pub mod component;
pub mod components;
mod error;
pub mod operation;
pub(crate) mod output;
mod profiler;
mod report;
pub mod runtime;
pub mod set;
pub mod settings;
pub mod storage;
pub(crate) mod tid;

pub use auto::{AutoBundle, AutoHybrid, AutoList, AutoOptions, AutoTuple};
pub use bundle::{Bundle, BundleCore, ComponentHybrid, ComponentList, ComponentTuple};
pub use component::{AuditEvent, AuditKind, Component, Peers, Probe, Scope};
pub use error::{Error, Result};
pub use operation::{Inspect, Operation};
pub use output::{
    format_bytes, format_duration, ComponentReport, Format, ReportData, ReportRow, Reporter,
};
pub use probekit_macros::{main, measure, measure_all, skip};
pub use profiler::{Profiler, ProfilerBuilder};
pub use report::JsonFileReporter;
pub use set::ComponentSet;
pub use settings::Settings;

pub use components::CountingAllocator;

#[cfg(feature = "global-alloc")]
#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;
