use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of a component report, in depth-first order.
///
/// Rendered cells are kept as strings so reporters do not need the component
/// type; `raw` carries the unformatted [`Component::Value`](crate::Component::Value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub prefix: String,
    pub depth: usize,
    pub hash: u64,
    pub laps: u64,
    pub value: String,
    pub exclusive: String,
    pub mean: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub stddev: Option<String>,
    pub raw: serde_json::Value,
}

/// Process-wide results of one component type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub label: String,
    pub description: String,
    pub units: String,
    pub rows: Vec<ReportRow>,
}

/// Everything a [`Reporter`] receives when a [`Profiler`](crate::Profiler) finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub caller_name: String,
    /// Nanoseconds between profiler construction and the report.
    pub total_elapsed: u64,
    pub components: Vec<ComponentReport>,
}

impl ReportData {
    pub fn headers() -> Vec<&'static str> {
        vec![
            "Scope", "Laps", "Value", "Exclusive", "Mean", "Min", "Max", "Stddev",
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|component| component.rows.is_empty())
    }

    pub fn component(&self, label: &str) -> Option<&ComponentReport> {
        self.components
            .iter()
            .find(|component| component.label == label)
    }
}

/// Output format for the report printed when a [`Profiler`](crate::Profiler) drops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Table,
    Json,
    JsonPretty,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Table => write!(f, "table"),
            Format::Json => write!(f, "json"),
            Format::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

/// Trait for implementing custom report output.
///
/// # Examples
///
/// ```rust
/// use probekit::{ReportData, Reporter};
///
/// struct Summary;
///
/// impl Reporter for Summary {
///     fn report(&self, data: &ReportData) -> probekit::Result<()> {
///         println!("{}: {} component types", data.caller_name, data.components.len());
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter: Send + Sync {
    fn report(&self, data: &ReportData) -> crate::Result<()>;
}

/// Formats a duration in nanoseconds into a human-readable string with appropriate units.
pub fn format_duration(ns: u64) -> String {
    if ns < 1_000 {
        format!("{} ns", ns)
    } else if ns < 1_000_000 {
        format!("{:.2} µs", ns as f64 / 1_000.0)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{} B", bytes)
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}
