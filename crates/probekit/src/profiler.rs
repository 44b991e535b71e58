use quanta::Instant;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::output::{Format, ReportData, Reporter};
use crate::report::{JsonPrettyReporter, JsonReporter, TableReporter};
use crate::{settings, storage, Error, Settings};

static ACTIVE: AtomicBool = AtomicBool::new(false);

enum ReporterConfig {
    Format(Format),
    Custom(Box<dyn Reporter>),
}

/// Builder for a [`Profiler`].
///
/// # Examples
///
/// ```rust
/// use probekit::{Format, ProfilerBuilder};
///
/// let _profiler = ProfilerBuilder::new("main")
///     .format(Format::JsonPretty)
///     .build();
/// ```
pub struct ProfilerBuilder {
    caller_name: String,
    reporter: ReporterConfig,
    settings: Option<Settings>,
}

impl ProfilerBuilder {
    pub fn new(caller_name: impl Into<String>) -> Self {
        Self {
            caller_name: caller_name.into(),
            reporter: ReporterConfig::Format(Format::Table),
            settings: None,
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.reporter = ReporterConfig::Format(format);
        self
    }

    /// Overrides any format setting.
    pub fn reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = ReporterConfig::Custom(reporter);
        self
    }

    /// Settings installed when the profiler is built.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Fails when another profiler is alive.
    pub fn try_build(self) -> crate::Result<Profiler> {
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::ProfilerActive("another profiler is already running"));
        }

        if let Some(settings) = self.settings {
            settings::set(settings);
        }

        let reporter: Box<dyn Reporter> = match self.reporter {
            ReporterConfig::Format(format) => match format {
                Format::Table => Box::new(TableReporter),
                Format::Json => Box::new(JsonReporter),
                Format::JsonPretty => Box::new(JsonPrettyReporter),
            },
            ReporterConfig::Custom(reporter) => reporter,
        };

        tracing::debug!(caller = %self.caller_name, "profiler started");
        Ok(Profiler {
            caller_name: self.caller_name,
            start: Instant::now(),
            reporter,
        })
    }

    /// # Panics
    ///
    /// Panics if another profiler is already alive.
    pub fn build(self) -> Profiler {
        match self.try_build() {
            Ok(profiler) => profiler,
            Err(err) => panic!("{err}"),
        }
    }
}

/// Reports every component type recorded in the process when dropped.
///
/// Threads that already exited have merged their call graphs; the dropping
/// thread's graphs are merged here. Graphs of threads still running are not
/// included.
pub struct Profiler {
    caller_name: String,
    start: Instant,
    reporter: Box<dyn Reporter>,
}

impl Profiler {
    pub fn caller_name(&self) -> &str {
        &self.caller_name
    }

    /// Finalizes the calling thread and collects the process-wide results.
    pub fn collect(&self) -> ReportData {
        storage::finalize_all();
        ReportData {
            caller_name: self.caller_name.clone(),
            total_elapsed: self.start.elapsed().as_nanos() as u64,
            components: storage::report_all(),
        }
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        let data = self.collect();
        if let Err(err) = self.reporter.report(&data) {
            tracing::error!(error = %err, "failed to write profiling report");
        }
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Capture(Arc<Mutex<Option<ReportData>>>);

    impl Reporter for Capture {
        fn report(&self, data: &ReportData) -> crate::Result<()> {
            *self.0.lock().unwrap() = Some(data.clone());
            Ok(())
        }
    }

    #[test]
    fn single_profiler_at_a_time() {
        let captured = Arc::new(Mutex::new(None));
        let first = ProfilerBuilder::new("first")
            .reporter(Box::new(Capture(captured.clone())))
            .try_build()
            .unwrap();
        assert!(matches!(
            ProfilerBuilder::new("second").try_build(),
            Err(Error::ProfilerActive(_))
        ));
        drop(first);
        assert_eq!(captured.lock().unwrap().as_ref().unwrap().caller_name, "first");

        let again = ProfilerBuilder::new("again")
            .reporter(Box::new(Capture(captured.clone())))
            .try_build();
        assert!(again.is_ok());
    }
}
