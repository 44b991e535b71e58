use super::sys;
use crate::output::format_bytes;
use crate::Component;

fn signed_bytes(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_bytes(bytes.unsigned_abs()))
    } else {
        format_bytes(bytes as u64)
    }
}

/// Growth of the peak resident set size between start and stop.
///
/// `measure` and `sample` record the absolute peak instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeakRss {
    start: u64,
    value: u64,
}

impl Component for PeakRss {
    type Value = u64;

    const LABEL: &'static str = "peak_rss";
    const DESCRIPTION: &'static str = "Peak resident set size growth";
    const UNITS: &'static str = "B";

    fn start(&mut self) {
        self.start = sys::peak_rss_bytes();
    }

    fn stop(&mut self) {
        self.value += sys::peak_rss_bytes().saturating_sub(self.start);
    }

    fn measure(&mut self) {
        self.value = sys::peak_rss_bytes();
    }

    fn sample(&mut self) {
        self.value = self.value.max(sys::peak_rss_bytes());
    }

    fn get(&self) -> u64 {
        self.value
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.value += rhs.value;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.value = self.value.saturating_sub(rhs.value);
    }

    fn divide(&mut self, denominator: u64) {
        self.value /= denominator;
    }

    fn statistic(&self) -> Option<f64> {
        Some(self.value as f64)
    }

    fn format_statistic(value: f64) -> String {
        format_bytes(value.max(0.0) as u64)
    }

    fn display(&self) -> String {
        format!("{} {}", format_bytes(self.value), Self::LABEL)
    }
}

/// Change of the current resident set size between start and stop. May be negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentRss {
    start: u64,
    value: i64,
}

impl Component for CurrentRss {
    type Value = i64;

    const LABEL: &'static str = "current_rss";
    const DESCRIPTION: &'static str = "Resident set size change";
    const UNITS: &'static str = "B";

    fn start(&mut self) {
        self.start = sys::current_rss_bytes();
    }

    fn stop(&mut self) {
        self.value += sys::current_rss_bytes() as i64 - self.start as i64;
    }

    fn measure(&mut self) {
        self.value = sys::current_rss_bytes() as i64;
    }

    fn sample(&mut self) {
        self.measure();
    }

    fn get(&self) -> i64 {
        self.value
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.value += rhs.value;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.value -= rhs.value;
    }

    fn divide(&mut self, denominator: u64) {
        self.value /= denominator as i64;
    }

    fn statistic(&self) -> Option<f64> {
        Some(self.value as f64)
    }

    fn format_statistic(value: f64) -> String {
        signed_bytes(value as i64)
    }

    fn display(&self) -> String {
        format!("{} {}", signed_bytes(self.value), Self::LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_reads_absolute_values() {
        let mut peak = PeakRss::default();
        peak.measure();
        assert!(peak.get() > 0);

        let mut current = CurrentRss::default();
        current.measure();
        assert!(current.get() > 0);
    }

    #[test]
    fn current_rss_formats_negative_change() {
        let rss = CurrentRss {
            start: 0,
            value: -2048,
        };
        assert_eq!(rss.display(), "-2.0 KB current_rss");
    }
}
