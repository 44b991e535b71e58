use quanta::Instant;
use serde::Serialize;

use super::sys;
use crate::output::format_duration;
use crate::{Component, Peers};

/// Elapsed-time accumulator shared by the clock components.
#[derive(Clone, Copy, Debug, Default)]
struct Lap {
    started: Option<u64>,
    elapsed: u64,
}

impl Lap {
    fn start(&mut self, now: u64) {
        self.started = Some(now);
    }

    fn stop(&mut self, now: u64) {
        if let Some(started) = self.started.take() {
            self.elapsed += now.saturating_sub(started);
        }
    }
}

fn duration_statistic(value: f64) -> String {
    format_duration(value.max(0.0) as u64)
}

macro_rules! clock_component {
    ($(#[$meta:meta])* $name:ident, $label:literal, $description:literal, $now:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name {
            lap: Lap,
        }

        impl $name {
            /// Accumulated nanoseconds.
            pub fn elapsed_ns(&self) -> u64 {
                self.lap.elapsed
            }
        }

        impl Component for $name {
            type Value = u64;

            const LABEL: &'static str = $label;
            const DESCRIPTION: &'static str = $description;
            const UNITS: &'static str = "ns";

            fn start(&mut self) {
                self.lap.start($now);
            }

            fn stop(&mut self) {
                self.lap.stop($now);
            }

            fn get(&self) -> u64 {
                self.lap.elapsed
            }

            fn accumulate(&mut self, rhs: &Self) {
                self.lap.elapsed += rhs.lap.elapsed;
            }

            fn subtract(&mut self, rhs: &Self) {
                self.lap.elapsed = self.lap.elapsed.saturating_sub(rhs.lap.elapsed);
            }

            fn divide(&mut self, denominator: u64) {
                self.lap.elapsed /= denominator;
            }

            fn statistic(&self) -> Option<f64> {
                Some(self.lap.elapsed as f64)
            }

            fn format_statistic(value: f64) -> String {
                duration_statistic(value)
            }

            fn display(&self) -> String {
                format!("{} {}", format_duration(self.lap.elapsed), Self::LABEL)
            }
        }
    };
}

fn monotonic_ns() -> u64 {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = *START.get_or_init(Instant::now);
    Instant::now().duration_since(start).as_nanos() as u64
}

clock_component!(
    /// Real-clock timer.
    WallClock,
    "wall_clock",
    "Real-clock timer",
    monotonic_ns()
);

clock_component!(
    /// CPU time of the whole process.
    CpuClock,
    "cpu_clock",
    "Process CPU time",
    sys::process_cpu_ns()
);

clock_component!(
    /// CPU time of the calling thread. Start and stop must happen on the same thread.
    ThreadCpuClock,
    "thread_cpu_clock",
    "Thread CPU time",
    sys::thread_cpu_ns()
);

clock_component!(
    /// User-mode CPU time of the process.
    UserClock,
    "user_clock",
    "CPU time in user mode",
    sys::user_cpu_ns()
);

clock_component!(
    /// Kernel-mode CPU time of the process.
    SystemClock,
    "system_clock",
    "CPU time in kernel mode",
    sys::system_cpu_ns()
);

#[derive(Clone, Copy, Debug, Serialize)]
pub struct CpuUtilValue {
    pub percent: f64,
    pub wall_ns: u64,
    pub cpu_ns: u64,
}

macro_rules! cpu_util_component {
    ($(#[$meta:meta])* $name:ident, $label:literal, $description:literal, $clock:ty, $now:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name {
            wall: Lap,
            cpu: Lap,
            from_peers: bool,
        }

        impl $name {
            pub fn percent(&self) -> f64 {
                if self.wall.elapsed == 0 {
                    0.0
                } else {
                    100.0 * self.cpu.elapsed as f64 / self.wall.elapsed as f64
                }
            }

            pub fn is_from_peers(&self) -> bool {
                self.from_peers
            }
        }

        impl Component for $name {
            type Value = CpuUtilValue;

            const LABEL: &'static str = $label;
            const DESCRIPTION: &'static str = $description;
            const UNITS: &'static str = "%";
            const DERIVES: bool = true;

            fn assemble(&mut self, peers: &Peers) -> bool {
                self.from_peers = peers.contains::<WallClock>() && peers.contains::<$clock>();
                self.from_peers
            }

            fn start(&mut self) {
                if !self.from_peers {
                    self.wall.start(monotonic_ns());
                    self.cpu.start($now);
                }
            }

            fn stop(&mut self) {
                if !self.from_peers {
                    self.cpu.stop($now);
                    self.wall.stop(monotonic_ns());
                }
            }

            fn derive(&mut self, peers: &Peers) -> bool {
                if !self.from_peers {
                    return false;
                }
                match (peers.get::<WallClock>(), peers.get::<$clock>()) {
                    (Some(wall), Some(cpu)) => {
                        self.wall.elapsed = wall.elapsed_ns();
                        self.cpu.elapsed = cpu.elapsed_ns();
                        true
                    }
                    _ => false,
                }
            }

            fn get(&self) -> CpuUtilValue {
                CpuUtilValue {
                    percent: self.percent(),
                    wall_ns: self.wall.elapsed,
                    cpu_ns: self.cpu.elapsed,
                }
            }

            fn accumulate(&mut self, rhs: &Self) {
                self.wall.elapsed += rhs.wall.elapsed;
                self.cpu.elapsed += rhs.cpu.elapsed;
            }

            fn subtract(&mut self, rhs: &Self) {
                self.wall.elapsed = self.wall.elapsed.saturating_sub(rhs.wall.elapsed);
                self.cpu.elapsed = self.cpu.elapsed.saturating_sub(rhs.cpu.elapsed);
            }

            fn divide(&mut self, denominator: u64) {
                self.wall.elapsed /= denominator;
                self.cpu.elapsed /= denominator;
            }

            fn statistic(&self) -> Option<f64> {
                Some(self.percent())
            }

            fn format_statistic(value: f64) -> String {
                format!("{:.2}%", value)
            }

            fn display(&self) -> String {
                format!("{:.2}% {}", self.percent(), Self::LABEL)
            }
        }
    };
}

cpu_util_component!(
    /// Ratio of process CPU time to wall time, in percent.
    ///
    /// When the bundle also holds a [`WallClock`] and a [`CpuClock`] the values
    /// are taken from them; otherwise both clocks are read here.
    CpuUtil,
    "cpu_util",
    "Process CPU utilization",
    CpuClock,
    sys::process_cpu_ns()
);

cpu_util_component!(
    /// Ratio of the calling thread's CPU time to wall time, in percent.
    ///
    /// Derived from a [`WallClock`] and a [`ThreadCpuClock`] in the same
    /// bundle when both are present.
    ThreadCpuUtil,
    "thread_cpu_util",
    "Thread CPU utilization",
    ThreadCpuClock,
    sys::thread_cpu_ns()
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wall_clock_measures_sleep() {
        let mut clock = WallClock::default();
        clock.start();
        std::thread::sleep(Duration::from_millis(5));
        clock.stop();
        assert!(clock.get() >= 5_000_000);
        assert!(clock.display().ends_with("wall_clock"));
    }

    #[test]
    fn stop_without_start_is_ignored() {
        let mut clock = WallClock::default();
        clock.stop();
        assert_eq!(clock.get(), 0);
    }

    #[test]
    fn cpu_util_prefers_peers() {
        let mut peers = Peers::default();
        let mut wall = WallClock::default();
        wall.lap.elapsed = 1_000;
        let mut cpu = CpuClock::default();
        cpu.lap.elapsed = 500;
        peers.insert(&wall);
        peers.insert(&cpu);

        let mut util = CpuUtil::default();
        assert!(util.assemble(&peers));
        util.start();
        util.stop();
        assert!(util.derive(&peers));
        assert_eq!(util.get().percent, 50.0);
    }

    #[test]
    fn thread_cpu_util_ignores_process_clock() {
        let mut peers = Peers::default();
        let mut wall = WallClock::default();
        wall.lap.elapsed = 4_000;
        let mut cpu = CpuClock::default();
        cpu.lap.elapsed = 4_000;
        peers.insert(&wall);
        peers.insert(&cpu);

        let mut util = ThreadCpuUtil::default();
        assert!(!util.assemble(&peers));

        let mut thread_cpu = ThreadCpuClock::default();
        thread_cpu.lap.elapsed = 1_000;
        peers.insert(&thread_cpu);
        assert!(util.assemble(&peers));
        assert!(util.derive(&peers));
        assert_eq!(util.get().percent, 25.0);
        assert!(util.display().ends_with("thread_cpu_util"));
    }

    #[test]
    fn user_and_system_clocks_split_cpu_time() {
        let mut user = UserClock::default();
        let mut system = SystemClock::default();
        user.start();
        system.start();
        let mut acc = 0u64;
        for i in 0..5_000_000u64 {
            acc = acc.wrapping_add(i ^ (i >> 3));
        }
        std::hint::black_box(acc);
        system.stop();
        user.stop();
        assert!(user.get() + system.get() > 0);
        assert_eq!(UserClock::LABEL, "user_clock");
        assert_eq!(SystemClock::LABEL, "system_clock");
    }

    #[test]
    fn cpu_util_measures_alone() {
        let mut util = CpuUtil::default();
        assert!(!util.assemble(&Peers::default()));
        util.start();
        std::thread::sleep(Duration::from_millis(2));
        util.stop();
        assert!(util.get().wall_ns > 0);
    }
}
