//! Process and thread readings from the operating system.

use std::sync::OnceLock;

fn clock_ns(clock: libc::clockid_t) -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
    if rc != 0 {
        return 0;
    }
    (ts.tv_sec as u64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as u64)
}

/// CPU time consumed by the whole process, in nanoseconds.
pub(crate) fn process_cpu_ns() -> u64 {
    clock_ns(libc::CLOCK_PROCESS_CPUTIME_ID)
}

/// CPU time consumed by the calling thread, in nanoseconds.
pub(crate) fn thread_cpu_ns() -> u64 {
    clock_ns(libc::CLOCK_THREAD_CPUTIME_ID)
}

fn rusage_self() -> Option<libc::rusage> {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    (rc == 0).then_some(usage)
}

fn timeval_ns(tv: libc::timeval) -> u64 {
    (tv.tv_sec.max(0) as u64)
        .saturating_mul(1_000_000_000)
        .saturating_add(tv.tv_usec.max(0) as u64 * 1_000)
}

/// CPU time the process spent in user mode, in nanoseconds.
pub(crate) fn user_cpu_ns() -> u64 {
    rusage_self().map_or(0, |usage| timeval_ns(usage.ru_utime))
}

/// CPU time the process spent in the kernel, in nanoseconds.
pub(crate) fn system_cpu_ns() -> u64 {
    rusage_self().map_or(0, |usage| timeval_ns(usage.ru_stime))
}

/// High-water mark of the resident set size, in bytes.
pub(crate) fn peak_rss_bytes() -> u64 {
    let Some(usage) = rusage_self() else {
        return 0;
    };
    let max = usage.ru_maxrss.max(0) as u64;
    cfg_if::cfg_if! {
        if #[cfg(target_os = "macos")] {
            max
        } else {
            max * 1024
        }
    }
}

fn page_size() -> u64 {
    static PAGE_SIZE: OnceLock<u64> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        let v = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if v <= 0 {
            4096
        } else {
            v as u64
        }
    })
}

/// Current resident set size, in bytes.
pub(crate) fn current_rss_bytes() -> u64 {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            // second field of statm is resident pages
            std::fs::read_to_string("/proc/self/statm")
                .ok()
                .and_then(|statm| {
                    statm
                        .split_whitespace()
                        .nth(1)
                        .and_then(|pages| pages.parse::<u64>().ok())
                })
                .map(|pages| pages * page_size())
                .unwrap_or_else(peak_rss_bytes)
        } else {
            let _ = page_size;
            peak_rss_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_clocks_advance() {
        let before = process_cpu_ns();
        let thread_before = thread_cpu_ns();
        let mut acc = 0u64;
        for i in 0..2_000_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);
        assert!(process_cpu_ns() >= before);
        assert!(thread_cpu_ns() >= thread_before);
        assert!(user_cpu_ns() + system_cpu_ns() > 0);
    }

    #[test]
    fn rss_is_nonzero() {
        assert!(peak_rss_bytes() > 0);
        assert!(current_rss_bytes() > 0);
    }
}
