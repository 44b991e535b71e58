// Original source: https://github.com/fornwall/allocation-counter
//
// Licensed under either of:
// - Apache License, Version 2.0.
// - MIT/X Consortium License
//
// Modifications:
// - Per-thread monotonic counters read by the `Allocations` component

use serde::Serialize;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use crate::output::format_bytes;
use crate::Component;

struct Counters {
    bytes: Cell<u64>,
    count: Cell<u64>,
    freed: Cell<u64>,
}

thread_local! {
    static COUNTERS: Counters = const {
        Counters {
            bytes: Cell::new(0),
            count: Cell::new(0),
            freed: Cell::new(0),
        }
    };
}

#[inline]
fn track_alloc(size: usize) {
    let _ = COUNTERS.try_with(|counters| {
        counters.bytes.set(counters.bytes.get() + size as u64);
        counters.count.set(counters.count.get() + 1);
    });
}

#[inline]
fn track_dealloc(size: usize) {
    let _ = COUNTERS.try_with(|counters| {
        counters.freed.set(counters.freed.get() + size as u64);
    });
}

/// Allocation totals of the calling thread since it started.
pub fn thread_totals() -> AllocationValue {
    COUNTERS
        .try_with(|counters| AllocationValue {
            bytes: counters.bytes.get(),
            count: counters.count.get(),
            freed: counters.freed.get(),
        })
        .unwrap_or_default()
}

/// Global allocator that counts allocations per thread before forwarding to [`System`].
///
/// Install it in the binary, or enable the `global-alloc` feature:
///
/// ```rust,ignore
/// #[global_allocator]
/// static GLOBAL: probekit::CountingAllocator = probekit::CountingAllocator;
/// ```
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        track_alloc(layout.size());

        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        track_alloc(layout.size());

        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        track_dealloc(layout.size());

        unsafe {
            System.dealloc(ptr, layout);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllocationValue {
    pub bytes: u64,
    pub count: u64,
    pub freed: u64,
}

/// Bytes and number of allocations made by the calling thread between start and stop.
///
/// Reads zero unless [`CountingAllocator`] is the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Allocations {
    start: AllocationValue,
    value: AllocationValue,
}

impl Component for Allocations {
    type Value = AllocationValue;

    const LABEL: &'static str = "allocations";
    const DESCRIPTION: &'static str = "Heap allocations of the calling thread";
    const UNITS: &'static str = "B";
    // Start last and stop first so the other components' own allocations are not counted.
    const START_PRIORITY: i32 = 1;
    const STOP_PRIORITY: i32 = -1;

    fn start(&mut self) {
        self.start = thread_totals();
    }

    fn stop(&mut self) {
        let now = thread_totals();
        self.value.bytes += now.bytes.saturating_sub(self.start.bytes);
        self.value.count += now.count.saturating_sub(self.start.count);
        self.value.freed += now.freed.saturating_sub(self.start.freed);
    }

    fn get(&self) -> AllocationValue {
        self.value
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.value.bytes += rhs.value.bytes;
        self.value.count += rhs.value.count;
        self.value.freed += rhs.value.freed;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.value.bytes = self.value.bytes.saturating_sub(rhs.value.bytes);
        self.value.count = self.value.count.saturating_sub(rhs.value.count);
        self.value.freed = self.value.freed.saturating_sub(rhs.value.freed);
    }

    fn divide(&mut self, denominator: u64) {
        self.value.bytes /= denominator;
        self.value.count /= denominator;
        self.value.freed /= denominator;
    }

    fn statistic(&self) -> Option<f64> {
        Some(self.value.bytes as f64)
    }

    fn format_statistic(value: f64) -> String {
        format_bytes(value.max(0.0) as u64)
    }

    fn display(&self) -> String {
        format!(
            "{} in {} allocs {}",
            format_bytes(self.value.bytes),
            self.value.count,
            Self::LABEL
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_tracking_updates_totals() {
        let before = thread_totals();
        track_alloc(128);
        track_dealloc(64);
        let after = thread_totals();
        assert!(after.bytes >= before.bytes + 128);
        assert!(after.count > before.count);
        assert!(after.freed >= before.freed + 64);
    }

    #[test]
    fn display_mentions_count() {
        let allocs = Allocations {
            start: AllocationValue::default(),
            value: AllocationValue {
                bytes: 2048,
                count: 3,
                freed: 0,
            },
        };
        assert_eq!(allocs.display(), "2.0 KB in 3 allocs allocations");
    }
}
