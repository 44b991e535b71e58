//! Built-in components.

mod alloc;
mod memory;
mod sys;
mod timing;
mod trip;

pub use alloc::{thread_totals, AllocationValue, Allocations, CountingAllocator};
pub use memory::{CurrentRss, PeakRss};
pub use timing::{
    CpuClock, CpuUtil, CpuUtilValue, SystemClock, ThreadCpuClock, ThreadCpuUtil, UserClock,
    WallClock,
};
pub use trip::{Counter, CounterValue, TripCount};
