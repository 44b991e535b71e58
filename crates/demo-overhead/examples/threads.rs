use probekit::components::{ThreadCpuClock, TripCount, WallClock};
use probekit::Component;
use std::time::Duration;

#[probekit::measure(WallClock, ThreadCpuClock)]
fn work(id: u64) -> u64 {
    let mut total = 0u64;
    for i in 0..10_000 {
        total = total.wrapping_add(std::hint::black_box(i * id));
    }
    step(id);
    total
}

#[probekit::measure(WallClock, TripCount)]
fn step(id: u64) {
    std::thread::sleep(Duration::from_micros(50 * id));
}

#[probekit::main(format = "table")]
fn main() {
    let handles: Vec<_> = (1..=4)
        .map(|id| {
            std::thread::spawn(move || {
                for _ in 0..3 {
                    work(id);
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            eprintln!("worker panicked");
        }
    }

    let merged = probekit::storage::results::<TripCount>();
    for node in &merged {
        println!(
            "{} laps={} trips={}",
            node.prefix,
            node.laps,
            node.data.get()
        );
    }
}
