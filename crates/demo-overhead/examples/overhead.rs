use probekit::components::{TripCount, WallClock};
use probekit::{storage, AutoTuple, Bundle, Component, ComponentTuple};
use tracing_subscriber::EnvFilter;

type Timer = ComponentTuple<(WallClock,)>;

fn fibonacci(n: u64) -> u64 {
    if n < 2 {
        n
    } else {
        fibonacci(n - 1) + fibonacci(n - 2)
    }
}

/// Same recursion, with a guard on every call above `cutoff`.
fn measured_fibonacci(n: u64, cutoff: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let _guard = (n > cutoff).then(|| AutoTuple::<(WallClock, TripCount)>::new("fibonacci"));
    measured_fibonacci(n - 1, cutoff) + measured_fibonacci(n - 2, cutoff)
}

#[probekit::main]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let n = 30;
    let cutoff = 18;
    let rounds = 5;
    tracing::info!(n, cutoff, rounds, "comparing plain and measured fibonacci");

    let mut baseline = Timer::new("baseline");
    let mut measured = Timer::new("measured");
    let mut expected = 0;
    let mut answer = 0;

    for _ in 0..rounds {
        baseline.start();
        expected = std::hint::black_box(fibonacci(n));
        baseline.stop();

        measured.start();
        answer = std::hint::black_box(measured_fibonacci(n, cutoff));
        measured.stop();
    }
    assert_eq!(expected, answer);

    let guards: u64 = storage::thread_results::<TripCount>()
        .iter()
        .map(|node| node.data.get())
        .sum();

    let difference = &measured - &baseline;
    let overhead = difference.get().0;
    let per_round = baseline.clone() / baseline.laps();

    println!("fibonacci({n}) = {answer}");
    println!("baseline: {baseline}");
    println!("measured: {measured}");
    println!("baseline per round: {per_round}");
    println!("guards created: {guards}");
    if guards > 0 {
        println!("overhead per guard: {:.1} ns", overhead as f64 / guards as f64);
    }
}
