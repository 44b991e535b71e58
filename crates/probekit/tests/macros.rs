use probekit::components::{TripCount, WallClock};
use probekit::{storage, Component};

#[derive(Clone, Default)]
struct MacroCount(u64);

impl Component for MacroCount {
    type Value = u64;
    const LABEL: &'static str = "macro_count";

    fn start(&mut self) {
        self.0 += 1;
    }

    fn get(&self) -> u64 {
        self.0
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.0 -= rhs.0;
    }
}

#[probekit::measure(MacroCount, WallClock)]
fn outer() -> u32 {
    inner() + inner()
}

#[probekit::measure(MacroCount)]
fn inner() -> u32 {
    21
}

#[probekit::measure(MacroCount, scope = "flat")]
fn flat_leaf() {}

#[probekit::measure(MacroCount)]
fn calls_flat_leaf() {
    flat_leaf();
}

struct Parser;

#[probekit::measure_all]
impl Parser {
    fn tokenize(&self) -> usize {
        3
    }

    #[probekit::skip]
    fn peek(&self) -> usize {
        1
    }
}

#[test]
fn measure_nests_by_call_stack() {
    assert_eq!(outer(), 42);

    let results = storage::thread_results::<MacroCount>();
    let prefixes: Vec<&str> = results.iter().map(|r| r.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["macros::outer", "|_macros::inner"]);
    assert_eq!(results[1].laps, 2);
    assert_eq!(results[1].data.get(), 2);
}

#[test]
fn measure_honors_scope_argument() {
    std::thread::spawn(calls_flat_leaf).join().unwrap();

    let depths: Vec<(String, usize)> = storage::results::<MacroCount>()
        .into_iter()
        .filter(|r| r.prefix.contains("flat_leaf"))
        .map(|r| (r.prefix, r.depth))
        .collect();
    assert_eq!(depths, vec![("macros::flat_leaf".to_string(), 1)]);
}

#[test]
fn measure_all_skips_marked_methods() {
    std::thread::spawn(|| {
        let parser = Parser;
        assert_eq!(parser.tokenize() + parser.peek(), 4);
    })
    .join()
    .unwrap();

    let keys: Vec<String> = storage::results::<WallClock>()
        .into_iter()
        .map(|r| r.prefix)
        .filter(|p| p.contains("tokenize") || p.contains("peek"))
        .collect();
    assert_eq!(keys, vec!["macros::tokenize"]);
}

#[test]
fn auto_tuple_macro_keys_by_function() {
    fn keyed() {
        let _guard = probekit::auto_tuple!((TripCount,), "slot-{}", 7);
    }
    std::thread::spawn(keyed).join().unwrap();

    let found = storage::results::<TripCount>()
        .into_iter()
        .any(|r| r.prefix.ends_with("keyed/slot-7"));
    assert!(found);
}
