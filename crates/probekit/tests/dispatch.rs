use probekit::components::{TripCount, WallClock};
use probekit::{
    runtime, AuditEvent, AuditKind, Bundle, Component, ComponentList, ComponentTuple, Operation,
    Peers, Probe,
};
use std::cell::RefCell;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn log(entry: String) {
    LOG.with(|log| log.borrow_mut().push(entry));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| log.borrow_mut().drain(..).collect())
}

macro_rules! recording_component {
    ($name:ident, $label:literal, $start:expr, $stop:expr) => {
        #[derive(Clone, Default)]
        struct $name {
            value: f64,
        }

        impl Component for $name {
            type Value = f64;
            const LABEL: &'static str = $label;
            const START_PRIORITY: i32 = $start;
            const STOP_PRIORITY: i32 = $stop;

            fn start(&mut self) {
                log(format!("start {}", $label));
            }

            fn stop(&mut self) {
                log(format!("stop {}", $label));
            }

            fn mark(&mut self) {
                log(format!("mark {}", $label));
            }

            fn audit(&mut self, event: &AuditEvent<'_>) {
                let kind = match event.kind {
                    AuditKind::Entry => "entry",
                    AuditKind::Exit => "exit",
                };
                log(format!("audit {} {} {}", $label, kind, event.message));
            }

            fn store(&mut self, value: f64) {
                self.value += value;
            }

            fn get(&self) -> f64 {
                self.value
            }

            fn accumulate(&mut self, rhs: &Self) {
                self.value += rhs.value;
            }

            fn subtract(&mut self, rhs: &Self) {
                self.value -= rhs.value;
            }
        }
    };
}

recording_component!(Early, "early", -1, 1);
recording_component!(Normal, "normal", 0, 0);
recording_component!(Late, "late", 1, -1);

/// Has no `store`, so recording into it is a no-op.
#[derive(Clone, Default)]
struct Silent;

impl Component for Silent {
    type Value = ();
    const LABEL: &'static str = "silent";

    fn get(&self) {}
    fn accumulate(&mut self, _rhs: &Self) {}
    fn subtract(&mut self, _rhs: &Self) {}
}

#[test]
fn start_and_stop_follow_priorities() {
    let mut bundle = ComponentTuple::<(Late, Normal, Early)>::new("dispatch-priority");
    bundle.set_store(false);
    take_log();

    bundle.start();
    bundle.stop();

    assert_eq!(
        take_log(),
        vec![
            "start early",
            "start normal",
            "start late",
            "stop late",
            "stop normal",
            "stop early",
        ]
    );
}

#[test]
fn other_verbs_keep_declaration_order() {
    let mut bundle = ComponentTuple::<(Late, Normal, Early)>::new("dispatch-order");
    take_log();
    bundle.mark();
    bundle.audit(AuditEvent::entry("call"));
    assert_eq!(
        take_log(),
        vec![
            "mark late",
            "mark normal",
            "mark early",
            "audit late entry call",
            "audit normal entry call",
            "audit early entry call",
        ]
    );
}

#[test]
fn missing_verbs_are_noops() {
    let mut bundle = ComponentTuple::<(Silent, Normal)>::new("dispatch-noop");
    bundle.set_store(false);
    bundle.record(2.0);
    bundle.measure();
    bundle.sample();
    bundle.start();
    bundle.stop();
    let ((), normal) = bundle.get();
    assert_eq!(normal, 2.0);
}

#[test]
fn repeated_start_is_ignored() {
    let mut bundle = ComponentTuple::<(Normal,)>::new("dispatch-repeat");
    bundle.set_store(false);
    take_log();
    bundle.start();
    bundle.start();
    bundle.stop();
    bundle.stop();
    assert_eq!(take_log(), vec!["start normal", "stop normal"]);
    assert_eq!(bundle.laps(), 1);
}

#[derive(Clone, Default)]
struct RuntimeToggled(u64);

impl Component for RuntimeToggled {
    type Value = u64;
    const LABEL: &'static str = "runtime_toggled";

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

#[test]
fn disabled_type_is_skipped() {
    let mut bundle = ComponentTuple::<(RuntimeToggled, TripCount)>::new("dispatch-disabled");
    bundle.set_store(false);

    assert!(runtime::set_enabled::<RuntimeToggled>(false));
    bundle.start();
    bundle.stop();
    assert!(!runtime::set_enabled::<RuntimeToggled>(true));
    assert!(runtime::is_enabled::<RuntimeToggled>());

    assert_eq!(bundle.get(), (0, 1));

    bundle.start();
    bundle.stop();
    assert_eq!(bundle.get(), (1, 2));
}

struct Tally {
    seen: Vec<&'static str>,
}

impl Operation for Tally {
    fn apply<C: Component>(&mut self, probe: &mut Probe<C>) {
        self.seen.push(C::LABEL);
        probe.component_mut().store(1.0);
    }
}

#[test]
fn invoke_runs_user_operations_on_active_components() {
    let mut list = ComponentList::<(Early, Normal, Late)>::new("dispatch-invoke");
    list.init::<Normal>();
    list.init::<Late>();

    let mut tally = Tally { seen: Vec::new() };
    list.invoke(&mut tally);

    assert_eq!(tally.seen, vec!["normal", "late"]);
    assert_eq!(list.get(), (None, Some(1.0), Some(1.0)));
}

#[derive(Clone, Default)]
struct Ratio {
    wall: u64,
    trips: u64,
}

impl Component for Ratio {
    type Value = (u64, u64);
    const LABEL: &'static str = "ratio";
    const DERIVES: bool = true;

    fn assemble(&mut self, peers: &Peers) -> bool {
        peers.contains::<WallClock>() && peers.contains::<TripCount>()
    }

    fn derive(&mut self, peers: &Peers) -> bool {
        if let (Some(wall), Some(trips)) = (peers.get::<WallClock>(), peers.get::<TripCount>()) {
            self.wall = wall.get();
            self.trips = trips.get();
            return true;
        }
        false
    }

    fn get(&self) -> (u64, u64) {
        (self.wall, self.trips)
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.wall += rhs.wall;
        self.trips += rhs.trips;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.wall -= rhs.wall;
        self.trips -= rhs.trips;
    }
}

#[test]
fn derive_reads_stopped_peers() {
    let mut bundle = ComponentTuple::<(WallClock, TripCount, Ratio)>::new("dispatch-derive");
    bundle.set_store(false);
    assert!(bundle.probes().2.is_derived());

    bundle.start();
    std::thread::sleep(std::time::Duration::from_millis(1));
    bundle.stop();

    let (wall, trips, ratio) = bundle.get();
    assert_eq!(ratio, (wall, trips));
    assert_eq!(trips, 1);
}
