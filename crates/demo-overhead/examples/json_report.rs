use probekit::components::{Counter, PeakRss, TripCount, WallClock};
use probekit::{Bundle, JsonFileReporter, ProfilerBuilder};

fn parse(line: &str) -> usize {
    let mut guard = probekit::auto_list!((WallClock, PeakRss, Counter), ["wall_clock", "counter"]);
    let words = line.split_whitespace().count();
    guard.record(words as f64);
    guard.add_secondary("bytes", Counter::with_value(line.len() as f64));
    words
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join("probekit_report.json");

    let profiler = ProfilerBuilder::new("json_report")
        .reporter(Box::new(JsonFileReporter::new(&path)))
        .build();

    let text = ["alpha beta", "gamma delta epsilon", "zeta"];
    for line in text {
        let _guard = probekit::auto_tuple!((TripCount,), "line");
        parse(line);
    }
    drop(profiler);

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    println!("Report saved to {}", path.display());
    if let Some(components) = report["components"].as_array() {
        for component in components {
            println!("component: {}", component["label"]);
            for row in component["rows"].as_array().into_iter().flatten() {
                println!("  {} {}", row["prefix"], row["value"]);
            }
        }
    }
    Ok(())
}
