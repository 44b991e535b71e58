use serde::Serialize;

use crate::{Component, Scope};

/// Counts how many times it was started.
#[derive(Clone, Copy, Debug, Default)]
pub struct TripCount {
    count: u64,
}

impl Component for TripCount {
    type Value = u64;

    const LABEL: &'static str = "trip_count";
    const DESCRIPTION: &'static str = "Number of invocations";

    fn start(&mut self) {
        self.count += 1;
    }

    fn get(&self) -> u64 {
        self.count
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.count += rhs.count;
    }

    fn subtract(&mut self, rhs: &Self) {
        self.count = self.count.saturating_sub(rhs.count);
    }

    fn divide(&mut self, denominator: u64) {
        self.count /= denominator;
    }

    fn statistic(&self) -> Option<f64> {
        Some(self.count as f64)
    }

    fn display(&self) -> String {
        format!("{} {}", self.count, Self::LABEL)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CounterValue {
    pub sum: f64,
    pub samples: u64,
}

/// Accumulates values handed to it through `store`.
///
/// Named sub-counters added with `add_secondary` are recorded as children of
/// the counter's storage node. The last prefix and scope the counter was
/// configured with are kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    value: CounterValue,
    prefix: String,
    scope: Scope,
    secondary: Vec<(String, Counter)>,
}

impl Counter {
    pub fn with_value(value: f64) -> Self {
        let mut counter = Self::default();
        counter.store(value);
        counter
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn secondary(&self) -> &[(String, Counter)] {
        &self.secondary
    }
}

impl Component for Counter {
    type Value = CounterValue;

    const LABEL: &'static str = "counter";
    const DESCRIPTION: &'static str = "User-supplied values";
    const SECONDARY: bool = true;

    fn store(&mut self, value: f64) {
        self.value.sum += value;
        self.value.samples += 1;
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    fn get_secondary(&self) -> Vec<(String, Self)> {
        self.secondary
            .iter()
            .filter(|(_, counter)| counter.value.samples > 0)
            .cloned()
            .collect()
    }

    fn add_secondary(&mut self, name: &str, value: Self) {
        match self.secondary.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, counter)) => counter.accumulate(&value),
            None => self.secondary.push((name.to_string(), value)),
        }
    }

    fn get(&self) -> CounterValue {
        self.value.clone()
    }

    fn accumulate(&mut self, rhs: &Self) {
        self.value.sum += rhs.value.sum;
        self.value.samples += rhs.value.samples;
        for (name, counter) in &rhs.secondary {
            self.add_secondary(name, counter.clone());
        }
    }

    fn subtract(&mut self, rhs: &Self) {
        self.value.sum -= rhs.value.sum;
        self.value.samples = self.value.samples.saturating_sub(rhs.value.samples);
        for (name, counter) in &rhs.secondary {
            if let Some((_, existing)) = self.secondary.iter_mut().find(|(n, _)| n == name) {
                existing.subtract(counter);
            }
        }
    }

    fn divide(&mut self, denominator: u64) {
        self.value.sum /= denominator as f64;
        for (_, counter) in &mut self.secondary {
            counter.divide(denominator);
        }
    }

    fn statistic(&self) -> Option<f64> {
        (self.value.samples > 0).then_some(self.value.sum)
    }

    fn display(&self) -> String {
        format!("{} {}", self.value.sum, Self::LABEL)
    }
}
