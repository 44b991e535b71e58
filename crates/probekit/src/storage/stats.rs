use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, SubAssign};

/// Running statistics over the values recorded into a node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    count: u64,
    sum: f64,
    sqr: f64,
    min: f64,
    max: f64,
}

impl Statistics {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sqr += value * value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Sample variance; zero with fewer than two values.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let var = (self.sqr - self.sum * self.sum / n) / (n - 1.0);
        var.max(0.0)
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl AddAssign<&Statistics> for Statistics {
    fn add_assign(&mut self, rhs: &Statistics) {
        if rhs.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = rhs.clone();
            return;
        }
        self.count += rhs.count;
        self.sum += rhs.sum;
        self.sqr += rhs.sqr;
        self.min = self.min.min(rhs.min);
        self.max = self.max.max(rhs.max);
    }
}

/// Removes the sums and counts of `rhs`. Extremes are kept since they cannot
/// be recovered.
impl SubAssign<&Statistics> for Statistics {
    fn sub_assign(&mut self, rhs: &Statistics) {
        self.count = self.count.saturating_sub(rhs.count);
        self.sum -= rhs.sum;
        self.sqr -= rhs.sqr;
        if self.count == 0 {
            *self = Statistics::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from(values: &[f64]) -> Statistics {
        let mut stats = Statistics::default();
        for v in values {
            stats.push(*v);
        }
        stats
    }

    #[test]
    fn mean_min_max() {
        let stats = from(&[2.0, 4.0, 9.0]);
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.mean(), 5.0);
        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 9.0);
    }

    #[test]
    fn variance_matches_two_pass() {
        let values = [1.0, 2.0, 3.0, 4.0, 10.0];
        let stats = from(&values);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let expected =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
        assert!((stats.variance() - expected).abs() < 1e-9);
        assert_eq!(from(&[5.0]).variance(), 0.0);
    }

    #[test]
    fn merge_equals_single_stream() {
        let mut lhs = from(&[1.0, 5.0]);
        let rhs = from(&[3.0, -2.0]);
        lhs += &rhs;
        assert_eq!(lhs, from(&[1.0, 5.0, 3.0, -2.0]));

        let mut empty = Statistics::default();
        empty += &rhs;
        assert_eq!(empty, rhs);
    }

    #[test]
    fn subtract_everything_resets() {
        let mut stats = from(&[1.0, 2.0]);
        let copy = stats.clone();
        stats -= &copy;
        assert!(stats.is_empty());
        assert_eq!(stats.mean(), 0.0);
    }
}
