//! Pairs two runs by benchmark name and classifies each delta.
//!
//! Lower `NsPerOp` is better. A change whose magnitude is at or below the
//! threshold percentage is `same`; otherwise a decrease is `improved` and an
//! increase is `degraded`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::BenchStoreError;
use crate::config::{DEFAULT_THRESHOLD, check_threshold};
use crate::model::{Baseline, BenchmarkResult, BenchmarkRun, Comparison, Status};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparator {
    threshold: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Comparator {
    pub fn new(threshold: f64) -> Result<Self, BenchStoreError> {
        Ok(Self {
            threshold: check_threshold(threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// One comparison per benchmark present in both runs, in `new`'s order.
    ///
    /// If `old` repeats a name, the last occurrence is used. Benchmarks that
    /// appear in only one run are skipped.
    pub fn compare(&self, old: &BenchmarkRun, new: &BenchmarkRun) -> Vec<Comparison> {
        let mut index: AHashMap<&str, &BenchmarkResult> = AHashMap::with_capacity(old.results.len());
        for result in &old.results {
            index.insert(result.name.as_str(), result);
        }
        new.results
            .iter()
            .filter_map(|current| {
                index
                    .get(current.name.as_str())
                    .map(|previous| self.comparison(&current.name, previous.ns_per_op, current.ns_per_op))
            })
            .collect()
    }

    pub fn compare_to_baseline(&self, baseline: &Baseline, run: &BenchmarkRun) -> Vec<Comparison> {
        self.compare(&baseline.run, run)
    }

    /// Returns `(delta, delta_percent, status)` for one pair of measurements.
    ///
    /// With `old == 0` the percentage is undefined and reported as `None`;
    /// the status then follows the sign of the delta.
    pub fn classify(&self, old: f64, new: f64) -> (f64, Option<f64>, Status) {
        let delta = new - old;
        if old == 0.0 {
            let status = if delta > 0.0 {
                Status::Degraded
            } else if delta < 0.0 {
                Status::Improved
            } else {
                Status::Same
            };
            return (delta, None, status);
        }
        let percent = delta / old * 100.0;
        let status = if percent.abs() <= self.threshold {
            Status::Same
        } else if percent < 0.0 {
            Status::Improved
        } else {
            Status::Degraded
        };
        (delta, Some(percent), status)
    }

    fn comparison(&self, name: &str, old: f64, new: f64) -> Comparison {
        let (delta, delta_percent, status) = self.classify(old, new);
        Comparison {
            name: name.to_string(),
            old_ns_per_op: old,
            new_ns_per_op: new,
            delta,
            delta_percent,
            status,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonSummary {
    pub improved: usize,
    pub degraded: usize,
    pub same: usize,
}

impl ComparisonSummary {
    pub fn total(&self) -> usize {
        self.improved + self.degraded + self.same
    }

    pub fn has_regressions(&self) -> bool {
        self.degraded > 0
    }
}

pub fn summarize(comparisons: &[Comparison]) -> ComparisonSummary {
    comparisons
        .iter()
        .fold(ComparisonSummary::default(), |mut acc, c| {
            match c.status {
                Status::Improved => acc.improved += 1,
                Status::Degraded => acc.degraded += 1,
                Status::Same => acc.same += 1,
            }
            acc
        })
}
