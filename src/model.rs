//! Value types for benchmark measurements, runs, baselines and comparisons.
//!
//! Field names on the wire are part of the on-disk contract and are shared with
//! external renderers, so every field carries an explicit `serde` rename.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BenchStoreError;

/// One measured benchmark.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "N", default)]
    pub iterations: u64,
    #[serde(rename = "NsPerOp")]
    pub ns_per_op: f64,
    #[serde(
        rename = "AllocedBytesPerOp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alloced_bytes_per_op: Option<u64>,
    #[serde(rename = "AllocsPerOp", default, skip_serializing_if = "Option::is_none")]
    pub allocs_per_op: Option<u64>,
    #[serde(rename = "MBPerS", default, skip_serializing_if = "Option::is_none")]
    pub mb_per_s: Option<f64>,
}

impl BenchmarkResult {
    pub fn new(name: impl Into<String>, ns_per_op: f64) -> Self {
        Self {
            name: name.into(),
            iterations: 0,
            ns_per_op,
            alloced_bytes_per_op: None,
            allocs_per_op: None,
            mb_per_s: None,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_allocations(mut self, bytes_per_op: u64, allocs_per_op: u64) -> Self {
        self.alloced_bytes_per_op = Some(bytes_per_op);
        self.allocs_per_op = Some(allocs_per_op);
        self
    }
}

/// A captured set of measurements, keyed in the store by `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkRun {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Results", default)]
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkRun {
    /// Creates a run stamped with the current time.
    pub fn new(id: impl Into<String>, results: Vec<BenchmarkResult>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            results,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// First result with the given name.
    pub fn result(&self, name: &str) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn validate(&self) -> Result<(), BenchStoreError> {
        validate_key("run id", &self.id)?;
        for result in &self.results {
            if !result.ns_per_op.is_finite() || result.ns_per_op < 0.0 {
                return Err(BenchStoreError::invalid_argument(format!(
                    "run {:?}: benchmark {:?} has invalid NsPerOp {}",
                    self.id, result.name, result.ns_per_op
                )));
            }
        }
        Ok(())
    }
}

/// Named snapshot of a run. The run is embedded by value so the baseline
/// outlives the run it was captured from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Baseline {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RunID")]
    pub run_id: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Run")]
    pub run: BenchmarkRun,
    #[serde(rename = "Tags", default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Improved,
    Degraded,
    Same,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Improved => "improved",
            Status::Degraded => "degraded",
            Status::Same => "same",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one benchmark's cost changed between two runs. Never persisted.
///
/// `delta_percent` is `None` when the old measurement is zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OldNsPerOp")]
    pub old_ns_per_op: f64,
    #[serde(rename = "NewNsPerOp")]
    pub new_ns_per_op: f64,
    #[serde(rename = "Delta")]
    pub delta: f64,
    #[serde(rename = "DeltaPercent")]
    pub delta_percent: Option<f64>,
    #[serde(rename = "Status")]
    pub status: Status,
}

/// Rejects keys that cannot safely be used as a file stem.
pub fn validate_key(what: &str, key: &str) -> Result<(), BenchStoreError> {
    if key.is_empty() {
        return Err(BenchStoreError::invalid_argument(format!(
            "{what} must not be empty"
        )));
    }
    if key == "." || key == ".." || key.contains(['/', '\\']) || key.contains('\0') {
        return Err(BenchStoreError::invalid_argument(format!(
            "{what} {key:?} is not a valid file name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_serializes_contract_field_names() {
        let run = BenchmarkRun::new("r1", vec![BenchmarkResult::new("BenchmarkSort", 12.5)])
            .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["ID"], "r1");
        assert_eq!(value["Timestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(value["Results"][0]["Name"], "BenchmarkSort");
        assert_eq!(value["Results"][0]["NsPerOp"], 12.5);
        assert!(value["Results"][0].get("AllocsPerOp").is_none());
    }

    #[test]
    fn test_result_reads_missing_optional_counters() {
        let raw = r#"{"Name":"BenchmarkParse","NsPerOp":40.0}"#;
        let result: BenchmarkResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.allocs_per_op, None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(Status::Improved.to_string(), "improved");
    }

    #[test]
    fn test_validate_rejects_bad_ids_and_measurements() {
        assert!(validate_key("run id", "a/b").is_err());
        assert!(validate_key("run id", "..").is_err());
        assert!(validate_key("run id", "").is_err());
        assert!(validate_key("run id", "2024-03-01_abc").is_ok());

        let run = BenchmarkRun::new("ok", vec![BenchmarkResult::new("x", -1.0)]);
        assert!(run.validate().unwrap_err().is_invalid_argument());
        let run = BenchmarkRun::new("ok", vec![BenchmarkResult::new("x", f64::NAN)]);
        assert!(run.validate().is_err());
    }

    #[test]
    fn test_result_lookup_returns_first_match() {
        let run = BenchmarkRun::new(
            "dup",
            vec![BenchmarkResult::new("a", 1.0), BenchmarkResult::new("a", 2.0)],
        );
        assert_eq!(run.result("a").map(|r| r.ns_per_op), Some(1.0));
        assert!(run.result("b").is_none());
    }
}
