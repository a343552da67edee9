//! Store location and comparison threshold.
//!
//! The storage root is always an explicit value handed to [`crate::Store::open`];
//! [`StoreConfig::from_env`] only fills that value from the environment.

use std::env;
use std::path::{Path, PathBuf};

use crate::BenchStoreError;

pub const DEFAULT_ROOT: &str = ".benchstore";
pub const DEFAULT_THRESHOLD: f64 = 5.0;
pub const ROOT_ENV: &str = "BENCHSTORE_DIR";
pub const THRESHOLD_ENV: &str = "BENCHSTORE_THRESHOLD";

#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Directory holding run records, `profiles/` and `baselines/`.
    pub root: PathBuf,
    /// Percentage change at or below which a comparison is `same`.
    pub threshold: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::default().with_root(root)
    }

    pub fn from_env() -> Result<Self, BenchStoreError> {
        let mut config = Self::default();
        if let Ok(root) = env::var(ROOT_ENV) {
            if !root.is_empty() {
                config.root = PathBuf::from(root);
            }
        }
        if let Ok(raw) = env::var(THRESHOLD_ENV) {
            config.threshold = parse_threshold(&raw)?;
        }
        Ok(config)
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

pub fn parse_threshold(raw: &str) -> Result<f64, BenchStoreError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| BenchStoreError::invalid_argument(format!("threshold {raw:?} is not a number")))?;
    check_threshold(value)
}

pub(crate) fn check_threshold(value: f64) -> Result<f64, BenchStoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(BenchStoreError::invalid_argument(format!(
            "threshold must be a finite non-negative percentage, got {value}"
        )));
    }
    Ok(value)
}
