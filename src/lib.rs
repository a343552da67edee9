//! Durable local storage for benchmark runs, named baselines and profile
//! artifacts, plus threshold-based regression comparison between runs.

pub mod cli;
pub mod compare;
pub mod config;
pub mod errors;
pub mod model;
pub mod store;

pub use crate::compare::{Comparator, ComparisonSummary, summarize};
pub use crate::config::StoreConfig;
pub use crate::errors::BenchStoreError;
pub use crate::model::{Baseline, BenchmarkResult, BenchmarkRun, Comparison, Status};
pub use crate::store::{ProfileKind, Store};
