//! File-backed repository for runs, baselines and profile artifacts.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<run-id>.json
//! <root>/profiles/<run-id>/cpu.prof
//! <root>/profiles/<run-id>/mem.prof
//! <root>/baselines/<name>.json
//! ```
//!
//! One file per entity. Saving under an existing id or name replaces the
//! previous record (last write wins). The store assumes a single writer.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::BenchStoreError;
use crate::config::StoreConfig;
use crate::model::{Baseline, BenchmarkRun, validate_key};

const PROFILES_DIR: &str = "profiles";
const BASELINES_DIR: &str = "baselines";
const RECORD_EXT: &str = "json";
const CPU_PROFILE_FILE: &str = "cpu.prof";
const MEM_PROFILE_FILE: &str = "mem.prof";

/// A persisted entity: keyed by its file stem and checked after every read.
trait Record: DeserializeOwned {
    fn key(&self) -> &str;
    fn check(&self) -> Result<(), BenchStoreError>;
}

impl Record for BenchmarkRun {
    fn key(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<(), BenchStoreError> {
        self.validate()
    }
}

impl Record for Baseline {
    fn key(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<(), BenchStoreError> {
        validate_key("baseline name", &self.name)?;
        self.run.validate()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Cpu,
    Memory,
}

impl ProfileKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ProfileKind::Cpu => CPU_PROFILE_FILE,
            ProfileKind::Memory => MEM_PROFILE_FILE,
        }
    }
}

impl FromStr for ProfileKind {
    type Err = BenchStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(ProfileKind::Cpu),
            "memory" | "mem" => Ok(ProfileKind::Memory),
            other => Err(BenchStoreError::invalid_argument(format!(
                "unknown profile kind {other:?} (expected cpu, memory or mem)"
            ))),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Cpu => f.write_str("cpu"),
            ProfileKind::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn open(config: &StoreConfig) -> Self {
        Self::new(&config.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXT}"))
    }

    pub fn profile_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(PROFILES_DIR).join(run_id)
    }

    pub fn cpu_profile_path(&self, run_id: &str) -> PathBuf {
        self.profile_path(run_id, ProfileKind::Cpu)
    }

    pub fn mem_profile_path(&self, run_id: &str) -> PathBuf {
        self.profile_path(run_id, ProfileKind::Memory)
    }

    pub fn profile_path(&self, run_id: &str, kind: ProfileKind) -> PathBuf {
        self.profile_dir(run_id).join(kind.file_name())
    }

    pub fn baseline_dir(&self) -> PathBuf {
        self.root.join(BASELINES_DIR)
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir().join(format!("{name}.{RECORD_EXT}"))
    }

    /// Persists `run` under its id, replacing any existing record.
    pub fn save(&self, run: &BenchmarkRun) -> Result<(), BenchStoreError> {
        run.validate()?;
        let what = format!("save run {:?}", run.id);
        ensure_dir(&self.root, &what)?;
        write_json(&self.run_path(&run.id), run, &what)?;
        tracing::debug!(target: "benchstore", id = %run.id, results = run.results.len(), "saved run");
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<BenchmarkRun, BenchStoreError> {
        validate_key("run id", id)?;
        read_record(&self.run_path(id), id, &format!("load run {id:?}"))
    }

    pub fn exists(&self, id: &str) -> Result<bool, BenchStoreError> {
        validate_key("run id", id)?;
        Ok(self.run_path(id).is_file())
    }

    /// All readable runs, newest first. Unreadable records are skipped.
    pub fn list(&self) -> Result<Vec<BenchmarkRun>, BenchStoreError> {
        let mut runs: Vec<BenchmarkRun> = read_records(&self.root, "list runs")?;
        runs.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(runs)
    }

    /// Removes the run record, then its profile directory if one exists.
    /// Profile cleanup failures are logged and do not fail the delete.
    pub fn delete(&self, id: &str) -> Result<(), BenchStoreError> {
        validate_key("run id", id)?;
        remove_record(&self.run_path(id), &format!("delete run {id:?}"))?;
        tracing::debug!(target: "benchstore", id, "deleted run");

        let profiles = self.profile_dir(id);
        if profiles.exists() {
            if let Err(err) = fs::remove_dir_all(&profiles) {
                tracing::warn!(
                    target: "benchstore",
                    id,
                    path = %profiles.display(),
                    "failed to remove profile directory: {err}"
                );
            }
        }
        Ok(())
    }

    pub fn latest(&self) -> Result<BenchmarkRun, BenchStoreError> {
        self.list()?
            .into_iter()
            .next()
            .ok_or_else(|| BenchStoreError::not_found("no benchmark runs found"))
    }

    pub fn save_profile(&self, run_id: &str, kind: &str, data: &[u8]) -> Result<(), BenchStoreError> {
        validate_key("run id", run_id)?;
        let kind: ProfileKind = kind.parse()?;
        let what = format!("save {kind} profile for run {run_id:?}");
        ensure_dir(&self.profile_dir(run_id), &what)?;
        write_atomic(&self.profile_path(run_id, kind), data, &what)?;
        tracing::debug!(target: "benchstore", run_id, %kind, bytes = data.len(), "saved profile");
        Ok(())
    }

    pub fn load_profile(&self, run_id: &str, kind: &str) -> Result<Vec<u8>, BenchStoreError> {
        validate_key("run id", run_id)?;
        let kind: ProfileKind = kind.parse()?;
        let path = self.profile_path(run_id, kind);
        let what = format!("load {kind} profile for run {run_id:?}");
        fs::read(&path).map_err(|e| io_error(e, &what, &path))
    }

    pub fn has_profile(&self, run_id: &str, kind: &str) -> Result<bool, BenchStoreError> {
        validate_key("run id", run_id)?;
        let kind: ProfileKind = kind.parse()?;
        Ok(self.profile_path(run_id, kind).is_file())
    }

    /// Snapshots the run `run_id` into a baseline called `name`.
    pub fn save_baseline(
        &self,
        name: &str,
        run_id: &str,
        description: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<Baseline, BenchStoreError> {
        validate_key("baseline name", name)?;
        let run = self.load(run_id)?;
        let baseline = Baseline {
            name: name.to_string(),
            run_id: run.id.clone(),
            created_at: Utc::now(),
            description: description.to_string(),
            run,
            tags,
        };
        let what = format!("save baseline {name:?}");
        ensure_dir(&self.baseline_dir(), &what)?;
        write_json(&self.baseline_path(name), &baseline, &what)?;
        tracing::debug!(target: "benchstore", name, run_id, "saved baseline");
        Ok(baseline)
    }

    pub fn load_baseline(&self, name: &str) -> Result<Baseline, BenchStoreError> {
        validate_key("baseline name", name)?;
        read_record(&self.baseline_path(name), name, &format!("load baseline {name:?}"))
    }

    /// All readable baselines, newest first. Unreadable records are skipped.
    pub fn list_baselines(&self) -> Result<Vec<Baseline>, BenchStoreError> {
        let mut baselines: Vec<Baseline> = read_records(&self.baseline_dir(), "list baselines")?;
        baselines.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(baselines)
    }

    pub fn delete_baseline(&self, name: &str) -> Result<(), BenchStoreError> {
        validate_key("baseline name", name)?;
        remove_record(&self.baseline_path(name), &format!("delete baseline {name:?}"))?;
        tracing::debug!(target: "benchstore", name, "deleted baseline");
        Ok(())
    }

    pub fn has_baseline(&self, name: &str) -> Result<bool, BenchStoreError> {
        validate_key("baseline name", name)?;
        Ok(self.baseline_path(name).is_file())
    }
}

fn io_error(err: std::io::Error, what: &str, path: &Path) -> BenchStoreError {
    if err.kind() == ErrorKind::NotFound {
        BenchStoreError::not_found(format!("{what}: {} does not exist", path.display()))
    } else {
        BenchStoreError::io(format!("{what}: {}: {err}", path.display()))
    }
}

fn ensure_dir(dir: &Path, what: &str) -> Result<(), BenchStoreError> {
    fs::create_dir_all(dir)
        .map_err(|e| BenchStoreError::io(format!("{what}: create {}: {e}", dir.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), BenchStoreError> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| BenchStoreError::invalid_argument(format!("{what}: {e}")))?;
    write_atomic(path, &data, what)
}

/// Writes through a sibling temp file so readers never observe a partial record.
fn write_atomic(path: &Path, data: &[u8], what: &str) -> Result<(), BenchStoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = fs::write(&tmp, data) {
        let _ = fs::remove_file(&tmp);
        return Err(BenchStoreError::io(format!("{what}: write {}: {e}", tmp.display())));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        BenchStoreError::io(format!("{what}: write {}: {e}", path.display()))
    })
}

/// Reads the record at `path` and rejects it as corrupt unless it passes its
/// own validation and its key matches the file stem `key`.
fn read_record<T: Record>(path: &Path, key: &str, what: &str) -> Result<T, BenchStoreError> {
    let data = fs::read(path).map_err(|e| io_error(e, what, path))?;
    let record: T = serde_json::from_slice(&data)
        .map_err(|e| BenchStoreError::corrupt(format!("{what}: {}: {e}", path.display())))?;
    if record.key() != key {
        return Err(BenchStoreError::corrupt(format!(
            "{what}: {}: record key {:?} does not match file name",
            path.display(),
            record.key()
        )));
    }
    record
        .check()
        .map_err(|e| BenchStoreError::corrupt(format!("{what}: {}: {e}", path.display())))?;
    Ok(record)
}

fn remove_record(path: &Path, what: &str) -> Result<(), BenchStoreError> {
    fs::remove_file(path).map_err(|e| io_error(e, what, path))
}

/// Reads every `*.json` file directly under `dir`. A missing directory yields
/// no records; only a failure to enumerate the directory itself is an error.
fn read_records<T: Record>(dir: &Path, what: &str) -> Result<Vec<T>, BenchStoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(BenchStoreError::io(format!(
                "{what}: read {}: {e}",
                dir.display()
            )));
        }
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(target: "benchstore", dir = %dir.display(), "skipping unreadable entry: {err}");
                continue;
            }
        };
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            tracing::warn!(target: "benchstore", path = %path.display(), "skipping record with non-UTF-8 name");
            continue;
        };
        match read_record(&path, key, what) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(target: "benchstore", path = %path.display(), "skipping record: {err}");
            }
        }
    }
    Ok(records)
}
