use std::collections::BTreeMap;
use std::fs;

use benchstore::{Baseline, BenchmarkResult, BenchmarkRun, Comparator, Status, Store};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn temp_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::new(dir.path());
    (store, dir)
}

fn release_run(id: &str) -> BenchmarkRun {
    BenchmarkRun::new(
        id,
        vec![
            BenchmarkResult::new("BenchmarkQuery", 2500.0).with_iterations(5000),
            BenchmarkResult::new("BenchmarkInsert", 800.0).with_allocations(64, 1),
        ],
    )
}

fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_save_baseline_embeds_run() {
    let (store, _dir) = temp_store();
    let run = release_run("r-100");
    store.save(&run).unwrap();

    let baseline = store
        .save_baseline("v1", "r-100", "release 1.0", tags(&[("branch", "main")]))
        .unwrap();
    assert_eq!(baseline.name, "v1");
    assert_eq!(baseline.run_id, "r-100");
    assert_eq!(baseline.description, "release 1.0");
    assert_eq!(baseline.run, run);
    assert!(store.baseline_path("v1").is_file());
    assert!(store.has_baseline("v1").unwrap());
    assert_eq!(store.load_baseline("v1").unwrap(), baseline);
}

#[test]
fn test_baseline_record_uses_contract_field_names() {
    let (store, _dir) = temp_store();
    store.save(&release_run("r1")).unwrap();
    store
        .save_baseline("v1", "r1", "desc", tags(&[("os", "linux")]))
        .unwrap();
    let raw: serde_json::Value =
        serde_json::from_slice(&fs::read(store.baseline_path("v1")).unwrap()).unwrap();
    for key in ["Name", "RunID", "CreatedAt", "Description", "Run", "Tags"] {
        assert!(raw.get(key).is_some(), "missing {key}");
    }
    assert_eq!(raw["Run"]["ID"], "r1");
    assert_eq!(raw["Tags"]["os"], "linux");
}

#[test]
fn test_save_baseline_requires_existing_run() {
    let (store, _dir) = temp_store();
    let err = store
        .save_baseline("v1", "ghost", "", BTreeMap::new())
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!store.has_baseline("v1").unwrap());
}

#[test]
fn test_baseline_survives_run_deletion() {
    let (store, _dir) = temp_store();
    let run = release_run("r-src");
    store.save(&run).unwrap();
    store.save_baseline("v1", "r-src", "", BTreeMap::new()).unwrap();
    store.delete("r-src").unwrap();

    let baseline = store.load_baseline("v1").unwrap();
    assert_eq!(baseline.run, run);
    assert_eq!(baseline.run_id, "r-src");
}

#[test]
fn test_baseline_names_do_not_collide_with_run_ids() {
    let (store, _dir) = temp_store();
    store.save(&release_run("shared")).unwrap();
    store.save_baseline("shared", "shared", "", BTreeMap::new()).unwrap();
    store.delete_baseline("shared").unwrap();
    assert!(store.load("shared").is_ok());
    assert!(store.load_baseline("shared").unwrap_err().is_not_found());
}

#[test]
fn test_list_baselines_newest_first_skipping_corrupt() {
    let (store, _dir) = temp_store();
    store.save(&release_run("r1")).unwrap();
    store.save_baseline("first", "r1", "", BTreeMap::new()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    store.save_baseline("second", "r1", "", BTreeMap::new()).unwrap();
    fs::write(store.baseline_path("broken"), b"[]").unwrap();

    let names: Vec<String> = store
        .list_baselines()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["second", "first"]);
}

#[test]
fn test_delete_baseline() {
    let (store, _dir) = temp_store();
    store.save(&release_run("r1")).unwrap();
    store.save_baseline("v1", "r1", "", BTreeMap::new()).unwrap();
    store.delete_baseline("v1").unwrap();
    assert!(!store.has_baseline("v1").unwrap());
    assert!(store.delete_baseline("v1").unwrap_err().is_not_found());
    assert!(store.load_baseline("v1").unwrap_err().is_not_found());
    assert!(store.has_baseline("a/b").unwrap_err().is_invalid_argument());
}

#[test]
fn test_compare_run_against_baseline() {
    let (store, _dir) = temp_store();
    store.save(&release_run("r1")).unwrap();
    let baseline = store.save_baseline("v1", "r1", "", BTreeMap::new()).unwrap();

    let candidate = BenchmarkRun::new(
        "r2",
        vec![
            BenchmarkResult::new("BenchmarkInsert", 960.0),
            BenchmarkResult::new("BenchmarkQuery", 2000.0),
        ],
    );
    let comparisons = Comparator::default().compare_to_baseline(&baseline, &candidate);
    assert_eq!(comparisons.len(), 2);
    assert_eq!(comparisons[0].name, "BenchmarkInsert");
    assert_eq!(comparisons[0].status, Status::Degraded);
    assert_eq!(comparisons[1].delta_percent, Some(-20.0));
    assert_eq!(comparisons[1].status, Status::Improved);
}

fn write_baseline_file(store: &Store, file_stem: &str, baseline: &Baseline) {
    fs::create_dir_all(store.baseline_dir()).unwrap();
    fs::write(
        store.baseline_path(file_stem),
        serde_json::to_vec_pretty(baseline).unwrap(),
    )
    .unwrap();
}

fn fixed_baseline(name: &str, run: BenchmarkRun) -> Baseline {
    Baseline {
        name: name.to_string(),
        run_id: run.id.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
        description: String::new(),
        run,
        tags: BTreeMap::new(),
    }
}

#[test]
fn test_list_baselines_breaks_ties_by_name() {
    let (store, _dir) = temp_store();
    for name in ["rc", "beta", "alpha"] {
        write_baseline_file(&store, name, &fixed_baseline(name, release_run("r1")));
    }
    for _ in 0..3 {
        let names: Vec<String> = store
            .list_baselines()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "rc"]);
    }
}

#[test]
fn test_load_baseline_rejects_name_mismatch() {
    let (store, _dir) = temp_store();
    write_baseline_file(&store, "v1", &fixed_baseline("v2", release_run("r1")));
    assert!(store.load_baseline("v1").unwrap_err().is_corrupt());
    assert!(store.list_baselines().unwrap().is_empty());
}

#[test]
fn test_load_baseline_rejects_invalid_embedded_run() {
    let (store, _dir) = temp_store();
    let bad_run = BenchmarkRun::new("r1", vec![BenchmarkResult::new("BenchmarkQuery", -5.0)]);
    write_baseline_file(&store, "v1", &fixed_baseline("v1", bad_run));
    write_baseline_file(&store, "v2", &fixed_baseline("v2", release_run("r2")));

    assert!(store.load_baseline("v1").unwrap_err().is_corrupt());
    let names: Vec<String> = store
        .list_baselines()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["v2"]);
}
