//! Argument handling and command dispatch for the `benchstore` binary.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;

use serde::Serialize;

use crate::config::{StoreConfig, parse_threshold};
use crate::{BenchStoreError, BenchmarkRun, Comparator, Store};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    /// Set by `--help`/`-h` ahead of the command word.
    pub help: bool,
    pub dir: Option<String>,
    pub threshold: Option<String>,
    pub command: String,
    pub command_args: Vec<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut help = false;
        let mut dir = None;
        let mut threshold = None;
        let mut command = String::from("list");
        let mut command_args = Vec::new();
        let mut command_set = false;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            if command_set {
                command_args.push(arg.to_string());
                continue;
            }
            match *arg {
                "--help" | "-h" => help = true,
                "--dir" => {
                    dir = Some(
                        iter.next()
                            .ok_or_else(|| "--dir requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--threshold" => {
                    threshold = Some(
                        iter.next()
                            .ok_or_else(|| "--threshold requires a value".to_string())?
                            .to_string(),
                    );
                }
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => {
                    command = arg.to_string();
                    command_set = true;
                }
            }
        }
        Ok(Self {
            help,
            dir,
            threshold,
            command,
            command_args,
        })
    }

    /// Environment defaults overridden by `--dir` / `--threshold`.
    pub fn store_config(&self) -> Result<StoreConfig, BenchStoreError> {
        let mut config = StoreConfig::from_env()?;
        if let Some(dir) = &self.dir {
            config = config.with_root(dir);
        }
        if let Some(raw) = &self.threshold {
            config = config.with_threshold(parse_threshold(raw)?);
        }
        Ok(config)
    }

    pub fn help() -> &'static str {
        "Usage: benchstore [--dir PATH] [--threshold PCT] <command> [args]\n\
         \n\
         Commands:\n\
         \x20 list                          runs, newest first\n\
         \x20 latest                        most recent run as JSON\n\
         \x20 show ID                       one run as JSON\n\
         \x20 import FILE                   save a run JSON file\n\
         \x20 delete ID                     remove a run and its profiles\n\
         \x20 compare OLD NEW               compare two runs\n\
         \x20 baseline-save NAME RUN [--description D] [--tag K=V]...\n\
         \x20 baselines                     baselines, newest first\n\
         \x20 baseline-show NAME            one baseline as JSON\n\
         \x20 baseline-delete NAME          remove a baseline\n\
         \x20 compare-baseline NAME RUN     compare a run against a baseline\n"
    }
}

pub fn run_command<W: Write>(config: &CommandLineConfig, out: &mut W) -> Result<(), BenchStoreError> {
    let store_config = config.store_config()?;
    let store = Store::open(&store_config);
    let args = &config.command_args;
    match config.command.as_str() {
        "list" => {
            for run in store.list()? {
                emit(
                    out,
                    format_args!(
                        "{}\t{}\t{} benchmarks",
                        run.id,
                        run.timestamp.to_rfc3339(),
                        run.results.len()
                    ),
                )?;
            }
            Ok(())
        }
        "latest" => print_json(out, &store.latest()?),
        "show" => print_json(out, &store.load(positional(args, 0, "show ID")?)?),
        "import" => {
            let file = positional(args, 0, "import FILE")?;
            let data = fs::read(file)
                .map_err(|e| BenchStoreError::io(format!("import {file:?}: {e}")))?;
            let run: BenchmarkRun = serde_json::from_slice(&data)
                .map_err(|e| BenchStoreError::corrupt(format!("import {file:?}: {e}")))?;
            store.save(&run)?;
            emit(out, format_args!("saved run {}", run.id))
        }
        "delete" => {
            let id = positional(args, 0, "delete ID")?;
            store.delete(id)?;
            emit(out, format_args!("deleted run {id}"))
        }
        "compare" => {
            let old = store.load(positional(args, 0, "compare OLD NEW")?)?;
            let new = store.load(positional(args, 1, "compare OLD NEW")?)?;
            let comparator = Comparator::new(store_config.threshold)?;
            print_json(out, &comparator.compare(&old, &new))
        }
        "baseline-save" => {
            let name = positional(args, 0, "baseline-save NAME RUN")?;
            let run_id = positional(args, 1, "baseline-save NAME RUN")?;
            let (description, tags) = parse_baseline_options(&args[2..])?;
            let baseline = store.save_baseline(name, run_id, &description, tags)?;
            emit(
                out,
                format_args!("saved baseline {} from run {}", baseline.name, baseline.run_id),
            )
        }
        "baselines" => {
            for baseline in store.list_baselines()? {
                emit(
                    out,
                    format_args!(
                        "{}\t{}\t{}\t{}",
                        baseline.name,
                        baseline.run_id,
                        baseline.created_at.to_rfc3339(),
                        baseline.description
                    ),
                )?;
            }
            Ok(())
        }
        "baseline-show" => print_json(
            out,
            &store.load_baseline(positional(args, 0, "baseline-show NAME")?)?,
        ),
        "baseline-delete" => {
            let name = positional(args, 0, "baseline-delete NAME")?;
            store.delete_baseline(name)?;
            emit(out, format_args!("deleted baseline {name}"))
        }
        "compare-baseline" => {
            let baseline = store.load_baseline(positional(args, 0, "compare-baseline NAME RUN")?)?;
            let run = store.load(positional(args, 1, "compare-baseline NAME RUN")?)?;
            let comparator = Comparator::new(store_config.threshold)?;
            print_json(out, &comparator.compare_to_baseline(&baseline, &run))
        }
        other => Err(BenchStoreError::invalid_argument(format!(
            "unknown command {other}"
        ))),
    }
}

fn positional<'a>(args: &'a [String], idx: usize, usage: &str) -> Result<&'a str, BenchStoreError> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| BenchStoreError::invalid_argument(format!("usage: {usage}")))
}

pub fn parse_baseline_options(
    args: &[String],
) -> Result<(String, BTreeMap<String, String>), BenchStoreError> {
    let mut description = String::new();
    let mut tags = BTreeMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--description" => {
                description = iter
                    .next()
                    .ok_or_else(|| BenchStoreError::invalid_argument("--description requires a value"))?
                    .clone();
            }
            "--tag" => {
                let value = iter
                    .next()
                    .ok_or_else(|| BenchStoreError::invalid_argument("--tag requires key=value"))?;
                let (key, val) = value.split_once('=').ok_or_else(|| {
                    BenchStoreError::invalid_argument(format!("--tag expects key=value, got {value:?}"))
                })?;
                tags.insert(key.trim().to_string(), val.trim().to_string());
            }
            other => {
                return Err(BenchStoreError::invalid_argument(format!(
                    "unexpected argument {other}"
                )));
            }
        }
    }
    Ok((description, tags))
}

fn emit<W: Write>(out: &mut W, line: std::fmt::Arguments<'_>) -> Result<(), BenchStoreError> {
    writeln!(out, "{line}").map_err(|e| BenchStoreError::io(format!("write output: {e}")))
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), BenchStoreError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BenchStoreError::invalid_argument(format!("encode output: {e}")))?;
    emit(out, format_args!("{text}"))
}
