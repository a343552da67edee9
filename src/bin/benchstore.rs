use std::{env, io, process};

use benchstore::cli::{CommandLineConfig, run_command};
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let args: Vec<String> = env::args().collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };
    if config.help {
        print!("{}", CommandLineConfig::help());
        return;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = run_command(&config, &mut out) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}
