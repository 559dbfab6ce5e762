//! The `bulk_upserts` suite as a standalone binary; no suite name argument.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use upsert_benchmarks::cli::{self, BoundCli};
use upsert_benchmarks::suites::{self, bulk_upserts};

fn main() -> ExitCode {
    cli::load_env();
    let args = BoundCli::parse();
    cli::init_logging(args.args.verbose, args.args.echo);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = suites::find(bulk_upserts::SUITE_NAME)
        .and_then(|entry| cli::run_entry(entry, args.args, &mut out));
    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bulk-upserts failed: {err}");
            ExitCode::FAILURE
        }
    }
}
