//! Run a named benchmark suite.
//!
//! Usage: `cargo run --bin upsert-bench -- bulk_upserts --num 10000 --profile`

use std::io;
use std::process::ExitCode;

use clap::Parser;
use upsert_benchmarks::cli::{self, Cli};

fn main() -> ExitCode {
    cli::load_env();
    let args = Cli::parse();
    cli::init_logging(args.args.verbose, args.args.echo);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli::run(args, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("upsert-bench failed: {err}");
            ExitCode::FAILURE
        }
    }
}
