//! Command-line entry points shared by the harness binaries.

use std::io::Write;
use std::path::Path;

use clap::Parser;
use log::{debug, info, LevelFilter};
use simple_logger::SimpleLogger;

use crate::config::BenchArgs;
use crate::error::HarnessError;
use crate::orm::ECHO_TARGET;
use crate::recorder::ResultRecorder;
use crate::report::TestResult;
use crate::suites::{self, SuiteEntry};

/// Run a benchmark suite by name.
#[derive(Parser, Debug)]
#[command(name = "upsert-bench", version, about)]
pub struct Cli {
    /// Suite to run
    pub name: String,

    #[command(flatten)]
    pub args: BenchArgs,
}

/// Arguments for a binary bound to a single suite.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct BoundCli {
    #[command(flatten)]
    pub args: BenchArgs,
}

/// Load `.env` from the working directory, overriding the inherited environment.
pub fn load_env() {
    match dotenvy::dotenv_override() {
        Ok(_) => {}
        Err(err) if err.not_found() => {}
        Err(err) => eprintln!("warning: could not load .env: {err}"),
    }
}

/// Install the logger; `echo` enables echoed SQL whatever the verbosity.
pub fn init_logging(verbose: u8, echo: bool) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut logger = SimpleLogger::new().with_level(level);
    if echo {
        logger = logger.with_module_level(ECHO_TARGET, level.max(LevelFilter::Info));
    }
    if let Err(err) = logger.init() {
        eprintln!("warning: logger already initialised: {err}");
    }
}

/// Resolve the positional suite name and run it.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<Vec<TestResult>, HarnessError> {
    let entry = suites::find(&cli.name)?;
    run_entry(entry, cli.args, out)
}

pub fn run_entry(
    entry: &SuiteEntry,
    args: BenchArgs,
    out: &mut dyn Write,
) -> Result<Vec<TestResult>, HarnessError> {
    let suite = (entry.load)()?;
    info!("loaded suite {} (default num {})", suite.name(), suite.default_num());
    let config = args.into_config(suite.name(), suite.default_num());
    debug!("configuration: {config:?}");

    let results = suite.run(&config, out)?;

    if config.save {
        let mut recorder = ResultRecorder::new(&config);
        for result in &results {
            recorder.record(result);
        }
        recorder.save(Path::new("results"))?;
    }
    Ok(results)
}
