//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use upsert_benchmarks::orm::Engine;
use upsert_benchmarks::registry::{SetupArgs, Suite};
use upsert_benchmarks::suites::bulk_upserts::{self, Customer, UpsertContext};
use upsert_benchmarks::{BoxError, Config, ProfileMode};

// =============================================================================
// Databases
// =============================================================================

pub fn db_url(dir: &Path) -> String {
    format!("sqlite:///{}", dir.join("profile.db").display())
}

/// A file-backed engine with an empty customer table.
pub fn fresh_engine(dir: &TempDir) -> Engine {
    let engine = Engine::connect(&db_url(dir.path()), false).expect("failed to open temp db");
    engine.drop_all::<Customer>().unwrap();
    engine.create_all::<Customer>().unwrap();
    engine
}

/// Run the suite's setup hook against a fresh database seeded below `num`.
pub fn seeded_context(dir: &TempDir, num: u64) -> UpsertContext {
    let url = db_url(dir.path());
    let mut ctx = UpsertContext::default();
    let args = SetupArgs {
        dburl: &url,
        echo: false,
        num,
    };
    bulk_upserts::setup_database(&mut ctx, &args).expect("setup_database failed");
    ctx
}

// =============================================================================
// Configuration
// =============================================================================

pub fn config(num: u64) -> Config {
    Config::new("recording", num)
}

pub fn config_with(num: u64, test: Option<&str>, mode: ProfileMode) -> Config {
    let mut config = Config::new("recording", num);
    config.test = test.map(str::to_string);
    config.mode = mode;
    config
}

// =============================================================================
// A suite that records what ran
// =============================================================================

#[derive(Default, Debug)]
pub struct Recording {
    pub events: Vec<String>,
    pub fail_in: Option<&'static str>,
}

impl Recording {
    fn event(&mut self, name: &'static str) -> Result<(), BoxError> {
        self.events.push(name.to_string());
        if self.fail_in == Some(name) {
            return Err(format!("{name} failed on purpose").into());
        }
        Ok(())
    }
}

pub fn setup_once(ctx: &mut Recording, _args: &SetupArgs<'_>) -> Result<(), BoxError> {
    ctx.event("setup_once")
}

pub fn setup(ctx: &mut Recording, _args: &SetupArgs<'_>) -> Result<(), BoxError> {
    ctx.event("setup")
}

pub fn test_a(ctx: &mut Recording, _n: u64) -> Result<(), BoxError> {
    ctx.event("test_a")
}

pub fn test_b(ctx: &mut Recording, _n: u64) -> Result<(), BoxError> {
    ctx.event("test_b")
}

pub fn test_c(ctx: &mut Recording, _n: u64) -> Result<(), BoxError> {
    ctx.event("test_c")
}

pub fn test_sleep(ctx: &mut Recording, _n: u64) -> Result<(), BoxError> {
    thread::sleep(SLEEP);
    ctx.event("test_sleep")
}

pub const SLEEP: Duration = Duration::from_millis(50);

/// Suite "recording" with tests a, b, c and both hooks.
pub fn recording_suite() -> Suite<Recording> {
    let mut suite = Suite::new();
    suite.init("recording", 10);
    suite.register_setup_once("setup_once", setup_once).unwrap();
    suite.register_setup("setup", setup).unwrap();
    suite.register_test("test_a", "First test.", test_a).unwrap();
    suite
        .register_test("test_b", "Second\n        test,  spread over lines.", test_b)
        .unwrap();
    suite.register_test("test_c", "Third test.", test_c).unwrap();
    suite
}

pub fn output_string(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("report is valid UTF-8")
}
