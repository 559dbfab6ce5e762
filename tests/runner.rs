//! Runner behaviour: selection, hooks, timing, profiling and reports.

mod common;

use common::{config, config_with, output_string, recording_suite, Recording, SLEEP};
use upsert_benchmarks::error::HookKind;
use upsert_benchmarks::runner::{LoadedSuite, Runner};
use upsert_benchmarks::traced;
use upsert_benchmarks::{BoxError, HarnessError, ProfileMode, Suite};

fn run(
    suite: &Suite<Recording>,
    config: &upsert_benchmarks::Config,
    ctx: &mut Recording,
) -> (Result<Vec<upsert_benchmarks::TestResult>, HarnessError>, String) {
    let mut out = Vec::new();
    let result = Runner::new(config).run(suite, ctx, &mut out);
    (result, output_string(out))
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn runs_all_tests_in_order_with_hooks() {
    let suite = recording_suite();
    let mut ctx = Recording::default();
    let (result, out) = run(&suite, &config(10), &mut ctx);

    assert_eq!(result.unwrap().len(), 3);
    assert_eq!(
        ctx.events,
        vec!["setup_once", "setup", "test_a", "setup", "test_b", "setup", "test_c"]
    );
    assert!(out.starts_with("Running setup once...\nTests to run: test_a, test_b, test_c\n"));
}

#[test]
fn test_filter_runs_exactly_one() {
    let suite = recording_suite();
    let mut ctx = Recording::default();
    let cfg = config_with(10, Some("test_b"), ProfileMode::Time);
    let (result, out) = run(&suite, &cfg, &mut ctx);

    let results = result.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "test_b");
    assert_eq!(ctx.events, vec!["setup_once", "setup", "test_b"]);
    assert!(out.contains("Tests to run: test_b\n"));
}

#[test]
fn unknown_test_fails_before_anything_runs() {
    let suite = recording_suite();
    let mut ctx = Recording::default();
    let cfg = config_with(10, Some("test_d"), ProfileMode::Time);
    let (result, out) = run(&suite, &cfg, &mut ctx);

    match result.unwrap_err() {
        HarnessError::NoSuchTest(name) => assert_eq!(name, "test_d"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(ctx.events.is_empty());
    assert!(out.is_empty());
}

#[test]
fn empty_suite_is_an_error() {
    let mut suite: Suite<Recording> = Suite::new();
    suite.init("empty", 1);
    let mut ctx = Recording::default();
    let (result, _) = run(&suite, &config(1), &mut ctx);
    assert!(matches!(result, Err(HarnessError::NoTests(name)) if name == "empty"));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn setup_once_failure_aborts_the_run() {
    let suite = recording_suite();
    let mut ctx = Recording {
        fail_in: Some("setup_once"),
        ..Default::default()
    };
    let (result, _) = run(&suite, &config(10), &mut ctx);

    assert!(matches!(
        result,
        Err(HarnessError::Setup {
            kind: HookKind::SetupOnce,
            hook: "setup_once",
            ..
        })
    ));
    assert_eq!(ctx.events, vec!["setup_once"]);
}

#[test]
fn failing_test_aborts_subsequent_tests_and_keeps_elapsed_time() {
    let suite = recording_suite();
    let mut ctx = Recording {
        fail_in: Some("test_b"),
        ..Default::default()
    };
    let (result, out) = run(&suite, &config(10), &mut ctx);

    match result.unwrap_err() {
        HarnessError::TestFailed { test, source, .. } => {
            assert_eq!(test, "test_b");
            assert_eq!(source.to_string(), "test_b failed on purpose");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ctx.events.contains(&"test_c".to_string()));
    assert!(out.contains("test_a : First test. (10 iterations)"));
    assert!(!out.contains("test_b :"));
}

// =============================================================================
// Timed mode
// =============================================================================

#[test]
fn timed_mode_records_at_least_the_sleep() {
    let mut suite: Suite<Recording> = Suite::new();
    suite.init("timed", 3);
    suite
        .register_test("test_sleep", "Sleeps for a while.", common::test_sleep)
        .unwrap();
    let mut ctx = Recording::default();
    let (result, out) = run(&suite, &config(3), &mut ctx);

    let results = result.unwrap();
    let total = results[0].total_time.expect("timed mode records elapsed time");
    assert!(total >= SLEEP, "{total:?} < {SLEEP:?}");
    assert!(results[0].stats.is_none());
    assert!(out.contains("test_sleep : Sleeps for a while. (3 iterations); total time "));
    assert!(out.contains(" sec\n"));
}

// =============================================================================
// Profiled mode
// =============================================================================

const HELPER_CALLS: u64 = 25;

fn traced_helper(acc: &mut u64) {
    traced!("traced_helper");
    *acc += 1;
}

fn test_calls_helper(ctx: &mut Recording, n: u64) -> Result<(), BoxError> {
    let mut acc = 0;
    for _ in 0..n {
        traced_helper(&mut acc);
    }
    ctx.events.push(format!("helper x{acc}"));
    Ok(())
}

fn profiling_suite() -> Suite<Recording> {
    let mut suite = Suite::new();
    suite.init("profiled", HELPER_CALLS);
    suite
        .register_test("test_calls_helper", "Calls a traced helper.", test_calls_helper)
        .unwrap();
    suite
}

#[test]
fn profiled_mode_counts_traced_calls() {
    let suite = profiling_suite();
    let mut ctx = Recording::default();
    let cfg = config_with(HELPER_CALLS, None, ProfileMode::Calls);
    let (result, out) = run(&suite, &cfg, &mut ctx);

    let results = result.unwrap();
    let stats = results[0].stats.as_ref().expect("profiled mode records stats");
    assert!(results[0].total_time.is_none());
    assert!(stats.total_calls() >= HELPER_CALLS);
    assert_eq!(stats.function("traced_helper").unwrap().ncalls, HELPER_CALLS);
    assert_eq!(stats.function("test_calls_helper").unwrap().ncalls, 1);
    // Sorted by cumulative time: the test body encloses everything else.
    assert_eq!(stats.functions()[0].function.name, "test_calls_helper");
    assert!(out.contains(&format!("; total fn calls {}", stats.total_calls())));
    // Plain --profile prints no table.
    assert!(!out.contains("ncalls"));
}

#[test]
fn dump_prints_table_without_callers() {
    let suite = profiling_suite();
    let mut ctx = Recording::default();
    let cfg = config_with(HELPER_CALLS, None, ProfileMode::Dump { callers: false });
    let (result, out) = run(&suite, &cfg, &mut ctx);

    result.unwrap();
    assert!(out.contains("Ordered by: internal time, call count"));
    assert!(out.contains("ncalls  tottime  percall  cumtime  percall"));
    assert!(out.contains("(traced_helper)"));
    assert!(!out.contains("was called by..."));
}

#[test]
fn callers_adds_caller_breakdown() {
    let suite = profiling_suite();
    let mut ctx = Recording::default();
    let cfg = config_with(HELPER_CALLS, None, ProfileMode::Dump { callers: true });
    let (result, out) = run(&suite, &cfg, &mut ctx);

    result.unwrap();
    assert!(out.contains("ncalls  tottime  percall  cumtime  percall"));
    assert!(out.contains("was called by..."));
    assert!(out.contains("profiled:0(test_calls_helper)"));
}

#[test]
fn visual_mode_removes_profile_file() {
    let suite = profiling_suite();
    let mut ctx = Recording::default();
    let mut cfg = config_with(HELPER_CALLS, None, ProfileMode::Visual);
    cfg.viewer = "definitely-not-a-profile-viewer".to_string();
    let (result, out) = run(&suite, &cfg, &mut ctx);

    let results = result.unwrap();
    assert!(out.contains("total fn calls"));
    assert!(!out.contains("ncalls"));

    let stats = results[0].stats.as_ref().unwrap();
    for viewer in ["true", "false", "definitely-not-a-profile-viewer"] {
        let path = results[0].open_viewer(stats, viewer).unwrap();
        assert!(path.to_string_lossy().ends_with(".profile"));
        assert!(!path.exists(), "{} left behind by {viewer}", path.display());
    }
}

// =============================================================================
// Type-erased entry point
// =============================================================================

#[test]
fn loaded_suite_runs_with_default_context() {
    let suite = recording_suite();
    let loaded: &dyn LoadedSuite = &suite;
    assert_eq!(loaded.name(), "recording");
    assert_eq!(loaded.default_num(), 10);

    let mut out = Vec::new();
    let cfg = config_with(7, Some("test_c"), ProfileMode::Time);
    let results = loaded.run(&cfg, &mut out).unwrap();
    assert_eq!(results[0].iterations, 7);
    assert!(output_string(out).contains("test_c : Third test. (7 iterations)"));
}
