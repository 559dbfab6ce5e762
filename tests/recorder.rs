//! JSON reports written by `--save` and read back by `bench-compare`.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use upsert_benchmarks::profile::CallProfiler;
use upsert_benchmarks::recorder::{ResultRecorder, SCHEMA_VERSION};
use upsert_benchmarks::schema::BenchmarkReport;
use upsert_benchmarks::{traced, Config, ProfileMode, TestResult};

fn touched() {
    traced!("touched");
}

fn timed_result() -> TestResult {
    TestResult {
        name: "test_customer_batched_orm_select",
        description: "UPSERT statements via batched checks".to_string(),
        iterations: 1_000,
        total_time: Some(Duration::from_millis(250)),
        stats: None,
    }
}

fn profiled_result() -> TestResult {
    let profiler = CallProfiler::enable().unwrap();
    for _ in 0..3 {
        touched();
    }
    TestResult {
        name: "test_customer_batched_orm_merge_result",
        description: "UPSERT statements using batched merge_results".to_string(),
        iterations: 500,
        total_time: None,
        stats: Some(profiler.disable()),
    }
}

fn saved_config() -> Config {
    let mut config = Config::new("bulk_upserts", 1_000);
    config.dburl = "sqlite://".to_string();
    config.mode = ProfileMode::Calls;
    config
}

#[test]
fn timed_and_profiled_results_map_to_metrics() {
    let mut recorder = ResultRecorder::new(&saved_config());
    recorder.record(&timed_result());
    recorder.record(&profiled_result());
    let report = recorder.report();

    assert_eq!(report.schema_version, SCHEMA_VERSION);
    assert_eq!(report.metadata.suite, "bulk_upserts");
    assert_eq!(report.metadata.dburl, "sqlite://");
    assert_eq!(report.results.len(), 2);

    let timed = &report.results[0].metrics;
    assert_eq!(timed.iterations, 1_000);
    assert_eq!(timed.total_time_ns, Some(250_000_000));
    assert_eq!(timed.ops_per_sec, Some(4_000.0));
    assert_eq!(timed.total_calls, None);
    assert_eq!(timed.primitive_calls, None);

    let profiled = &report.results[1].metrics;
    assert_eq!(profiled.iterations, 500);
    assert_eq!(profiled.total_time_ns, None);
    assert_eq!(profiled.ops_per_sec, None);
    assert_eq!(profiled.total_calls, Some(3));
    assert_eq!(profiled.primitive_calls, Some(3));

    assert_eq!(report.results[0].parameters["mode"], "Calls");
    assert_eq!(report.results[0].parameters["echo"], false);
}

#[test]
fn save_writes_a_report_that_reads_back() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("results");

    let mut recorder = ResultRecorder::new(&saved_config());
    recorder.record(&timed_result());
    recorder.record(&profiled_result());
    let path = recorder.save(&out_dir).unwrap();

    assert_eq!(path.parent(), Some(out_dir.as_path()));
    let filename = path.file_name().unwrap().to_str().unwrap();
    assert!(filename.starts_with("bulk_upserts-"), "{filename}");
    assert!(filename.ends_with(".json"), "{filename}");
    assert!(!filename.contains(':'), "{filename}");

    let report: BenchmarkReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let names: Vec<&str> = report.results.iter().map(|r| r.benchmark.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "test_customer_batched_orm_select",
            "test_customer_batched_orm_merge_result"
        ]
    );
    assert_eq!(report.results[0].metrics.total_time_ns, Some(250_000_000));
    assert_eq!(report.results[1].metrics.total_calls, Some(3));
    assert_eq!(
        report.results[1].description,
        "UPSERT statements using batched merge_results"
    );
}
