//! Benchmark comparison tool.
//!
//! Compares two JSON reports written with `--save` and prints a table of
//! total-time deltas, falling back to call counts for profiled runs.
//!
//! Usage: `cargo run --bin bench-compare -- <baseline.json> <candidate.json>`

use std::collections::HashMap;
use std::process::ExitCode;

use upsert_benchmarks::schema::{BenchmarkMetrics, BenchmarkReport, BenchmarkResult};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <baseline.json> <candidate.json>", args[0]);
        return ExitCode::FAILURE;
    }

    let (baseline, candidate) = match (load_report(&args[1]), load_report(&args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let base_map: HashMap<&str, &BenchmarkResult> = baseline
        .results
        .iter()
        .map(|r| (r.benchmark.as_str(), r))
        .collect();

    eprintln!(
        "Baseline: {} ({}, {})",
        args[1], baseline.metadata.suite, baseline.metadata.timestamp
    );
    eprintln!(
        "Candidate: {} ({}, {})",
        args[2], candidate.metadata.suite, candidate.metadata.timestamp
    );
    eprintln!();

    println!(
        "{:<52} | {:>12} | {:>12} | {:>12}",
        "Test", "Base", "New", "Delta"
    );
    println!("{}", "-".repeat(96));

    let mut matched = 0u32;
    let mut only_cand = 0u32;
    for cand in &candidate.results {
        match base_map.get(cand.benchmark.as_str()) {
            Some(base) => {
                matched += 1;
                print_comparison(&cand.benchmark, &base.metrics, &cand.metrics);
            }
            None => only_cand += 1,
        }
    }
    let only_base = baseline
        .results
        .iter()
        .filter(|b| !candidate.results.iter().any(|c| c.benchmark == b.benchmark))
        .count();

    println!("{}", "-".repeat(96));
    println!(
        "Compared: {} | Baseline only: {} | Candidate only: {}",
        matched, only_base, only_cand
    );
    ExitCode::SUCCESS
}

fn load_report(path: &str) -> Result<BenchmarkReport, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path, e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Error parsing {}: {}", path, e))
}

fn print_comparison(name: &str, base: &BenchmarkMetrics, cand: &BenchmarkMetrics) {
    if base.iterations != cand.iterations {
        println!(
            "{:<52} | iterations differ ({} vs {}), skipped",
            name, base.iterations, cand.iterations
        );
        return;
    }

    // Lower is better for both time and call counts.
    let (base_val, cand_val, render): (u64, u64, fn(u64) -> String) =
        match (base.total_time_ns, cand.total_time_ns, base.total_calls, cand.total_calls) {
            (Some(b), Some(c), _, _) => (b, c, format_ns as fn(u64) -> String),
            (_, _, Some(b), Some(c)) => (b, c, format_calls as fn(u64) -> String),
            _ => {
                println!("{:<52} | no comparable metric", name);
                return;
            }
        };

    let delta_pct = if base_val > 0 {
        ((cand_val as f64 - base_val as f64) / base_val as f64) * 100.0
    } else {
        0.0
    };
    let hint = if delta_pct < -1.0 {
        "faster"
    } else if delta_pct > 1.0 {
        "slower"
    } else {
        "~same"
    };

    println!(
        "{:<52} | {:>12} | {:>12} | {:>+.1}% ({})",
        name,
        render(base_val),
        render(cand_val),
        delta_pct,
        hint,
    );
}

fn format_ns(ns: u64) -> String {
    if ns < 1_000 {
        format!("{} ns", ns)
    } else if ns < 1_000_000 {
        format!("{:.2} us", ns as f64 / 1_000.0)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    }
}

fn format_calls(n: u64) -> String {
    let s = n.to_string();
    let mut grouped = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{} calls", grouped.chars().rev().collect::<String>())
}
