//! Saves test results as JSON reports following [`crate::schema`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use log::info;

use crate::config::{Config, ProfileMode};
use crate::report::TestResult;
use crate::schema::{BenchmarkMetrics, BenchmarkReport, BenchmarkResult, HardwareInfo, RunMetadata};

pub const SCHEMA_VERSION: u32 = 1;

/// Accumulates results for one suite run and writes them to a JSON file.
pub struct ResultRecorder {
    metadata: RunMetadata,
    mode: ProfileMode,
    echo: bool,
    results: Vec<BenchmarkResult>,
}

impl ResultRecorder {
    /// Captures run metadata (git, hardware, timestamp) at construction time.
    pub fn new(config: &Config) -> Self {
        Self {
            metadata: RunMetadata {
                timestamp: iso8601_now(),
                git_commit: git(&["rev-parse", "--short", "HEAD"]),
                git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
                git_dirty: git(&["status", "--porcelain"]).map(|s| !s.is_empty()),
                suite: config.suite.clone(),
                dburl: config.dburl.clone(),
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
                hardware: capture_hardware(),
            },
            mode: config.mode,
            echo: config.echo,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: &TestResult) {
        let mut parameters = HashMap::new();
        parameters.insert("mode".into(), serde_json::json!(format!("{:?}", self.mode)));
        parameters.insert("echo".into(), serde_json::json!(self.echo));

        let total_time_ns = result.total_time.map(|d| d.as_nanos() as u64);
        let ops_per_sec = result
            .total_time
            .filter(|d| !d.is_zero())
            .map(|d| result.iterations as f64 / d.as_secs_f64());

        self.results.push(BenchmarkResult {
            benchmark: result.name.to_string(),
            description: result.description.clone(),
            parameters,
            metrics: BenchmarkMetrics {
                iterations: result.iterations,
                total_time_ns,
                ops_per_sec,
                total_calls: result.stats.as_ref().map(|s| s.total_calls()),
                primitive_calls: result.stats.as_ref().map(|s| s.primitive_calls()),
            },
        });
    }

    pub fn report(&self) -> BenchmarkReport {
        BenchmarkReport {
            schema_version: SCHEMA_VERSION,
            metadata: self.metadata.clone(),
            results: self.results.clone(),
        }
    }

    /// Write the report into `dir` as `<suite>-<timestamp>-<commit>.json`.
    pub fn save(self, dir: &Path) -> io::Result<PathBuf> {
        let commit = self.metadata.git_commit.as_deref().unwrap_or("unknown");
        // Colons are not portable in file names.
        let ts = self.metadata.timestamp.replace(':', "-");
        let filename = format!("{}-{}-{}.json", self.metadata.suite, ts, commit);

        fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        let json = serde_json::to_string_pretty(&self.report())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(&path, json)?;

        info!("results saved to {}", path.display());
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Metadata capture helpers
// ---------------------------------------------------------------------------

fn iso8601_now() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (year, month, day) = civil_from_days(secs / 86_400);
    let rem = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since the Unix epoch to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn capture_hardware() -> HardwareInfo {
    HardwareInfo {
        cpu: read_cpu_model(),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

fn read_cpu_model() -> String {
    fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|m| m.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
