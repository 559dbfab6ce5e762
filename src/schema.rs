//! JSON result report written by `--save` and read by `bench-compare`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level report for one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub metadata: RunMetadata,
    pub results: Vec<BenchmarkResult>,
}

/// Metadata captured when the recorder is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// ISO 8601 timestamp of the run start.
    pub timestamp: String,
    /// Short git commit hash, absent outside a git checkout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Whether the working tree had uncommitted changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
    pub suite: String,
    /// Database URL scheme and target the suite ran against.
    pub dburl: String,
    pub crate_version: String,
    pub hardware: HardwareInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: String,
    /// Number of logical cores.
    pub cores: usize,
    pub os: String,
    pub arch: String,
}

/// One executed test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Test name, e.g. "test_customer_batched_orm_select".
    pub benchmark: String,
    pub description: String,
    /// Mode-specific parameters ("mode", "echo").
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    pub metrics: BenchmarkMetrics,
}

/// Timed runs fill the time fields, profiled runs the call counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub iterations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calls: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive_calls: Option<u64>,
}
