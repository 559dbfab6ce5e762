//! Bulk UPSERT micro-benchmarks and the harness that runs them.
//!
//! A suite is an explicit [`registry::Suite`] value: a name, a default
//! iteration count, an ordered list of test functions and up to two setup
//! hooks. The [`runner`] executes a suite under a wall-clock timer or the
//! instrumenting [`profile::CallProfiler`] and prints one summary line per
//! test. The strategies themselves live in [`suites`] and go through the
//! small session layer in [`orm`].

pub mod cli;
pub mod config;
pub mod error;
pub mod orm;
pub mod profile;
pub mod recorder;
pub mod registry;
pub mod report;
pub mod runner;
pub mod schema;
pub mod suites;

pub use config::{Config, ProfileMode};
pub use error::{BoxError, HarnessError};
pub use registry::{SetupArgs, Suite};
pub use report::TestResult;
