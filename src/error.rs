//! Harness error taxonomy.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::profile::ProfilerBusy;

/// Error type returned by hook and test bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which of the two suite hooks an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Setup,
    SetupOnce,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Setup => f.write_str("setup"),
            HookKind::SetupOnce => f.write_str("setup_once"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("need to call init(<suite name>, <default num>) before registering test `{test}`")]
    UninitializedSuite { test: &'static str },

    #[error("{kind} function already set to `{existing}`, cannot register `{rejected}`")]
    DuplicateHook {
        kind: HookKind,
        existing: &'static str,
        rejected: &'static str,
    },

    #[error("No such test: {0}")]
    NoSuchTest(String),

    #[error("No such suite: {name} (available: {})", .available.join(", "))]
    SuiteNotFound {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("suite `{0}` has no tests to run")]
    NoTests(String),

    #[error("{kind} hook `{hook}` failed: {source}")]
    Setup {
        kind: HookKind,
        hook: &'static str,
        source: BoxError,
    },

    #[error("test `{test}` failed after {elapsed:.6?}: {source}")]
    TestFailed {
        test: &'static str,
        elapsed: Duration,
        source: BoxError,
    },

    #[error(transparent)]
    ProfilerBusy(#[from] ProfilerBusy),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}
