//! The table of runnable suites.

pub mod bulk_upserts;

use crate::error::HarnessError;
use crate::runner::LoadedSuite;

/// A suite name and the function that builds its registry.
pub struct SuiteEntry {
    pub name: &'static str,
    pub load: fn() -> Result<Box<dyn LoadedSuite>, HarnessError>,
}

pub const SUITES: &[SuiteEntry] = &[SuiteEntry {
    name: "bulk_upserts",
    load: bulk_upserts::load,
}];

pub fn names() -> Vec<&'static str> {
    SUITES.iter().map(|s| s.name).collect()
}

pub fn find(name: &str) -> Result<&'static SuiteEntry, HarnessError> {
    SUITES
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| HarnessError::SuiteNotFound {
            name: name.to_string(),
            available: names(),
        })
}
