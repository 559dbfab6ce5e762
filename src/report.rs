//! Per-test results and their text report.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use log::{info, warn};

use crate::config::{Config, ProfileMode};
use crate::error::HarnessError;
use crate::profile::{SortKey, Stats};

/// Outcome of one executed test. Built once the test returns, never mutated.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: &'static str,
    pub description: String,
    pub iterations: u64,
    pub total_time: Option<Duration>,
    pub stats: Option<Stats>,
}

impl TestResult {
    /// `name : description (n iterations)` plus whichever measurements exist.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} : {} ({} iterations)",
            self.name, self.description, self.iterations
        );
        if let Some(total) = self.total_time {
            summary.push_str(&format!("; total time {:.6} sec", total.as_secs_f64()));
        }
        if let Some(stats) = &self.stats {
            summary.push_str(&format!("; total fn calls {}", stats.total_calls()));
        }
        summary
    }

    pub fn report(&self, config: &Config, out: &mut dyn Write) -> Result<(), HarnessError> {
        writeln!(out, "{}", self.summary())?;
        let Some(stats) = &self.stats else {
            return Ok(());
        };
        match config.mode {
            ProfileMode::Visual => {
                self.open_viewer(stats, &config.viewer)?;
            }
            ProfileMode::Dump { callers } => {
                let mut stats = stats.clone();
                stats.sort_stats(&[SortKey::Time, SortKey::Calls]);
                stats.print_stats(out)?;
                if callers {
                    stats.print_callers(out)?;
                }
            }
            ProfileMode::Calls | ProfileMode::Time => {}
        }
        Ok(())
    }

    /// Write `stats` to a temporary `.profile` file, run `viewer` on it and
    /// remove the file whatever the viewer's outcome. Returns the path the
    /// file had.
    pub fn open_viewer(&self, stats: &Stats, viewer: &str) -> Result<PathBuf, HarnessError> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{}.", self.name))
            .suffix(".profile")
            .tempfile()?;
        let path = file.path().to_path_buf();
        stats.dump(&path)?;

        info!("opening {} with {viewer}", path.display());
        match Command::new(viewer).arg(&path).status() {
            Ok(status) if !status.success() => warn!("{viewer} exited with {status}"),
            Ok(_) => {}
            Err(err) => warn!("could not run {viewer}: {err}"),
        }

        file.close()?;
        Ok(path)
    }
}
