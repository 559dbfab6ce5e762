//! Sorted call statistics and their text renderings.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::{FunctionId, FunctionTotals};

/// Column used to order the stats table. Every key sorts descending except
/// [`SortKey::Name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Calls,
    Cumulative,
    Time,
    Name,
}

impl SortKey {
    fn label(self) -> &'static str {
        match self {
            SortKey::Calls => "call count",
            SortKey::Cumulative => "cumulative time",
            SortKey::Time => "internal time",
            SortKey::Name => "function name",
        }
    }

    fn compare(self, a: &FunctionRecord, b: &FunctionRecord) -> Ordering {
        match self {
            SortKey::Calls => b.ncalls.cmp(&a.ncalls),
            SortKey::Cumulative => b.cumtime.cmp(&a.cumtime),
            SortKey::Time => b.tottime.cmp(&a.tottime),
            SortKey::Name => a.function.name.cmp(b.function.name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerRecord {
    pub caller: FunctionId,
    pub ncalls: u64,
    #[serde(serialize_with = "as_secs")]
    pub tottime: Duration,
    #[serde(serialize_with = "as_secs")]
    pub cumtime: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionRecord {
    pub function: FunctionId,
    pub ncalls: u64,
    pub primitive_calls: u64,
    #[serde(serialize_with = "as_secs")]
    pub tottime: Duration,
    #[serde(serialize_with = "as_secs")]
    pub cumtime: Duration,
    pub callers: Vec<CallerRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    functions: Vec<FunctionRecord>,
    total_calls: u64,
    primitive_calls: u64,
    #[serde(serialize_with = "as_secs")]
    total_time: Duration,
    order: Vec<SortKey>,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl Stats {
    pub(crate) fn from_totals(totals: HashMap<FunctionId, FunctionTotals>, total_time: Duration) -> Self {
        let mut functions: Vec<FunctionRecord> = totals
            .into_iter()
            .map(|(function, t)| {
                let mut callers: Vec<CallerRecord> = t
                    .callers
                    .into_iter()
                    .map(|(caller, c)| CallerRecord {
                        caller,
                        ncalls: c.ncalls,
                        tottime: c.tottime,
                        cumtime: c.cumtime,
                    })
                    .collect();
                callers.sort_by(|a, b| a.caller.cmp(&b.caller));
                FunctionRecord {
                    function,
                    ncalls: t.ncalls,
                    primitive_calls: t.primitive_calls,
                    tottime: t.tottime,
                    cumtime: t.cumtime,
                    callers,
                }
            })
            .collect();
        functions.sort_by(|a, b| a.function.cmp(&b.function));

        Self {
            total_calls: functions.iter().map(|f| f.ncalls).sum(),
            primitive_calls: functions.iter().map(|f| f.primitive_calls).sum(),
            functions,
            total_time,
            order: Vec::new(),
        }
    }

    /// Reorder by `keys` in priority order; ties fall back to function identity.
    pub fn sort_stats(&mut self, keys: &[SortKey]) -> &mut Self {
        self.functions.sort_by(|a, b| {
            keys.iter()
                .map(|key| key.compare(a, b))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.function.cmp(&b.function))
        });
        self.order = keys.to_vec();
        self
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn primitive_calls(&self) -> u64 {
        self.primitive_calls
    }

    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }

    /// Look up a function by its traced name.
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.function.name == name)
    }

    fn order_line(&self) -> String {
        if self.order.is_empty() {
            return "random".to_string();
        }
        self.order
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn print_stats(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.total_calls == self.primitive_calls {
            writeln!(
                out,
                "         {} function calls in {:.3} seconds",
                self.total_calls,
                self.total_time.as_secs_f64()
            )?;
        } else {
            writeln!(
                out,
                "         {} function calls ({} primitive calls) in {:.3} seconds",
                self.total_calls,
                self.primitive_calls,
                self.total_time.as_secs_f64()
            )?;
        }
        writeln!(out)?;
        writeln!(out, "   Ordered by: {}", self.order_line())?;
        writeln!(out)?;
        writeln!(
            out,
            "   ncalls  tottime  percall  cumtime  percall filename:lineno(function)"
        )?;
        for f in &self.functions {
            let ncalls = if f.ncalls == f.primitive_calls {
                f.ncalls.to_string()
            } else {
                format!("{}/{}", f.ncalls, f.primitive_calls)
            };
            writeln!(
                out,
                "{:>9} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {}",
                ncalls,
                f.tottime.as_secs_f64(),
                per_call(f.tottime, f.ncalls),
                f.cumtime.as_secs_f64(),
                per_call(f.cumtime, f.primitive_calls),
                f.function,
            )?;
        }
        writeln!(out)?;
        Ok(())
    }

    pub fn print_callers(&self, out: &mut dyn Write) -> io::Result<()> {
        let width = self
            .functions
            .iter()
            .map(|f| f.function.to_string().len())
            .max()
            .unwrap_or(0)
            .max("Function".len());

        writeln!(out, "   Ordered by: {}", self.order_line())?;
        writeln!(out)?;
        writeln!(out, "{:<width$}    was called by...", "Function")?;
        writeln!(out, "{:<width$}        ncalls  tottime  cumtime", "")?;
        for f in &self.functions {
            let name = f.function.to_string();
            if f.callers.is_empty() {
                writeln!(out, "{name:<width$} <-")?;
                continue;
            }
            for (i, c) in f.callers.iter().enumerate() {
                let lead = if i == 0 { name.as_str() } else { "" };
                let arrow = if i == 0 { "<-" } else { "  " };
                writeln!(
                    out,
                    "{:<width$} {} {:>8} {:>8.3} {:>8.3}  {}",
                    lead,
                    arrow,
                    c.ncalls,
                    c.tottime.as_secs_f64(),
                    c.cumtime.as_secs_f64(),
                    c.caller,
                )?;
            }
        }
        writeln!(out)?;
        Ok(())
    }

    /// Write the statistics as JSON.
    pub fn dump(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }
}

fn per_call(total: Duration, calls: u64) -> f64 {
    if calls == 0 {
        0.0
    } else {
        total.as_secs_f64() / calls as f64
    }
}
