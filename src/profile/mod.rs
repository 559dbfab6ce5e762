//! Instrumenting call profiler.
//!
//! Functions opt in with [`traced!`], which opens a scope guard for the
//! enclosing block. While a [`CallProfiler`] is enabled on the current
//! thread every scope entry and exit is recorded: call counts, internal
//! time, cumulative time and the calling function. With no profiler
//! enabled a scope costs one thread-local lookup.

mod stats;

pub use stats::{CallerRecord, FunctionRecord, SortKey, Stats};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

/// Identity of a traced function, printed as `module:line(name)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionId {
    pub module: &'static str,
    pub line: u32,
    pub name: &'static str,
}

impl FunctionId {
    pub const fn new(module: &'static str, line: u32, name: &'static str) -> Self {
        Self { module, line, name }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.module, self.line, self.name)
    }
}

/// Open a traced scope that lasts until the end of the enclosing block.
#[macro_export]
macro_rules! traced {
    ($name:expr) => {
        let _call_scope = $crate::profile::enter($crate::profile::FunctionId::new(
            module_path!(),
            line!(),
            $name,
        ));
    };
}

#[derive(Debug, Error)]
#[error("a call profiler is already enabled on this thread")]
pub struct ProfilerBusy;

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub(crate) struct CallerTotals {
    pub(crate) ncalls: u64,
    pub(crate) tottime: Duration,
    pub(crate) cumtime: Duration,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct FunctionTotals {
    pub(crate) ncalls: u64,
    pub(crate) primitive_calls: u64,
    pub(crate) tottime: Duration,
    pub(crate) cumtime: Duration,
    pub(crate) callers: HashMap<FunctionId, CallerTotals>,
}

struct Frame {
    id: FunctionId,
    started: Instant,
    children: Duration,
}

#[derive(Default)]
pub(crate) struct Recorder {
    functions: HashMap<FunctionId, FunctionTotals>,
    stack: Vec<Frame>,
}

impl Recorder {
    fn push(&mut self, id: FunctionId) {
        self.stack.push(Frame {
            id,
            started: Instant::now(),
            children: Duration::ZERO,
        });
    }

    fn pop(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let elapsed = frame.started.elapsed();
        let own = elapsed.saturating_sub(frame.children);
        // Cumulative time only counts the outermost activation of a function.
        let recursive = self.stack.iter().any(|f| f.id == frame.id);
        let caller = self.stack.last().map(|f| f.id);
        if let Some(parent) = self.stack.last_mut() {
            parent.children += elapsed;
        }

        let totals = self.functions.entry(frame.id).or_default();
        totals.ncalls += 1;
        totals.tottime += own;
        if !recursive {
            totals.primitive_calls += 1;
            totals.cumtime += elapsed;
        }
        if let Some(caller) = caller {
            let by_caller = totals.callers.entry(caller).or_default();
            by_caller.ncalls += 1;
            by_caller.tottime += own;
            if !recursive {
                by_caller.cumtime += elapsed;
            }
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Recorder>> = const { RefCell::new(None) };
}

/// Guard returned by [`enter`]; records the call when dropped.
#[must_use = "the call is recorded when the scope is dropped"]
pub struct CallScope {
    recording: bool,
    _not_send: PhantomData<*const ()>,
}

/// Record entry into `id` if a profiler is enabled on this thread.
pub fn enter(id: FunctionId) -> CallScope {
    let recording = ACTIVE.with(|slot| match slot.borrow_mut().as_mut() {
        Some(recorder) => {
            recorder.push(id);
            true
        }
        None => false,
    });
    CallScope {
        recording,
        _not_send: PhantomData,
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        if self.recording {
            ACTIVE.with(|slot| {
                if let Some(recorder) = slot.borrow_mut().as_mut() {
                    recorder.pop();
                }
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Profiler
// ---------------------------------------------------------------------------

/// An enabled call profiler. Dropping it without [`CallProfiler::disable`]
/// discards what was recorded.
pub struct CallProfiler {
    started: Instant,
    _not_send: PhantomData<*const ()>,
}

impl CallProfiler {
    pub fn enable() -> Result<Self, ProfilerBusy> {
        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(ProfilerBusy);
            }
            *slot = Some(Recorder::default());
            Ok(())
        })?;
        Ok(Self {
            started: Instant::now(),
            _not_send: PhantomData,
        })
    }

    /// Stop recording and collect statistics sorted by cumulative time.
    pub fn disable(self) -> Stats {
        let total_time = self.started.elapsed();
        let recorder = uninstall().unwrap_or_default();
        let mut stats = Stats::from_totals(recorder.functions, total_time);
        stats.sort_stats(&[SortKey::Cumulative]);
        stats
    }

    pub fn is_enabled() -> bool {
        ACTIVE.with(|slot| slot.borrow().is_some())
    }
}

impl Drop for CallProfiler {
    fn drop(&mut self) {
        uninstall();
    }
}

fn uninstall() -> Option<Recorder> {
    ACTIVE.with(|slot| slot.borrow_mut().take())
}
