//! Run configuration, derived once from the command line and environment.

use clap::{ArgAction, Args};

pub const DEFAULT_DBURL: &str = "sqlite:///profile.db";
pub const DEFAULT_VIEWER: &str = "runsnake";

/// How each test is executed and how much profiling detail is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMode {
    /// Wall-clock timing only.
    Time,
    /// Call profiling; the summary line carries the total call count.
    Calls,
    /// Call profiling followed by the full stats table.
    Dump { callers: bool },
    /// Call profiling with stats handed to an external viewer.
    Visual,
}

impl ProfileMode {
    /// Resolve the flag implications: callers => dump => profile, runsnake => profile.
    pub fn from_flags(profile: bool, dump: bool, callers: bool, runsnake: bool) -> Self {
        let dump = dump || callers;
        if runsnake {
            ProfileMode::Visual
        } else if dump {
            ProfileMode::Dump { callers }
        } else if profile {
            ProfileMode::Calls
        } else {
            ProfileMode::Time
        }
    }

    pub fn is_profiling(self) -> bool {
        !matches!(self, ProfileMode::Time)
    }
}

/// Options shared by every harness binary.
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Run specific test name
    #[arg(long)]
    pub test: Option<String>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DBURL)]
    pub dburl: String,

    /// Number of iterations/items/etc for tests; default is module-specific
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=i64::MAX as u64))]
    pub num: Option<u64>,

    /// Run profiling and dump call counts
    #[arg(long)]
    pub profile: bool,

    /// Dump full call profile (implies --profile)
    #[arg(long)]
    pub dump: bool,

    /// Print callers as well (implies --dump)
    #[arg(long)]
    pub callers: bool,

    /// Invoke the visual profiler (implies --profile)
    #[arg(long)]
    pub runsnake: bool,

    /// Command used to open profile data with --runsnake
    #[arg(long, env = "PROFILE_VIEWER", default_value = DEFAULT_VIEWER)]
    pub viewer: String,

    /// Echo SQL output
    #[arg(long)]
    pub echo: bool,

    /// Save results as JSON under results/
    #[arg(long)]
    pub save: bool,

    /// Sets the level of verbosity - add v's to increase output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl BenchArgs {
    pub fn into_config(self, suite: &str, default_num: u64) -> Config {
        Config {
            suite: suite.to_string(),
            mode: ProfileMode::from_flags(self.profile, self.dump, self.callers, self.runsnake),
            test: self.test,
            dburl: self.dburl,
            num: self.num.unwrap_or(default_num),
            echo: self.echo,
            viewer: self.viewer,
            save: self.save,
        }
    }
}

/// Immutable configuration for one harness run.
#[derive(Debug, Clone)]
pub struct Config {
    pub suite: String,
    pub test: Option<String>,
    pub dburl: String,
    pub num: u64,
    pub echo: bool,
    pub mode: ProfileMode,
    pub viewer: String,
    pub save: bool,
}

impl Config {
    /// A time-only configuration with defaults, mostly for embedding the harness.
    pub fn new(suite: &str, num: u64) -> Self {
        Self {
            suite: suite.to_string(),
            test: None,
            dburl: DEFAULT_DBURL.to_string(),
            num,
            echo: false,
            mode: ProfileMode::Time,
            viewer: DEFAULT_VIEWER.to_string(),
            save: false,
        }
    }
}
