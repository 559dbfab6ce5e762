//! Executes a suite: select, set up, run each test timed or profiled, report.

use std::io::Write;
use std::time::Instant;

use log::{debug, info};

use crate::config::Config;
use crate::error::{HarnessError, HookKind};
use crate::profile::{self, CallProfiler, FunctionId};
use crate::registry::{Hook, SetupArgs, Suite, TestCase};
use crate::report::TestResult;

/// Runs one suite against one configuration.
pub struct Runner<'a> {
    config: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn setup_args(&self) -> SetupArgs<'a> {
        SetupArgs {
            dburl: &self.config.dburl,
            echo: self.config.echo,
            num: self.config.num,
        }
    }

    /// The tests to execute, in registration order.
    pub fn select<'s, C>(&self, suite: &'s Suite<C>) -> Result<Vec<&'s TestCase<C>>, HarnessError> {
        let selected: Vec<&TestCase<C>> = match &self.config.test {
            Some(name) => {
                let matching: Vec<_> = suite
                    .tests()
                    .iter()
                    .filter(|t| t.name == name.as_str())
                    .collect();
                if matching.is_empty() {
                    return Err(HarnessError::NoSuchTest(name.clone()));
                }
                matching
            }
            None => suite.tests().iter().collect(),
        };
        if selected.is_empty() {
            return Err(HarnessError::NoTests(suite.name().to_string()));
        }
        Ok(selected)
    }

    /// Run the selected tests with `ctx`, writing reports to `out`. The first
    /// failing hook or test aborts the run.
    pub fn run<C>(
        &self,
        suite: &Suite<C>,
        ctx: &mut C,
        out: &mut dyn Write,
    ) -> Result<Vec<TestResult>, HarnessError> {
        let tests = self.select(suite)?;

        if let Some(hook) = suite.setup_once() {
            writeln!(out, "Running setup once...")?;
            self.call_hook(HookKind::SetupOnce, hook, ctx)?;
        }
        let names: Vec<&str> = tests.iter().map(|t| t.name).collect();
        writeln!(out, "Tests to run: {}", names.join(", "))?;

        let mut results = Vec::with_capacity(tests.len());
        for test in tests {
            if let Some(hook) = suite.setup() {
                self.call_hook(HookKind::Setup, hook, ctx)?;
            }
            let result = self.run_test(suite.name(), test, ctx)?;
            result.report(self.config, out)?;
            results.push(result);
        }
        Ok(results)
    }

    fn call_hook<C>(&self, kind: HookKind, hook: &Hook<C>, ctx: &mut C) -> Result<(), HarnessError> {
        debug!("running {kind} hook {}", hook.name);
        (hook.func)(ctx, &self.setup_args()).map_err(|source| HarnessError::Setup {
            kind,
            hook: hook.name,
            source,
        })
    }

    fn run_test<C>(
        &self,
        suite: &'static str,
        test: &TestCase<C>,
        ctx: &mut C,
    ) -> Result<TestResult, HarnessError> {
        info!("running {} with num={}", test.name, self.config.num);
        let num = self.config.num;
        let mut result = TestResult {
            name: test.name,
            description: test.description(),
            iterations: num,
            total_time: None,
            stats: None,
        };

        let started = Instant::now();
        let outcome = if self.config.mode.is_profiling() {
            let profiler = CallProfiler::enable()?;
            let outcome = {
                let _scope = profile::enter(FunctionId::new(suite, 0, test.name));
                (test.func)(ctx, num)
            };
            result.stats = Some(profiler.disable());
            outcome
        } else {
            let outcome = (test.func)(ctx, num);
            result.total_time = Some(started.elapsed());
            outcome
        };

        outcome.map_err(|source| HarnessError::TestFailed {
            test: test.name,
            elapsed: started.elapsed(),
            source,
        })?;
        debug!("{} finished in {:?}", test.name, started.elapsed());
        Ok(result)
    }
}

/// A loaded suite with its context type erased, as stored in the suite table.
pub trait LoadedSuite {
    fn name(&self) -> &'static str;

    fn default_num(&self) -> u64;

    fn run(&self, config: &Config, out: &mut dyn Write) -> Result<Vec<TestResult>, HarnessError>;
}

impl<C: Default> LoadedSuite for Suite<C> {
    fn name(&self) -> &'static str {
        Suite::name(self)
    }

    fn default_num(&self) -> u64 {
        Suite::default_num(self)
    }

    fn run(&self, config: &Config, out: &mut dyn Write) -> Result<Vec<TestResult>, HarnessError> {
        let mut ctx = C::default();
        Runner::new(config).run(self, &mut ctx, out)
    }
}
