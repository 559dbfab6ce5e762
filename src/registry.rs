//! Suite registry: the ordered test list plus the two optional hooks.
//!
//! A suite module builds one [`Suite`] value at load time and hands it to the
//! runner. Hooks and tests are plain function pointers over a suite-defined
//! context `C`, which carries whatever state setup and tests share (usually
//! a database engine).

use crate::error::{BoxError, HarnessError, HookKind};

/// Arguments passed to both setup hooks.
#[derive(Debug, Clone, Copy)]
pub struct SetupArgs<'a> {
    pub dburl: &'a str,
    pub echo: bool,
    pub num: u64,
}

pub type TestFn<C> = fn(&mut C, u64) -> Result<(), BoxError>;
pub type HookFn<C> = fn(&mut C, &SetupArgs<'_>) -> Result<(), BoxError>;

/// A registered benchmark function.
pub struct TestCase<C> {
    pub name: &'static str,
    pub doc: &'static str,
    pub func: TestFn<C>,
}

impl<C> TestCase<C> {
    /// The doc string collapsed onto a single line.
    pub fn description(&self) -> String {
        self.doc.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// A registered setup hook.
pub struct Hook<C> {
    pub name: &'static str,
    pub func: HookFn<C>,
}

pub struct Suite<C> {
    name: Option<&'static str>,
    default_num: u64,
    tests: Vec<TestCase<C>>,
    setup: Option<Hook<C>>,
    setup_once: Option<Hook<C>>,
}

impl<C> Default for Suite<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Suite<C> {
    pub const DEFAULT_NUM: u64 = 10_000;

    pub fn new() -> Self {
        Self {
            name: None,
            default_num: Self::DEFAULT_NUM,
            tests: Vec::new(),
            setup: None,
            setup_once: None,
        }
    }

    /// Declare the suite's identity. Must precede any [`Suite::register_test`].
    pub fn init(&mut self, name: &'static str, default_num: u64) {
        self.name = Some(name);
        self.default_num = default_num;
    }

    pub fn register_test(
        &mut self,
        name: &'static str,
        doc: &'static str,
        func: TestFn<C>,
    ) -> Result<(), HarnessError> {
        if self.name.is_none() {
            return Err(HarnessError::UninitializedSuite { test: name });
        }
        self.tests.push(TestCase { name, doc, func });
        Ok(())
    }

    /// Register the hook run before every test.
    pub fn register_setup(&mut self, name: &'static str, func: HookFn<C>) -> Result<(), HarnessError> {
        set_hook(&mut self.setup, HookKind::Setup, name, func)
    }

    /// Register the hook run once before the first test.
    pub fn register_setup_once(
        &mut self,
        name: &'static str,
        func: HookFn<C>,
    ) -> Result<(), HarnessError> {
        set_hook(&mut self.setup_once, HookKind::SetupOnce, name, func)
    }

    /// Suite name, or an empty string before [`Suite::init`].
    pub fn name(&self) -> &'static str {
        self.name.unwrap_or_default()
    }

    pub fn default_num(&self) -> u64 {
        self.default_num
    }

    pub fn tests(&self) -> &[TestCase<C>] {
        &self.tests
    }

    pub fn setup(&self) -> Option<&Hook<C>> {
        self.setup.as_ref()
    }

    pub fn setup_once(&self) -> Option<&Hook<C>> {
        self.setup_once.as_ref()
    }
}

fn set_hook<C>(
    slot: &mut Option<Hook<C>>,
    kind: HookKind,
    name: &'static str,
    func: HookFn<C>,
) -> Result<(), HarnessError> {
    if let Some(existing) = slot {
        return Err(HarnessError::DuplicateHook {
            kind,
            existing: existing.name,
            rejected: name,
        });
    }
    *slot = Some(Hook { name, func });
    Ok(())
}
