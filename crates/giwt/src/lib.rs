//! # giwt: Given/When/Then tests with composable expectations
//!
//! A test unit is a chain of statements on a [`TestCase`]: GIVEN a state,
//! WHEN an action produces a result (or an error, which is captured), THEN
//! expectations verify the result. Units are declared as methods of a
//! [`TestClass`], discovered and validated into a plan, then executed with
//! lifecycle callbacks, skip markers and parameterized runs.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use giwt::prelude::*;
//!
//! fn main() {
//!     giwt::run([TestClass::new("Calculator")
//!         .test("adds", |tc: &mut TestCase<i32, i32>| {
//!             tc.given("one", || 1)?
//!                 .when("multiplying by 2", |v| v * 2)
//!                 .and_when("adding 3", |v| v * 2 + 3)?
//!                 .then("is 5", |r| r.should_be(ExpectedToBe::equal_to(5)).verify());
//!             Ok(())
//!         })]);
//! }
//! ```
//!
//! With the `macros` feature (on by default) the same class can be declared
//! with [`test_class!`] and a whole runner with [`giwt_main!`].
//!
//! ## Features
//!
//! - `macros`: the `test_class!` and `giwt_main!` DSL
//! - `googletest`: `ExpectedToMatch::satisfies` and re-exported matchers via
//!   `giwt::matchers`

mod capture;
pub mod case;
pub mod class;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod expectation;
pub mod listener;
pub mod logging;
pub mod params;
pub mod registry;
pub mod report;
pub mod result;
pub mod statement;
pub mod validate;

use std::io;
use std::time::Instant;

pub use capture::Panicked;
pub use case::{GivenStmt, SetupStmt, TestCase, ThenStmt, WhenStmt};
pub use class::{
    CallbackKind, Extension, IntoUnitResult, MethodDecl, ParameterSource, TestClass,
    TestConfiguration,
};
pub use config::RunConfig;
pub use descriptor::{Selector, TestDescriptor, TestPlan};
pub use engine::{Discovery, Engine, RunResult};
pub use errors::{DefinitionError, DefinitionErrors, GiwtError, VerificationError};
pub use listener::{ConsoleListener, ExecutionListener, RecordingListener};
pub use params::{TestParameters, TypeEquivalences};
pub use registry::ContextRegistry;
pub use report::{JsonReportSink, ReportSink, TestCaseReport};
pub use result::{CapturedError, ResultValue, TestCaseResult};

#[cfg(feature = "macros")]
pub use giwt_macros::{giwt_main, test_class};

/// Re-export of the [`googletest`] crate. Available with the `googletest` feature.
#[cfg(feature = "googletest")]
pub use googletest;

/// Composable matchers re-exported from [`googletest::prelude`].
#[cfg(feature = "googletest")]
pub mod matchers {
    pub use googletest::prelude::*;
}

/// Everything a test file needs.
pub mod prelude {
    pub use crate::case::TestCase;
    pub use crate::class::{CallbackKind, Extension, MethodDecl, TestClass, TestConfiguration};
    pub use crate::errors::GiwtError;
    pub use crate::expectation::{
        matching, Expectation, ExpectedToBe, ExpectedToFail, ExpectedToHave, ExpectedToMatch,
        Verdict,
    };
    pub use crate::params::TestParameters;
    pub use crate::result::TestCaseResult;
}

/// Runs `classes` as a test binary: parses the process args, prints the
/// test tree and exits with status 1 on any failure or definition error.
pub fn run(classes: impl IntoIterator<Item = TestClass>) {
    let config = RunConfig::from_args();
    logging::init(&config);
    match run_with(classes, &config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("giwt: {error}");
            std::process::exit(1);
        }
    }
}

/// Discovers and runs `classes` with `config`; returns whether the run passed.
pub fn run_with(
    classes: impl IntoIterator<Item = TestClass>,
    config: &RunConfig,
) -> Result<bool, GiwtError> {
    let engine = Engine::new(classes);
    let mut registry = ContextRegistry::new();
    let mut discovery = engine.discover(&[Selector::All], &mut registry);
    if let Err(errors) = discovery.check() {
        eprintln!("Definition errors:\n{errors}");
    }
    if let Some(filter) = &config.filter {
        discovery.plan.retain_matching(filter);
    }

    if config.list {
        for path in discovery.plan.root().paths() {
            println!("{path}");
        }
        return Ok(discovery.errors.is_empty());
    }

    println!();
    let mut listener = ConsoleListener::stdout(config.verbose);
    let mut sink = config
        .generate_report
        .then(|| JsonReportSink::new(&config.report_dir));
    let start = Instant::now();
    let result = engine.execute(
        &discovery.plan,
        &mut registry,
        &mut listener,
        sink.as_mut().map(|sink| sink as &mut dyn ReportSink),
    )?;
    if let Err(error) = listener::print_summary(&mut io::stdout(), &result, start.elapsed()) {
        tracing::warn!(%error, "could not print the run summary");
    }
    Ok(result.is_success() && discovery.errors.is_empty())
}
