//! The Given/When/Then statement chain of one test unit.
//!
//! A [`TestCase`] collects statements while open and runs them exactly once:
//!
//! ```rust
//! use giwt::prelude::*;
//!
//! let mut tc: TestCase<i32, i32> = TestCase::new("multiplies then adds");
//! tc.given("one", || 1)?
//!     .when("multiplying by 2", |v| v * 2)
//!     .then("adding 3 gives 5", |r| {
//!         let v = r.result_value()?;
//!         ExpectedToBe::equal_to(5).verify(&(v + 3))
//!     });
//! tc.run()?;
//! # Ok::<(), giwt::GiwtError>(())
//! ```

use std::error::Error;

use crate::capture;
use crate::errors::{GiwtError, VerificationError};
use crate::expectation::Verdict;
use crate::result::{CapturedError, ResultValue, TestCaseResult};
use crate::statement::{Phase, StmtMsg};

type Captured<R> = Result<R, CapturedError>;
type ThenFn<R> = Box<dyn FnOnce(&TestCaseResult<R>) -> Result<(), VerificationError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Closed,
}

enum GivenForm<T> {
    Supplier(Box<dyn FnOnce() -> T>),
    Value(T),
    Runnable(Box<dyn FnOnce()>),
}

enum WhenStep<T, R> {
    Map(Box<dyn FnOnce(&T) -> Captured<R>>),
    /// A side effect; the result of the step before it carries over.
    Run(Box<dyn FnOnce() -> Captured<()>>),
}

/// The single WHEN form of a chain, fixed when the statement is added.
enum WhenForm<T, R> {
    Supplier(Box<dyn FnOnce() -> Captured<R>>),
    Consumer(Box<dyn FnOnce(&T) -> Captured<R>>),
    Steps(Vec<WhenStep<T, R>>),
}

fn captured<R>(f: impl FnOnce() -> R) -> Captured<R> {
    capture::catch(f).map_err(CapturedError::from)
}

fn captured_try<R, E>(f: impl FnOnce() -> Result<R, E>) -> Captured<R>
where
    E: Error + Send + Sync + 'static,
{
    captured(f)?.map_err(CapturedError::new)
}

/// One Given/When/Then test case, run at most once.
pub struct TestCase<T, R> {
    name: String,
    lifecycle: Lifecycle,
    last_phase: Option<Phase>,
    given: Option<GivenForm<T>>,
    and_given: Vec<Box<dyn FnOnce(T) -> T>>,
    when: Option<WhenForm<T, R>>,
    then: Vec<ThenFn<R>>,
    statements: Vec<StmtMsg>,
    result: Option<TestCaseResult<R>>,
}

impl<T: 'static, R: 'static> TestCase<T, R> {
    pub fn new(name: impl Into<String>) -> Self {
        TestCase {
            name: name.into(),
            lifecycle: Lifecycle::Open,
            last_phase: None,
            given: None,
            and_given: Vec::new(),
            when: None,
            then: Vec::new(),
            statements: Vec::new(),
            result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    /// Statements registered so far, in registration order.
    pub fn statements(&self) -> &[StmtMsg] {
        &self.statements
    }

    /// The result of the WHEN statement, once the case has run.
    pub fn result(&self) -> Option<&TestCaseResult<R>> {
        self.result.as_ref()
    }

    fn admit(&mut self, phase: Phase) -> Result<(), GiwtError> {
        if self.is_closed() {
            return Err(GiwtError::Closed);
        }
        match (phase, self.last_phase) {
            (Phase::Given, _) if self.given.is_some() => Err(GiwtError::DuplicateStatement(phase)),
            (Phase::When, _) if self.when.is_some() => Err(GiwtError::DuplicateStatement(phase)),
            (_, Some(after)) if after > phase => Err(GiwtError::StatementOrder { phase, after }),
            _ => Ok(()),
        }
    }

    fn record(&mut self, phase: Phase, message: String) {
        tracing::debug!(test = %self.name, "{}", StmtMsg::new(phase, message.as_str()));
        self.last_phase = Some(phase);
        self.statements.push(StmtMsg::new(phase, message));
    }

    fn set_given(&mut self, message: String, form: GivenForm<T>) -> Result<(), GiwtError> {
        self.admit(Phase::Given)?;
        self.record(Phase::Given, message);
        self.given = Some(form);
        Ok(())
    }

    fn set_when(&mut self, message: String, form: WhenForm<T, R>) -> Result<(), GiwtError> {
        self.admit(Phase::When)?;
        self.install_when(message, form);
        Ok(())
    }

    /// Used by statement builders, whose type already guarantees the order.
    fn install_when(&mut self, message: String, form: WhenForm<T, R>) {
        self.record(Phase::When, message);
        self.when = Some(form);
    }

    fn push_when_step(&mut self, message: String, step: WhenStep<T, R>) -> Result<(), GiwtError> {
        match &mut self.when {
            Some(WhenForm::Steps(steps)) => steps.push(step),
            _ => return Err(GiwtError::DuplicateStatement(Phase::When)),
        }
        self.record(Phase::When, message);
        Ok(())
    }

    fn push_then(&mut self, phase: Phase, message: String, then: ThenFn<R>) {
        self.record(phase, message);
        self.then.push(then);
    }

    /// GIVEN a state produced by `supplier`.
    pub fn given(
        &mut self,
        message: impl Into<String>,
        supplier: impl FnOnce() -> T + 'static,
    ) -> Result<GivenStmt<'_, T, R>, GiwtError> {
        self.set_given(message.into(), GivenForm::Supplier(Box::new(supplier)))?;
        Ok(GivenStmt { case: self })
    }

    /// GIVEN an already built state.
    pub fn given_value(
        &mut self,
        message: impl Into<String>,
        value: T,
    ) -> Result<GivenStmt<'_, T, R>, GiwtError> {
        self.set_given(message.into(), GivenForm::Value(value))?;
        Ok(GivenStmt { case: self })
    }

    /// GIVEN a side effect that produces no state.
    pub fn given_run(
        &mut self,
        message: impl Into<String>,
        setup: impl FnOnce() + 'static,
    ) -> Result<SetupStmt<'_, T, R>, GiwtError> {
        self.set_given(message.into(), GivenForm::Runnable(Box::new(setup)))?;
        Ok(SetupStmt { case: self })
    }

    /// WHEN producing a value without reading any GIVEN state.
    pub fn when(
        &mut self,
        message: impl Into<String>,
        supplier: impl FnOnce() -> R + 'static,
    ) -> Result<WhenStmt<'_, T, R>, GiwtError> {
        let form = WhenForm::Supplier(Box::new(move || captured(supplier)));
        self.set_when(message.into(), form)?;
        Ok(WhenStmt { case: self })
    }

    /// WHEN a fallible supplier; an `Err` is captured like a panic.
    pub fn try_when<E>(
        &mut self,
        message: impl Into<String>,
        supplier: impl FnOnce() -> Result<R, E> + 'static,
    ) -> Result<WhenStmt<'_, T, R>, GiwtError>
    where
        E: Error + Send + Sync + 'static,
    {
        let form = WhenForm::Supplier(Box::new(move || captured_try(supplier)));
        self.set_when(message.into(), form)?;
        Ok(WhenStmt { case: self })
    }

    /// Closes the case and runs every registered statement.
    ///
    /// Fails with [`GiwtError::Closed`] if the case already ran.
    pub fn run(&mut self) -> Result<(), GiwtError> {
        if self.is_closed() {
            return Err(GiwtError::Closed);
        }
        self.lifecycle = Lifecycle::Closed;

        let when = self
            .when
            .take()
            .ok_or(GiwtError::IncompleteChain("no WHEN statement registered"))?;
        if self.then.is_empty() {
            return Err(GiwtError::IncompleteChain("no THEN statement registered"));
        }

        let mut state = match self.given.take() {
            Some(GivenForm::Supplier(supplier)) => Some(supplier()),
            Some(GivenForm::Value(value)) => Some(value),
            Some(GivenForm::Runnable(setup)) => {
                setup();
                None
            }
            None => None,
        };
        for and_given in self.and_given.drain(..) {
            state = state.map(and_given);
        }

        let outcome = match when {
            WhenForm::Supplier(supplier) => supplier(),
            WhenForm::Consumer(consumer) => {
                let state = state
                    .as_ref()
                    .ok_or(GiwtError::IncompleteChain("WHEN statement needs a GIVEN state"))?;
                consumer(state)
            }
            WhenForm::Steps(steps) => run_steps(steps, state.as_ref())?,
        };
        if let Err(error) = &outcome {
            tracing::debug!(test = %self.name, %error, "WHEN raised an error");
        }

        let result = TestCaseResult::new(ResultValue::from(outcome));
        let verdict = self
            .then
            .drain(..)
            .try_for_each(|then| then(&result));
        self.result = Some(result);
        verdict.map_err(GiwtError::from)
    }
}

/// Runs WHEN steps in order; the last step's outcome is the result.
fn run_steps<T, R>(steps: Vec<WhenStep<T, R>>, state: Option<&T>) -> Result<Captured<R>, GiwtError> {
    let mut last = None;
    for step in steps {
        let outcome = match step {
            WhenStep::Map(map) => {
                let state =
                    state.ok_or(GiwtError::IncompleteChain("WHEN statement needs a GIVEN state"))?;
                map(state)
            }
            WhenStep::Run(run) => match (run(), last.take()) {
                (Err(error), _) => Err(error),
                (Ok(()), Some(previous)) => previous,
                (Ok(()), None) => {
                    return Err(GiwtError::IncompleteChain(
                        "a WHEN side effect needs a step before it",
                    ))
                }
            },
        };
        let failed = outcome.is_err();
        last = Some(outcome);
        if failed {
            break;
        }
    }
    last.ok_or(GiwtError::IncompleteChain("no WHEN statement registered"))
}

impl<T: 'static> TestCase<T, ()> {
    /// WHEN a side effect with no value.
    pub fn when_run(
        &mut self,
        message: impl Into<String>,
        action: impl FnOnce() + 'static,
    ) -> Result<WhenStmt<'_, T, ()>, GiwtError> {
        let form = WhenForm::Supplier(Box::new(move || captured(action)));
        self.set_when(message.into(), form)?;
        Ok(WhenStmt { case: self })
    }
}

// ============================================================================
// Statement builders
// ============================================================================

/// Returned by the state producing GIVEN forms.
#[must_use = "a GIVEN statement needs a WHEN and a THEN"]
pub struct GivenStmt<'a, T, R> {
    case: &'a mut TestCase<T, R>,
}

impl<'a, T: 'static, R: 'static> GivenStmt<'a, T, R> {
    /// AND GIVEN: transforms the state.
    pub fn and(self, message: impl Into<String>, f: impl FnOnce(T) -> T + 'static) -> Self {
        self.case.record(Phase::AndGiven, message.into());
        self.case.and_given.push(Box::new(f));
        self
    }

    /// WHEN mapping the state to a value.
    pub fn when(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&T) -> R + 'static,
    ) -> WhenStmt<'a, T, R> {
        let step = WhenStep::Map(Box::new(move |state: &T| captured(|| f(state))));
        self.case
            .install_when(message.into(), WhenForm::Steps(vec![step]));
        WhenStmt { case: self.case }
    }

    pub fn try_when<E>(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&T) -> Result<R, E> + 'static,
    ) -> WhenStmt<'a, T, R>
    where
        E: Error + Send + Sync + 'static,
    {
        let step = WhenStep::Map(Box::new(move |state: &T| captured_try(|| f(state))));
        self.case
            .install_when(message.into(), WhenForm::Steps(vec![step]));
        WhenStmt { case: self.case }
    }
}

impl<'a, T: 'static> GivenStmt<'a, T, ()> {
    /// WHEN consuming the state without producing a value.
    pub fn when_consume(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&T) + 'static,
    ) -> WhenStmt<'a, T, ()> {
        let form = WhenForm::Consumer(Box::new(move |state: &T| captured(|| f(state))));
        self.case.install_when(message.into(), form);
        WhenStmt { case: self.case }
    }

    /// WHEN a side effect that ignores the state.
    pub fn when_run(
        self,
        message: impl Into<String>,
        f: impl FnOnce() + 'static,
    ) -> WhenStmt<'a, T, ()> {
        let step = WhenStep::Map(Box::new(move |_: &T| captured(f)));
        self.case
            .install_when(message.into(), WhenForm::Steps(vec![step]));
        WhenStmt { case: self.case }
    }
}

/// Returned by [`TestCase::given_run`]: there is no state to read.
#[must_use = "a GIVEN statement needs a WHEN and a THEN"]
pub struct SetupStmt<'a, T, R> {
    case: &'a mut TestCase<T, R>,
}

impl<'a, T: 'static, R: 'static> SetupStmt<'a, T, R> {
    pub fn when(
        self,
        message: impl Into<String>,
        supplier: impl FnOnce() -> R + 'static,
    ) -> WhenStmt<'a, T, R> {
        let form = WhenForm::Supplier(Box::new(move || captured(supplier)));
        self.case.install_when(message.into(), form);
        WhenStmt { case: self.case }
    }

    pub fn try_when<E>(
        self,
        message: impl Into<String>,
        supplier: impl FnOnce() -> Result<R, E> + 'static,
    ) -> WhenStmt<'a, T, R>
    where
        E: Error + Send + Sync + 'static,
    {
        let form = WhenForm::Supplier(Box::new(move || captured_try(supplier)));
        self.case.install_when(message.into(), form);
        WhenStmt { case: self.case }
    }
}

impl<'a, T: 'static> SetupStmt<'a, T, ()> {
    pub fn when_run(
        self,
        message: impl Into<String>,
        action: impl FnOnce() + 'static,
    ) -> WhenStmt<'a, T, ()> {
        let form = WhenForm::Supplier(Box::new(move || captured(action)));
        self.case.install_when(message.into(), form);
        WhenStmt { case: self.case }
    }
}

/// Returned by every WHEN form; THEN follows.
#[must_use = "a WHEN statement needs a THEN"]
pub struct WhenStmt<'a, T, R> {
    case: &'a mut TestCase<T, R>,
}

impl<'a, T: 'static, R: 'static> WhenStmt<'a, T, R> {
    /// Adds a state-mapping step after a state-reading WHEN. The steps run in
    /// order and the last one decides the result; an error stops the steps.
    ///
    /// Fails with [`GiwtError::DuplicateStatement`] after a supplier or
    /// consumer WHEN.
    pub fn and_when(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&T) -> R + 'static,
    ) -> Result<Self, GiwtError> {
        let step = WhenStep::Map(Box::new(move |state: &T| captured(|| f(state))));
        self.case.push_when_step(message.into(), step)?;
        Ok(self)
    }

    /// Adds a side-effect step; the result of the step before it stays the
    /// result unless the side effect fails.
    pub fn and_when_run(
        self,
        message: impl Into<String>,
        f: impl FnOnce() + 'static,
    ) -> Result<Self, GiwtError> {
        let step = WhenStep::Run(Box::new(move || captured(f)));
        self.case.push_when_step(message.into(), step)?;
        Ok(self)
    }

    pub fn then<V: Verdict>(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&TestCaseResult<R>) -> V + 'static,
    ) -> ThenStmt<'a, T, R> {
        let then: ThenFn<R> = Box::new(move |result| f(result).into_verdict());
        self.case.push_then(Phase::Then, message.into(), then);
        ThenStmt { case: self.case }
    }
}

/// Returned by `then`; further checks are added with `and`.
pub struct ThenStmt<'a, T, R> {
    case: &'a mut TestCase<T, R>,
}

impl<'a, T: 'static, R: 'static> ThenStmt<'a, T, R> {
    pub fn and<V: Verdict>(
        self,
        message: impl Into<String>,
        f: impl FnOnce(&TestCaseResult<R>) -> V + 'static,
    ) -> Self {
        let then: ThenFn<R> = Box::new(move |result| f(result).into_verdict());
        self.case.push_then(Phase::AndThen, message.into(), then);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::{Expectation, ExpectedToBe, ExpectedToFail};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct IllegalState(String);

    #[test]
    fn runs_given_and_when_then_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        let mut tc: TestCase<i32, i32> = TestCase::new("ordered");
        tc.given("one", move || {
            l1.borrow_mut().push("given");
            1
        })
        .unwrap()
        .and("plus one", move |v| {
            l2.borrow_mut().push("and");
            v + 1
        })
        .when("doubled", move |v| {
            l3.borrow_mut().push("when");
            v * 2
        })
        .then("is 4", move |r| {
            l4.borrow_mut().push("then");
            r.should_be(ExpectedToBe::equal_to(4)).verify()
        });
        tc.run().unwrap();
        assert_eq!(*log.borrow(), vec!["given", "and", "when", "then"]);
    }

    #[test]
    fn second_run_fails_closed() {
        let mut tc: TestCase<(), i32> = TestCase::new("once");
        tc.when("five", || 5).unwrap().then("ok", |_| ());
        tc.run().unwrap();
        assert!(matches!(tc.run(), Err(GiwtError::Closed)));
        assert!(matches!(tc.when("again", || 1), Err(GiwtError::Closed)));
    }

    #[test]
    fn when_errors_are_captured_for_then() {
        let mut tc: TestCase<(), i32> = TestCase::new("captures");
        tc.try_when("failing", || Err::<i32, _>(IllegalState("boom".into())))
            .unwrap()
            .then("fails with boom", |r| {
                r.should_fail()
                    .and(ExpectedToFail::with_message("boom"))
                    .verify()
            });
        tc.run().unwrap();
        assert!(tc.result().unwrap().value().is_err());
    }

    #[test]
    fn when_panics_are_captured_for_then() {
        let mut tc: TestCase<i32, i32> = TestCase::new("panics");
        tc.given_value("zero", 0)
            .unwrap()
            .when("dividing", |v| {
                if *v == 0 {
                    panic!("division by zero");
                }
                10 / v
            })
            .then("fails", |r| {
                r.should_fail()
                    .and(ExpectedToFail::with_message("division by zero"))
                    .verify()
            });
        tc.run().unwrap();
    }

    #[test]
    fn then_failure_is_returned_from_run() {
        let mut tc: TestCase<(), i32> = TestCase::new("mismatch");
        tc.when("three", || 3)
            .unwrap()
            .then("is four", |r| r.should_be(ExpectedToBe::equal_to(4)).verify());
        let err = tc.run().unwrap_err();
        assert_eq!(err.to_string(), "Expected value to be <4> but got <3>");
    }

    #[test]
    fn given_after_when_is_rejected() {
        let mut tc: TestCase<i32, i32> = TestCase::new("order");
        tc.when("three", || 3).unwrap().then("ok", |_| ());
        assert!(matches!(
            tc.given("late", || 1),
            Err(GiwtError::StatementOrder {
                phase: Phase::Given,
                after: Phase::Then
            })
        ));
    }

    #[test]
    fn missing_then_is_an_incomplete_chain() {
        let mut tc: TestCase<(), i32> = TestCase::new("incomplete");
        let _ = tc.when("three", || 3).unwrap();
        assert!(matches!(tc.run(), Err(GiwtError::IncompleteChain(_))));
    }

    #[test]
    fn steps_stop_at_first_error() {
        let reached = Rc::new(RefCell::new(false));
        let flag = reached.clone();
        let mut tc: TestCase<i32, i32> = TestCase::new("steps");
        tc.given_value("two", 2)
            .unwrap()
            .when("first", |v| v + 1)
            .and_when("second", |_| -> i32 { panic!("stop") })
            .unwrap()
            .and_when("third", move |v| {
                *flag.borrow_mut() = true;
                *v
            })
            .unwrap()
            .then("fails", |r| r.should_fail().verify());
        tc.run().unwrap();
        assert!(!*reached.borrow());
    }

    #[test]
    fn side_effect_steps_keep_the_previous_result() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let mut tc: TestCase<i32, i32> = TestCase::new("steps");
        tc.given_value("two", 2)
            .unwrap()
            .when("tripled", |v| v * 3)
            .and_when_run("logged", move || log.borrow_mut().push("logged"))
            .unwrap()
            .then("is 6", |r| r.should_be(ExpectedToBe::equal_to(6)).verify());
        tc.run().unwrap();
        assert_eq!(*calls.borrow(), vec!["logged"]);
        assert!(matches!(tc.result().unwrap().value(), ResultValue::Ok(6)));
    }

    #[test]
    fn a_failing_side_effect_step_fails_the_result() {
        let mut tc: TestCase<i32, i32> = TestCase::new("steps");
        tc.given_value("two", 2)
            .unwrap()
            .when("tripled", |v| v * 3)
            .and_when_run("breaks", || panic!("disk full"))
            .unwrap()
            .then("fails", |r| {
                r.should_fail()
                    .and(ExpectedToFail::with_message("disk full"))
                    .verify()
            });
        tc.run().unwrap();
        assert!(tc.result().unwrap().value().error().is_ok());
    }

    #[test]
    fn and_when_after_supplier_is_rejected() {
        let mut tc: TestCase<i32, i32> = TestCase::new("supplier");
        let stmt = tc.when("three", || 3).unwrap();
        assert!(matches!(
            stmt.and_when("more", |v| *v),
            Err(GiwtError::DuplicateStatement(Phase::When))
        ));
    }

    #[test]
    fn statements_are_recorded_with_prefixes() {
        let mut tc: TestCase<(), ()> = TestCase::new("setup");
        tc.given_run("a clean slate", || ())
            .unwrap()
            .when_run("nothing happens", || ())
            .then("it succeeds", |r| r.should_succeed().verify())
            .and("still succeeds", |r| {
                ExpectedToBe::equal_to(()).verify(r.result_value()?)
            });
        tc.run().unwrap();
        let rendered: Vec<String> = tc.statements().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "GIVEN a clean slate",
                "WHEN nothing happens",
                "THEN it succeeds",
                "AND still succeeds"
            ]
        );
    }
}
