//! Composable expectations over WHEN results.
//!
//! Expectations are immutable values. They are grouped into four sealed
//! families: [`ExpectedToBe`], [`ExpectedToHave`] and [`ExpectedToMatch`]
//! inspect a produced value, [`ExpectedToFail`] inspects a captured error.
//! A [`TestCaseResult`] is verified by starting a chain with one of the
//! `should_*` methods and extending it with `and`; the first failing step
//! sticks and the remaining steps are not evaluated.
//!
//! ```rust
//! use giwt::prelude::*;
//!
//! let result = TestCaseResult::ok(vec![1, 2, 3]);
//! result
//!     .should_have(ExpectedToHave::size(3))
//!     .and(ExpectedToHave::an_item_equal_to(2))
//!     .and(ExpectedToMatch::one(matching("starts at one", |v: &Vec<i32>| v[0] == 1)))
//!     .verify()
//!     .unwrap();
//! ```

mod to_be;
mod to_fail;
mod to_have;
mod to_match;

use std::fmt::{self, Debug};

pub use to_be::{ExpectedToBe, Shared, ToBe};
pub use to_fail::ExpectedToFail;
pub use to_have::{ExpectedToHave, Measurable, Searchable, ToHave};
pub use to_match::{matching, ExpectedToMatch, Matching};

use crate::errors::VerificationError;
use crate::result::{CapturedError, ResultValue, TestCaseResult};

mod sealed {
    pub trait Sealed {}
}

/// Label of an expectation; composites have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Name {
    Value(String),
    None,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Value(label) => f.write_str(label),
            Name::None => Ok(()),
        }
    }
}

/// A named check over an input of type `I`.
pub trait Expectation<I: ?Sized>: sealed::Sealed {
    fn name(&self) -> Name;

    fn verify(&self, input: &I) -> Result<(), VerificationError>;

    /// Verifies and emits the verdict as a trace event.
    fn check(&self, input: &I) -> Result<(), VerificationError> {
        let verdict = self.verify(input);
        if let Name::Value(label) = self.name() {
            match &verdict {
                Ok(()) => tracing::debug!(expectation = %label, "✔"),
                Err(error) => tracing::debug!(expectation = %label, %error, "✘"),
            }
        }
        verdict
    }
}

/// Expectations that inspect a produced value.
pub enum OnValue<T> {
    ToBe(ExpectedToBe<T>),
    ToHave(ExpectedToHave<T>),
    ToMatch(ExpectedToMatch<T>),
}

impl<T> sealed::Sealed for OnValue<T> {}

impl<T> Expectation<T> for OnValue<T> {
    fn name(&self) -> Name {
        match self {
            OnValue::ToBe(e) => e.name(),
            OnValue::ToHave(e) => e.name(),
            OnValue::ToMatch(e) => e.name(),
        }
    }

    fn verify(&self, input: &T) -> Result<(), VerificationError> {
        match self {
            OnValue::ToBe(e) => e.verify(input),
            OnValue::ToHave(e) => e.verify(input),
            OnValue::ToMatch(e) => e.verify(input),
        }
    }
}

impl<T> From<ExpectedToBe<T>> for OnValue<T> {
    fn from(e: ExpectedToBe<T>) -> Self {
        OnValue::ToBe(e)
    }
}

impl<T> From<ExpectedToHave<T>> for OnValue<T> {
    fn from(e: ExpectedToHave<T>) -> Self {
        OnValue::ToHave(e)
    }
}

impl<T> From<ExpectedToMatch<T>> for OnValue<T> {
    fn from(e: ExpectedToMatch<T>) -> Self {
        OnValue::ToMatch(e)
    }
}

// ============================================================================
// Verification chains
// ============================================================================

/// Chain of value expectations started by [`TestCaseResult::should_succeed`].
#[must_use = "a verification chain does nothing until `verify` is called"]
pub struct ValueChain<'r, T> {
    value: Option<&'r T>,
    failure: Option<VerificationError>,
}

impl<'r, T> ValueChain<'r, T> {
    pub fn and(mut self, expectation: impl Into<OnValue<T>>) -> Self {
        if self.failure.is_some() {
            return self;
        }
        if let Some(value) = self.value {
            if let Err(error) = expectation.into().check(value) {
                self.failure = Some(error);
            }
        }
        self
    }

    pub fn verify(self) -> Result<(), VerificationError> {
        self.verify_and_get().map(|_| ())
    }

    /// Verifies the chain and hands back the checked value.
    pub fn verify_and_get(self) -> Result<&'r T, VerificationError> {
        match (self.failure, self.value) {
            (Some(error), _) => Err(error),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(crate::errors::ResultValueError::ExpectedValueFailed.into()),
        }
    }
}

/// Chain of failure expectations started by [`TestCaseResult::should_fail`].
#[must_use = "a verification chain does nothing until `verify` is called"]
pub struct FailureChain<'r> {
    error: Option<&'r CapturedError>,
    failure: Option<VerificationError>,
}

impl<'r> FailureChain<'r> {
    pub fn and(mut self, expectation: ExpectedToFail) -> Self {
        if self.failure.is_some() {
            return self;
        }
        if let Some(error) = self.error {
            if let Err(failure) = expectation.check(error) {
                self.failure = Some(failure);
            }
        }
        self
    }

    pub fn verify(self) -> Result<(), VerificationError> {
        self.verify_and_get().map(|_| ())
    }

    pub fn verify_and_get(self) -> Result<&'r CapturedError, VerificationError> {
        match (self.failure, self.error) {
            (Some(failure), _) => Err(failure),
            (None, Some(error)) => Ok(error),
            (None, None) => Err(crate::errors::ResultValueError::ExpectedErrorFailed.into()),
        }
    }
}

impl<R: Debug> TestCaseResult<R> {
    pub fn should_succeed(&self) -> ValueChain<'_, R> {
        match self.value() {
            ResultValue::Ok(value) => ValueChain {
                value: Some(value),
                failure: None,
            },
            ResultValue::Err(error) => ValueChain {
                value: None,
                failure: Some(VerificationError::ExpectedSuccess {
                    error: error.to_string(),
                }),
            },
        }
    }

    pub fn should_fail(&self) -> FailureChain<'_> {
        match self.value() {
            ResultValue::Ok(value) => FailureChain {
                error: None,
                failure: Some(VerificationError::ExpectedFailure {
                    value: format!("{value:?}"),
                }),
            },
            ResultValue::Err(error) => FailureChain {
                error: Some(error),
                failure: None,
            },
        }
    }

    pub fn should_be(&self, expectation: ExpectedToBe<R>) -> ValueChain<'_, R> {
        self.should_succeed().and(expectation)
    }

    pub fn should_have(&self, expectation: ExpectedToHave<R>) -> ValueChain<'_, R> {
        self.should_succeed().and(expectation)
    }

    pub fn should_match(&self, expectation: ExpectedToMatch<R>) -> ValueChain<'_, R> {
        self.should_succeed().and(expectation)
    }
}

/// Anything a THEN statement may return.
pub trait Verdict {
    fn into_verdict(self) -> Result<(), VerificationError>;
}

impl Verdict for () {
    fn into_verdict(self) -> Result<(), VerificationError> {
        Ok(())
    }
}

impl<E: Into<VerificationError>> Verdict for Result<(), E> {
    fn into_verdict(self) -> Result<(), VerificationError> {
        self.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExpectationError;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct IllegalState(String);

    fn failed() -> TestCaseResult<i32> {
        TestCaseResult::err(CapturedError::new(IllegalState("boom".into())))
    }

    #[test]
    fn should_succeed_on_error_cites_the_error() {
        let err = failed().should_succeed().verify().unwrap_err();
        assert!(matches!(err, VerificationError::ExpectedSuccess { .. }));
        assert!(err.to_string().contains("boom"), "{err}");
    }

    #[test]
    fn should_fail_on_value_cites_the_value() {
        let err = TestCaseResult::ok(7).should_fail().verify().unwrap_err();
        assert_eq!(err.to_string(), "Expected to fail but got a result <7>");
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let evaluated = Rc::new(Cell::new(false));
        let flag = evaluated.clone();
        let result = TestCaseResult::ok(3);
        let err = result
            .should_be(ExpectedToBe::equal_to(4))
            .and(ExpectedToMatch::one(matching("never reached", move |_: &i32| {
                flag.set(true);
                true
            })))
            .verify()
            .unwrap_err();
        assert!(!evaluated.get());
        assert_eq!(
            err,
            VerificationError::Mismatch(ExpectationError::new(
                "Expected value to be <4> but got <3>",
                "4",
                "3"
            ))
        );
    }

    #[test]
    fn failure_chain_checks_message() {
        failed()
            .should_fail()
            .and(ExpectedToFail::with_message("boom"))
            .and(ExpectedToFail::with_type::<IllegalState>())
            .verify()
            .unwrap();
    }

    #[test]
    fn verify_and_get_returns_the_value() {
        let result = TestCaseResult::ok("abc".to_string());
        let value = result
            .should_have(ExpectedToHave::size(3))
            .verify_and_get()
            .unwrap();
        assert_eq!(value, "abc");
    }

    #[test]
    fn verdicts_from_unit_and_results() {
        assert_eq!(().into_verdict(), Ok(()));
        let err: Result<(), crate::errors::ResultValueError> =
            Err(crate::errors::ResultValueError::ExpectedErrorFailed);
        assert!(err.into_verdict().is_err());
    }
}
