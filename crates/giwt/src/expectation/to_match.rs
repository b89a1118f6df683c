use std::rc::Rc;

use super::{sealed, Expectation, Name};
use crate::errors::{ExpectationError, VerificationError};

/// A described predicate.
pub struct Matching<T> {
    description: String,
    predicate: Rc<dyn Fn(&T) -> bool>,
}

impl<T> Clone for Matching<T> {
    fn clone(&self) -> Self {
        Matching {
            description: self.description.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

impl<T: 'static> Matching<T> {
    fn negate(self) -> Self {
        let predicate = self.predicate;
        Matching {
            description: format!("not ({})", self.description),
            predicate: Rc::new(move |value: &T| !predicate(value)),
        }
    }
}

impl<T> Matching<T> {
    pub fn description(&self) -> &str {
        &self.description
    }

    fn verify(&self, value: &T) -> Result<(), VerificationError> {
        if (self.predicate)(value) {
            Ok(())
        } else {
            Err(ExpectationError::new(
                format!("Matching <{}> failed", self.description),
                self.description.clone(),
                format!("not ({})", self.description),
            )
            .into())
        }
    }
}

/// Builds a [`Matching`] from a description and a predicate.
pub fn matching<T>(
    description: impl Into<String>,
    predicate: impl Fn(&T) -> bool + 'static,
) -> Matching<T> {
    Matching {
        description: description.into(),
        predicate: Rc::new(predicate),
    }
}

/// Predicate-based expectations.
pub enum ExpectedToMatch<T> {
    One(Matching<T>),
    /// Every predicate must hold; stops at the first that does not.
    All(Vec<Matching<T>>),
    /// No predicate may hold; stops at the first that does.
    None(Vec<Matching<T>>),
}

impl<T: 'static> ExpectedToMatch<T> {
    pub fn one(matching: Matching<T>) -> Self {
        ExpectedToMatch::One(matching)
    }

    pub fn all(matchings: impl IntoIterator<Item = Matching<T>>) -> Self {
        ExpectedToMatch::All(matchings.into_iter().collect())
    }

    pub fn none(matchings: impl IntoIterator<Item = Matching<T>>) -> Self {
        ExpectedToMatch::None(matchings.into_iter().map(Matching::negate).collect())
    }
}

#[cfg(feature = "googletest")]
impl<T: std::fmt::Debug + 'static> ExpectedToMatch<T> {
    /// Adapts a googletest matcher into a single predicate.
    pub fn satisfies<M>(matcher: M) -> Self
    where
        M: for<'a> googletest::matcher::Matcher<&'a T> + 'static,
    {
        let description = matcher
            .describe(googletest::matcher::MatcherResult::Match)
            .to_string();
        ExpectedToMatch::One(Matching {
            description,
            predicate: Rc::new(move |value: &T| matcher.matches(value).is_match()),
        })
    }
}

impl<T> sealed::Sealed for ExpectedToMatch<T> {}

impl<T> Expectation<T> for ExpectedToMatch<T> {
    fn name(&self) -> Name {
        match self {
            ExpectedToMatch::One(m) if m.description.trim().is_empty() => {
                Name::Value("Expected to match one condition".to_string())
            }
            ExpectedToMatch::One(m) => Name::Value(m.description.clone()),
            ExpectedToMatch::All(_) | ExpectedToMatch::None(_) => Name::None,
        }
    }

    fn verify(&self, input: &T) -> Result<(), VerificationError> {
        match self {
            ExpectedToMatch::One(m) => m.verify(input),
            ExpectedToMatch::All(ms) | ExpectedToMatch::None(ms) => ms
                .iter()
                .try_for_each(|m| ExpectedToMatch::One(m.clone()).check(input)),
        }
    }
}
