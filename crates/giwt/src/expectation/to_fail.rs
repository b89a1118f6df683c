use std::error::Error;

use super::{sealed, Expectation, Name};
use crate::errors::{ExpectationError, VerificationError};
use crate::result::{short_type_name, CapturedError};

/// Expectations about an error captured from WHEN.
#[derive(Debug, Clone)]
pub enum ExpectedToFail {
    WithType {
        type_name: &'static str,
        matches: fn(&CapturedError) -> bool,
    },
    WithMessage(String),
}

fn is_type<E: Error + 'static>(error: &CapturedError) -> bool {
    error.is::<E>()
}

impl ExpectedToFail {
    pub fn with_type<E: Error + 'static>() -> Self {
        ExpectedToFail::WithType {
            type_name: short_type_name(std::any::type_name::<E>()),
            matches: is_type::<E>,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        ExpectedToFail::WithMessage(message.into())
    }
}

impl sealed::Sealed for ExpectedToFail {}

impl Expectation<CapturedError> for ExpectedToFail {
    fn name(&self) -> Name {
        match self {
            ExpectedToFail::WithType { type_name, .. } => {
                Name::Value(format!("Expected to fail with type {type_name}"))
            }
            ExpectedToFail::WithMessage(message) => {
                Name::Value(format!("Expected to fail with message {message}"))
            }
        }
    }

    fn verify(&self, input: &CapturedError) -> Result<(), VerificationError> {
        match self {
            ExpectedToFail::WithType { type_name, matches } if !matches(input) => {
                Err(ExpectationError::new(
                    format!(
                        "Expected error to be of type <{type_name}> but got <{}>",
                        input.type_name()
                    ),
                    *type_name,
                    input.type_name(),
                )
                .into())
            }
            ExpectedToFail::WithMessage(message) if input.message() != message => {
                Err(ExpectationError::new(
                    format!(
                        "Expected error message to be <{message}> but got <{}>",
                        input.message()
                    ),
                    message.as_str(),
                    input.message(),
                )
                .into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Panicked;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct IllegalState(String);

    #[test]
    fn type_mismatch_names_both_types() {
        let captured = CapturedError::new(IllegalState("boom".into()));
        let err = ExpectedToFail::with_type::<Panicked>()
            .verify(&captured)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected error to be of type <Panicked> but got <IllegalState>"
        );
    }

    #[test]
    fn message_must_match_exactly() {
        let captured = CapturedError::new(IllegalState("boom".into()));
        assert!(ExpectedToFail::with_message("boom").verify(&captured).is_ok());
        assert!(ExpectedToFail::with_message("bo").verify(&captured).is_err());
    }

    #[test]
    fn panics_are_captured_as_panicked() {
        let captured = CapturedError::from(Panicked {
            message: "boom".into(),
            location: None,
        });
        assert!(ExpectedToFail::with_type::<Panicked>().verify(&captured).is_ok());
    }
}
