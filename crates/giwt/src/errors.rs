use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

use crate::statement::Phase;

/// Umbrella error returned by test bodies, the statement chain and the engine.
#[derive(Debug, Error)]
pub enum GiwtError {
    #[error("test case already closed")]
    Closed,
    #[error("{phase} statement cannot follow a {after} statement")]
    StatementOrder { phase: Phase, after: Phase },
    #[error("{0} statement already registered")]
    DuplicateStatement(Phase),
    #[error("incomplete statement chain: {0}")]
    IncompleteChain(&'static str),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// A failed expectation: what was expected and what was observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExpectationError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl ExpectationError {
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ExpectationError {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Message followed by the expected and actual lines.
    pub fn details(&self) -> String {
        format!(
            "{}\n      Expected : {}\n      Actual :   {}",
            self.message, self.expected, self.actual
        )
    }
}

/// The operation a dynamic value could not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Size,
    Contains,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Size => f.write_str("size"),
            Operation::Contains => f.write_str("item lookup"),
        }
    }
}

/// Failure of a single verification step of a test unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Mismatch(#[from] ExpectationError),
    #[error("Expected to succeed but got an error <{error}>")]
    ExpectedSuccess { error: String },
    #[error("Expected to fail but got a result <{value}>")]
    ExpectedFailure { value: String },
    #[error("Value <{value}> is not comparable")]
    NotComparable { value: String },
    #[error("Value <{value}> does not support {operation}")]
    Unsupported { operation: Operation, value: String },
    #[error(transparent)]
    ResultValue(#[from] ResultValueError),
}

impl VerificationError {
    /// Expected side of the failure, when the failure has one.
    pub fn expected(&self) -> Option<&str> {
        match self {
            VerificationError::Mismatch(e) => Some(&e.expected),
            VerificationError::ExpectedSuccess { .. } => Some("success"),
            VerificationError::ExpectedFailure { .. } => Some("failure"),
            _ => None,
        }
    }

    /// Observed side of the failure, when the failure has one.
    pub fn actual(&self) -> Option<&str> {
        match self {
            VerificationError::Mismatch(e) => Some(&e.actual),
            VerificationError::ExpectedSuccess { error } => Some(error),
            VerificationError::ExpectedFailure { value } => Some(value),
            VerificationError::NotComparable { value }
            | VerificationError::Unsupported { value, .. } => Some(value),
            VerificationError::ResultValue(_) => None,
        }
    }
}

/// Reading the wrong variant out of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResultValueError {
    #[error("Expected value failed")]
    ExpectedValueFailed,
    #[error("Expected error failed")]
    ExpectedErrorFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDefect {
    Abstract,
    Private,
}

impl Display for ClassDefect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClassDefect::Abstract => f.write_str("is abstract"),
            ClassDefect::Private => f.write_str("is private"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodDefect {
    Static,
    Abstract,
    Private,
    NotExactlyOneArg,
    BadArgType,
    NotReturningUnit,
}

impl Display for MethodDefect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MethodDefect::Static => f.write_str("is static"),
            MethodDefect::Abstract => f.write_str("is abstract"),
            MethodDefect::Private => f.write_str("is private"),
            MethodDefect::NotExactlyOneArg => f.write_str("does not take exactly one argument"),
            MethodDefect::BadArgType => f.write_str("does not take a test case argument"),
            MethodDefect::NotReturningUnit => f.write_str("does not return unit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterizedDefect {
    Static,
    Abstract,
    Private,
    NotReturningUnit,
    EmptySource,
    NotMoreThanOneArg,
    BadFirstArgType,
    BadArgsNumber { expected: usize, found: usize },
    BadArgsTypes { expected: Vec<String>, found: Vec<String> },
}

impl Display for ParameterizedDefect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParameterizedDefect::Static => f.write_str("is static"),
            ParameterizedDefect::Abstract => f.write_str("is abstract"),
            ParameterizedDefect::Private => f.write_str("is private"),
            ParameterizedDefect::NotReturningUnit => f.write_str("does not return unit"),
            ParameterizedDefect::EmptySource => f.write_str("has an empty parameter source"),
            ParameterizedDefect::NotMoreThanOneArg => {
                f.write_str("does not take more than one argument")
            }
            ParameterizedDefect::BadFirstArgType => {
                f.write_str("does not take a test case as first argument")
            }
            ParameterizedDefect::BadArgsNumber { expected, found } => write!(
                f,
                "takes {found} parameter arguments but its source provides {expected}"
            ),
            ParameterizedDefect::BadArgsTypes { expected, found } => write!(
                f,
                "takes ({}) but its source provides ({})",
                found.join(", "),
                expected.join(", ")
            ),
        }
    }
}

/// Names reported by [`DefinitionError::DuplicateTestNames`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNames(pub Vec<String>);

impl Display for TestNames {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let quoted = self
            .0
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<String>>();
        write!(f, "[ {} ]", quoted.join(", "))
    }
}

/// A test class or method that cannot be turned into runnable units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Test class `{class}` {reason}")]
    TestClass { class: String, reason: ClassDefect },
    #[error("Test method `{method}` {reason}")]
    TestMethod { method: String, reason: MethodDefect },
    #[error("Parameterized test method `{method}` {reason}")]
    ParameterizedTest {
        method: String,
        reason: ParameterizedDefect,
    },
    #[error("No parameter source with name `{0}` found")]
    NoParameterSource(String),
    #[error("Multiple parameter sources found with same name `{0}`")]
    MultipleParameterSources(String),
    #[error("Following test names : {0} are duplicated.")]
    DuplicateTestNames(TestNames),
}

/// Every definition error collected during one discovery pass.
#[derive(Debug, Error)]
pub struct DefinitionErrors(pub Vec<DefinitionError>);

impl Display for DefinitionErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let lines = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>();
        f.write_str(&lines.join("\n"))
    }
}

/// Failure to hand a finished report to its sink.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error when writing report to `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error serializing report {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_listed_quoted() {
        let err = DefinitionError::DuplicateTestNames(TestNames(vec![
            "checkout".to_string(),
            "refund".to_string(),
        ]));
        assert_eq!(
            err.to_string(),
            "Following test names : [ 'checkout', 'refund' ] are duplicated."
        );
    }

    #[test]
    fn mismatch_exposes_expected_and_actual() {
        let err = VerificationError::from(ExpectationError::new("nope", "4", "3"));
        assert_eq!(err.expected(), Some("4"));
        assert_eq!(err.actual(), Some("3"));
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn verification_converts_into_umbrella_error() {
        let err: GiwtError = VerificationError::from(ResultValueError::ExpectedValueFailed).into();
        assert!(matches!(
            err,
            GiwtError::Verification(VerificationError::ResultValue(_))
        ));
        assert_eq!(err.to_string(), "Expected value failed");
    }
}
