//! The value or failure produced by a WHEN statement.

use std::error::Error;
use std::fmt;

use crate::capture::Panicked;
use crate::errors::ResultValueError;

/// An error captured from WHEN code, either returned or raised by a panic.
#[derive(Debug)]
pub struct CapturedError {
    type_name: &'static str,
    message: String,
    source: Box<dyn Error + Send + Sync + 'static>,
}

impl CapturedError {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        CapturedError {
            type_name: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
            source: Box::new(error),
        }
    }

    /// Short name of the captured error type, e.g. `Panicked`.
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is<E: Error + 'static>(&self) -> bool {
        self.source.downcast_ref::<E>().is_some()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    pub fn source_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

impl From<Panicked> for CapturedError {
    fn from(panicked: Panicked) -> Self {
        CapturedError::new(panicked)
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}('{}')", self.type_name, self.message)
    }
}

/// Strips the module path of every segment of a type name, keeping generics.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    match full.find('<') {
        Some(generic) => {
            let head = &full[..generic];
            match head.rfind("::") {
                Some(pos) => &full[pos + 2..],
                None => full,
            }
        }
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

/// Either the value produced by WHEN or the error it raised.
#[derive(Debug)]
pub enum ResultValue<R> {
    Ok(R),
    Err(CapturedError),
}

impl<R> ResultValue<R> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResultValue::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        matches!(self, ResultValue::Err(_))
    }

    pub fn value(&self) -> Result<&R, ResultValueError> {
        match self {
            ResultValue::Ok(value) => Ok(value),
            ResultValue::Err(_) => Err(ResultValueError::ExpectedValueFailed),
        }
    }

    pub fn error(&self) -> Result<&CapturedError, ResultValueError> {
        match self {
            ResultValue::Ok(_) => Err(ResultValueError::ExpectedErrorFailed),
            ResultValue::Err(error) => Ok(error),
        }
    }
}

impl<R> From<Result<R, CapturedError>> for ResultValue<R> {
    fn from(result: Result<R, CapturedError>) -> Self {
        match result {
            Ok(value) => ResultValue::Ok(value),
            Err(error) => ResultValue::Err(error),
        }
    }
}

/// Result handed to every THEN statement of a test case.
#[derive(Debug)]
pub struct TestCaseResult<R> {
    value: ResultValue<R>,
}

impl<R> TestCaseResult<R> {
    pub fn new(value: ResultValue<R>) -> Self {
        TestCaseResult { value }
    }

    pub fn ok(value: R) -> Self {
        TestCaseResult::new(ResultValue::Ok(value))
    }

    pub fn err(error: CapturedError) -> Self {
        TestCaseResult::new(ResultValue::Err(error))
    }

    pub fn value(&self) -> &ResultValue<R> {
        &self.value
    }

    /// The produced value; fails if WHEN raised an error.
    pub fn result_value(&self) -> Result<&R, ResultValueError> {
        self.value.value()
    }

    /// The captured error; fails if WHEN produced a value.
    pub fn result_error(&self) -> Result<&CapturedError, ResultValueError> {
        self.value.error()
    }
}
