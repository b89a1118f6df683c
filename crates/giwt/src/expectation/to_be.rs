use std::cmp::Ordering;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::Arc;

use super::{sealed, Expectation, Name};
use crate::errors::{ExpectationError, VerificationError};

type Check<T> = Box<dyn Fn(&T) -> Result<(), VerificationError>>;

/// The kind of an [`ExpectedToBe`], with its operands rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToBe {
    Null,
    NotNull,
    EqualTo { expected: String },
    NotEqualTo { expected: String },
    SameAs { expected: String },
    Between { min: String, max: String },
    GreaterThan { min: String },
    LessThan { max: String },
}

/// Expectations about the identity, equality or ordering of a value.
pub struct ExpectedToBe<T> {
    kind: ToBe,
    check: Check<T>,
}

impl<T> ExpectedToBe<T> {
    pub fn kind(&self) -> &ToBe {
        &self.kind
    }
}

impl<T> sealed::Sealed for ExpectedToBe<T> {}

impl<T> Expectation<T> for ExpectedToBe<T> {
    fn name(&self) -> Name {
        let label = match &self.kind {
            ToBe::Null => "Expected to be null".to_string(),
            ToBe::NotNull => "Expected not to be null".to_string(),
            ToBe::EqualTo { expected } => format!("Expected to be equal to {expected}"),
            ToBe::NotEqualTo { expected } => format!("Expected to be different from {expected}"),
            ToBe::SameAs { expected } => format!("Expected to be the same as {expected}"),
            ToBe::Between { min, max } => format!("Expected to be between {min} and {max}"),
            ToBe::GreaterThan { min } => format!("Expected to be greater than {min}"),
            ToBe::LessThan { max } => format!("Expected to be less than {max}"),
        };
        Name::Value(label)
    }

    fn verify(&self, input: &T) -> Result<(), VerificationError> {
        (self.check)(input)
    }
}

fn mismatch(message: String, expected: String, actual: String) -> VerificationError {
    ExpectationError::new(message, expected, actual).into()
}

fn compare<T: PartialOrd + Debug>(value: &T, bound: &T) -> Result<Ordering, VerificationError> {
    value
        .partial_cmp(bound)
        .ok_or_else(|| VerificationError::NotComparable {
            value: format!("{value:?}"),
        })
}

impl<U: Debug + 'static> ExpectedToBe<Option<U>> {
    pub fn null() -> Self {
        ExpectedToBe {
            kind: ToBe::Null,
            check: Box::new(|value: &Option<U>| match value {
                None => Ok(()),
                Some(v) => Err(mismatch(
                    format!("Expected <null> but got <{v:?}>"),
                    "null".to_string(),
                    format!("{v:?}"),
                )),
            }),
        }
    }

    pub fn not_null() -> Self {
        ExpectedToBe {
            kind: ToBe::NotNull,
            check: Box::new(|value: &Option<U>| match value {
                Some(_) => Ok(()),
                None => Err(mismatch(
                    "Expected not null value but got <null>".to_string(),
                    "!= null".to_string(),
                    "null".to_string(),
                )),
            }),
        }
    }
}

impl<T: PartialEq + Debug + 'static> ExpectedToBe<T> {
    pub fn equal_to(expected: T) -> Self {
        let rendered = format!("{expected:?}");
        ExpectedToBe {
            kind: ToBe::EqualTo {
                expected: rendered.clone(),
            },
            check: Box::new(move |value: &T| {
                if *value == expected {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("Expected value to be <{rendered}> but got <{value:?}>"),
                        rendered.clone(),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }

    pub fn not_equal_to(expected: T) -> Self {
        let rendered = format!("{expected:?}");
        ExpectedToBe {
            kind: ToBe::NotEqualTo {
                expected: rendered.clone(),
            },
            check: Box::new(move |value: &T| {
                if *value != expected {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("Expected value to be different from <{rendered}> but got <{value:?}>"),
                        format!("!= {rendered}"),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }
}

impl<T: PartialOrd + Debug + 'static> ExpectedToBe<T> {
    /// Between `min` and `max`, both included.
    pub fn between(min: T, max: T) -> Self {
        let (min_s, max_s) = (format!("{min:?}"), format!("{max:?}"));
        ExpectedToBe {
            kind: ToBe::Between {
                min: min_s.clone(),
                max: max_s.clone(),
            },
            check: Box::new(move |value: &T| {
                let above = compare(value, &min)? != Ordering::Less;
                let below = compare(value, &max)? != Ordering::Greater;
                if above && below {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!(
                            "Expected value to be between <{min_s}> and <{max_s}> but got <{value:?}>"
                        ),
                        format!("{min_s} <= value <= {max_s}"),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }

    pub fn greater_than(min: T) -> Self {
        let min_s = format!("{min:?}");
        ExpectedToBe {
            kind: ToBe::GreaterThan { min: min_s.clone() },
            check: Box::new(move |value: &T| {
                if compare(value, &min)? == Ordering::Greater {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("Expected value to be greater than <{min_s}> but got <{value:?}>"),
                        format!("> {min_s}"),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }

    pub fn less_than(max: T) -> Self {
        let max_s = format!("{max:?}");
        ExpectedToBe {
            kind: ToBe::LessThan { max: max_s.clone() },
            check: Box::new(move |value: &T| {
                if compare(value, &max)? == Ordering::Less {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("Expected value to be less than <{max_s}> but got <{value:?}>"),
                        format!("< {max_s}"),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }
}

/// Shared pointers whose identity can be compared.
pub trait Shared: Clone {
    fn same(&self, other: &Self) -> bool;
}

impl<U: ?Sized> Shared for Rc<U> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<U: ?Sized> Shared for Arc<U> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Shared + Debug + 'static> ExpectedToBe<T> {
    /// Same allocation as `expected`, not merely equal.
    pub fn same_as(expected: &T) -> Self {
        let rendered = format!("{expected:?}");
        let expected = expected.clone();
        ExpectedToBe {
            kind: ToBe::SameAs {
                expected: rendered.clone(),
            },
            check: Box::new(move |value: &T| {
                if value.same(&expected) {
                    Ok(())
                } else {
                    Err(mismatch(
                        format!("Expected value to be the same instance as <{rendered}> but got <{value:?}>"),
                        rendered.clone(),
                        format!("{value:?}"),
                    ))
                }
            }),
        }
    }
}
