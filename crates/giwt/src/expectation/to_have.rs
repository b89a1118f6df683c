use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::{sealed, Expectation, Name};
use crate::errors::{ExpectationError, Operation, VerificationError};

/// Values with a size. `None` means the runtime shape has no size.
pub trait Measurable {
    fn size(&self) -> Option<usize>;
}

/// Values that can be searched for an item. `None` means unsupported.
pub trait Searchable<I> {
    fn contains_item(&self, item: &I) -> Option<bool>;
}

macro_rules! measurable_by_len {
    ($($ty:ty => [$($gen:tt)*]),* $(,)?) => {
        $(
            impl<$($gen)*> Measurable for $ty {
                fn size(&self) -> Option<usize> {
                    Some(self.len())
                }
            }
        )*
    };
}

measurable_by_len! {
    Vec<T> => [T],
    VecDeque<T> => [T],
    [T] => [T],
    HashSet<T, S> => [T, S],
    BTreeSet<T> => [T],
    HashMap<K, V, S> => [K, V, S],
    BTreeMap<K, V> => [K, V],
    IndexSet<T, S> => [T, S],
    IndexMap<K, V, S> => [K, V, S],
}

impl<T, const N: usize> Measurable for [T; N] {
    fn size(&self) -> Option<usize> {
        Some(N)
    }
}

impl Measurable for String {
    fn size(&self) -> Option<usize> {
        Some(self.chars().count())
    }
}

impl Measurable for &str {
    fn size(&self) -> Option<usize> {
        Some(self.chars().count())
    }
}

impl Measurable for Value {
    fn size(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::Object(fields) => Some(fields.len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }
}

impl<T: PartialEq> Searchable<T> for Vec<T> {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

impl<T: PartialEq> Searchable<T> for VecDeque<T> {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

impl<T: PartialEq, const N: usize> Searchable<T> for [T; N] {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

impl<T: Eq + Hash, S: std::hash::BuildHasher> Searchable<T> for HashSet<T, S> {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

impl<T: Ord> Searchable<T> for BTreeSet<T> {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

impl<T: Eq + Hash, S: std::hash::BuildHasher> Searchable<T> for IndexSet<T, S> {
    fn contains_item(&self, item: &T) -> Option<bool> {
        Some(self.contains(item))
    }
}

// Maps are searched by value.
impl<K, V: PartialEq, S> Searchable<V> for HashMap<K, V, S> {
    fn contains_item(&self, item: &V) -> Option<bool> {
        Some(self.values().any(|v| v == item))
    }
}

impl<K, V: PartialEq> Searchable<V> for BTreeMap<K, V> {
    fn contains_item(&self, item: &V) -> Option<bool> {
        Some(self.values().any(|v| v == item))
    }
}

impl<K, V: PartialEq, S> Searchable<V> for IndexMap<K, V, S> {
    fn contains_item(&self, item: &V) -> Option<bool> {
        Some(self.values().any(|v| v == item))
    }
}

impl Searchable<&str> for String {
    fn contains_item(&self, item: &&str) -> Option<bool> {
        Some(self.contains(*item))
    }
}

impl Searchable<String> for String {
    fn contains_item(&self, item: &String) -> Option<bool> {
        Some(self.contains(item.as_str()))
    }
}

impl Searchable<char> for String {
    fn contains_item(&self, item: &char) -> Option<bool> {
        Some(self.contains(*item))
    }
}

impl Searchable<&str> for &str {
    fn contains_item(&self, item: &&str) -> Option<bool> {
        Some(self.contains(*item))
    }
}

impl Searchable<Value> for Value {
    fn contains_item(&self, item: &Value) -> Option<bool> {
        match (self, item) {
            (Value::Array(items), _) => Some(items.contains(item)),
            (Value::Object(fields), _) => Some(fields.values().any(|v| v == item)),
            (Value::String(s), Value::String(needle)) => Some(s.contains(needle.as_str())),
            _ => None,
        }
    }
}

/// The kind of an [`ExpectedToHave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToHave {
    Size { expected: usize },
    AnItemEqualTo { item: String },
}

/// Expectations about the content of a collection-like value.
pub struct ExpectedToHave<T> {
    kind: ToHave,
    check: Box<dyn Fn(&T) -> Result<(), VerificationError>>,
}

impl<T> ExpectedToHave<T> {
    pub fn kind(&self) -> &ToHave {
        &self.kind
    }
}

impl<T: Measurable + Debug + 'static> ExpectedToHave<T> {
    pub fn size(expected: usize) -> Self {
        ExpectedToHave {
            kind: ToHave::Size { expected },
            check: Box::new(move |value: &T| {
                let actual = value.size().ok_or_else(|| VerificationError::Unsupported {
                    operation: Operation::Size,
                    value: format!("{value:?}"),
                })?;
                if actual == expected {
                    Ok(())
                } else {
                    Err(ExpectationError::new(
                        format!("Expected result to have size <{expected}> but got <{actual}>"),
                        expected.to_string(),
                        actual.to_string(),
                    )
                    .into())
                }
            }),
        }
    }
}

impl<T: Debug + 'static> ExpectedToHave<T> {
    pub fn an_item_equal_to<I>(item: I) -> Self
    where
        T: Searchable<I>,
        I: Debug + 'static,
    {
        let rendered = format!("{item:?}");
        ExpectedToHave {
            kind: ToHave::AnItemEqualTo {
                item: rendered.clone(),
            },
            check: Box::new(move |value: &T| {
                let found =
                    value
                        .contains_item(&item)
                        .ok_or_else(|| VerificationError::Unsupported {
                            operation: Operation::Contains,
                            value: format!("{value:?}"),
                        })?;
                if found {
                    Ok(())
                } else {
                    Err(ExpectationError::new(
                        format!("Expected result to contain <{rendered}> but it does not"),
                        format!("contains {rendered}"),
                        format!("{value:?}"),
                    )
                    .into())
                }
            }),
        }
    }
}

impl<T> sealed::Sealed for ExpectedToHave<T> {}

impl<T> Expectation<T> for ExpectedToHave<T> {
    fn name(&self) -> Name {
        match &self.kind {
            ToHave::Size { expected } => Name::Value(format!("Expected to have size {expected}")),
            ToHave::AnItemEqualTo { item } => {
                Name::Value(format!("Expected to have an item equal to {item}"))
            }
        }
    }

    fn verify(&self, input: &T) -> Result<(), VerificationError> {
        (self.check)(input)
    }
}
