//! Parameter tuples for parameterized tests.
//!
//! A source returns a [`TestParameters`] of typed tuples. The registry keeps
//! them type-erased as a [`ParameterSet`]; each parameterized unit coerces
//! its tuple back to the type its body declares, converting primitive
//! numbers position by position when the declared width differs.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;

/// A tuple of test arguments.
///
/// Implemented for tuples of one to six [`Display`] values; display values are
/// what `{0}`, `{1}`, ... of a name template are replaced with.
pub trait Params: Clone + 'static {
    fn type_names() -> Vec<&'static str>;

    fn display_values(&self) -> Vec<String>;

    /// One type-erased value per position.
    fn erase(&self) -> Vec<Rc<dyn Any>>;

    /// Rebuilds the tuple from erased positions. A position holding a
    /// different primitive number is converted when the value fits exactly.
    fn coerce(items: &[Rc<dyn Any>]) -> Option<Self>;
}

macro_rules! impl_params {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Display + Clone + 'static),+> Params for ($($name,)+) {
                fn type_names() -> Vec<&'static str> {
                    vec![$(std::any::type_name::<$name>()),+]
                }

                fn display_values(&self) -> Vec<String> {
                    vec![$(self.$idx.to_string()),+]
                }

                fn erase(&self) -> Vec<Rc<dyn Any>> {
                    vec![$(Rc::new(self.$idx.clone()) as Rc<dyn Any>),+]
                }

                fn coerce(items: &[Rc<dyn Any>]) -> Option<Self> {
                    if items.len() != Self::type_names().len() {
                        return None;
                    }
                    Some(($(coerce_item::<$name>(&*items[$idx])?,)+))
                }
            }
        )*
    };
}

impl_params! {
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5),
}

fn coerce_item<A: Clone + 'static>(item: &dyn Any) -> Option<A> {
    match item.downcast_ref::<A>() {
        Some(value) => Some(value.clone()),
        None => Number::read(item)?.convert::<A>(),
    }
}

/// A primitive number read out of an erased value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Signed(i128),
    Unsigned(u128),
    Float(f64),
}

impl Number {
    fn read(item: &dyn Any) -> Option<Number> {
        macro_rules! read_as {
            ($variant:ident, $wide:ty: $($t:ty),+) => {
                $(
                    if let Some(value) = item.downcast_ref::<$t>() {
                        return Some(Number::$variant(*value as $wide));
                    }
                )+
            };
        }
        read_as!(Signed, i128: i8, i16, i32, i64, i128, isize);
        read_as!(Unsigned, u128: u8, u16, u32, u64, u128, usize);
        read_as!(Float, f64: f32, f64);
        None
    }

    fn as_integer(self) -> Option<i128> {
        match self {
            Number::Signed(n) => Some(n),
            Number::Unsigned(n) => i128::try_from(n).ok(),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                let n = f as i128;
                (n as f64 == f).then_some(n)
            }
            Number::Float(_) => None,
        }
    }

    fn as_float(self) -> Option<f64> {
        match self {
            Number::Float(f) => Some(f),
            Number::Signed(n) => Some(n as f64).filter(|f| *f as i128 == n),
            Number::Unsigned(n) => Some(n as f64).filter(|f| *f as u128 == n),
        }
    }

    /// Converts to the primitive `A`, or `None` when `A` is not a primitive
    /// number or the value does not fit it exactly.
    fn convert<A: 'static>(self) -> Option<A> {
        let target = TypeId::of::<A>();
        macro_rules! into_integer {
            ($($t:ty),+) => {
                $(
                    if target == TypeId::of::<$t>() {
                        let value = match self {
                            Number::Unsigned(n) => <$t>::try_from(n).ok()?,
                            other => <$t>::try_from(other.as_integer()?).ok()?,
                        };
                        return downcast_owned(value);
                    }
                )+
            };
        }
        into_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
        if target == TypeId::of::<f64>() {
            return downcast_owned(self.as_float()?);
        }
        if target == TypeId::of::<f32>() {
            let wide = self.as_float()?;
            let narrow = wide as f32;
            return (f64::from(narrow) == wide).then(|| downcast_owned(narrow)).flatten();
        }
        None
    }
}

fn downcast_owned<V: 'static, A: 'static>(value: V) -> Option<A> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<A>().ok().map(|a| *a)
}

/// Typed parameter tuples returned by a parameter source.
#[derive(Debug, Clone, PartialEq)]
pub struct TestParameters<P> {
    parameters: Vec<P>,
}

impl<P: Params> TestParameters<P> {
    pub fn of(parameters: impl IntoIterator<Item = P>) -> Self {
        TestParameters {
            parameters: parameters.into_iter().collect(),
        }
    }

    pub fn parameters(&self) -> &[P] {
        &self.parameters
    }
}

/// One type-erased parameter tuple.
#[derive(Clone)]
pub struct ParamTuple {
    items: Vec<Rc<dyn Any>>,
    display: Vec<String>,
}

impl ParamTuple {
    pub fn new<P: Params>(values: P) -> Self {
        ParamTuple {
            items: values.erase(),
            display: values.display_values(),
        }
    }

    pub fn display_values(&self) -> &[String] {
        &self.display
    }

    /// The tuple as `P`, converting numeric positions of another width.
    pub fn coerce<P: Params>(&self) -> Option<P> {
        P::coerce(&self.items)
    }

    /// Replaces every `{i}` in `template` with the i-th display value.
    pub fn format_name(&self, template: &str) -> String {
        self.display
            .iter()
            .enumerate()
            .fold(template.to_string(), |name, (i, value)| {
                name.replace(&format!("{{{i}}}"), value)
            })
    }
}

impl std::fmt::Debug for ParamTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ParamTuple").field(&self.display).finish()
    }
}

/// Type-erased [`TestParameters`] with the declared types of its tuples.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    type_id: TypeId,
    type_names: Vec<&'static str>,
    tuples: Vec<ParamTuple>,
}

impl ParameterSet {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_names(&self) -> &[&'static str] {
        &self.type_names
    }

    pub fn tuples(&self) -> &[ParamTuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl<P: Params> From<TestParameters<P>> for ParameterSet {
    fn from(parameters: TestParameters<P>) -> Self {
        ParameterSet {
            type_id: TypeId::of::<P>(),
            type_names: P::type_names(),
            tuples: parameters.parameters.into_iter().map(ParamTuple::new).collect(),
        }
    }
}

/// Groups of type names treated as the same argument type.
///
/// Empty by default, so argument types must match exactly. Engines start
/// from [`TypeEquivalences::numeric_widening`].
#[derive(Debug, Clone, Default)]
pub struct TypeEquivalences {
    groups: HashMap<&'static str, &'static str>,
}

impl TypeEquivalences {
    /// Puts every name of `names` in the group `group`.
    pub fn group(mut self, group: &'static str, names: &[&'static str]) -> Self {
        for name in names {
            self.groups.insert(*name, group);
        }
        self
    }

    /// Every primitive number is equivalent to every other.
    pub fn numeric_widening() -> Self {
        TypeEquivalences::default().group(
            "number",
            &[
                "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
                "usize", "f32", "f64",
            ],
        )
    }

    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.groups.get(a), self.groups.get(b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    pub fn all_equivalent(&self, declared: &[&str], provided: &[&str]) -> bool {
        declared.len() == provided.len()
            && declared
                .iter()
                .zip(provided)
                .all(|(d, p)| self.equivalent(d, p))
    }
}
