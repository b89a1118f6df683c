//! Discovery-time checks of test class and method declarations.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::{ArgType, MethodDecl, MethodKind, TestClass};
use crate::errors::{ClassDefect, DefinitionError, MethodDefect, ParameterizedDefect, TestNames};
use crate::params::{ParameterSet, TypeEquivalences};
use crate::registry::ClassContext;

pub fn validate_class(class: &TestClass) -> Result<(), DefinitionError> {
    let modifiers = class.modifiers();
    let defect = if modifiers.is_abstract {
        Some(ClassDefect::Abstract)
    } else if modifiers.is_private {
        Some(ClassDefect::Private)
    } else {
        None
    };
    match defect {
        Some(reason) => Err(DefinitionError::TestClass {
            class: class.qualified_name(),
            reason,
        }),
        None => Ok(()),
    }
}

pub fn validate_test_method(method: &MethodDecl) -> Result<(), DefinitionError> {
    let modifiers = method.modifiers();
    let signature = method.signature();
    let defect = if modifiers.is_static {
        Some(MethodDefect::Static)
    } else if modifiers.is_abstract {
        Some(MethodDefect::Abstract)
    } else if modifiers.is_private {
        Some(MethodDefect::Private)
    } else if signature.args.len() != 1 {
        Some(MethodDefect::NotExactlyOneArg)
    } else if signature.args[0] != ArgType::TestCase {
        Some(MethodDefect::BadArgType)
    } else if !signature.returns_unit {
        Some(MethodDefect::NotReturningUnit)
    } else {
        None
    };
    match defect {
        Some(reason) => Err(DefinitionError::TestMethod {
            method: method.method().to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Checks a parameterized method against its resolved source and returns the
/// source's parameters.
pub fn validate_parameterized(
    method: &MethodDecl,
    context: &mut ClassContext,
    equivalences: &TypeEquivalences,
) -> Result<Rc<ParameterSet>, DefinitionError> {
    let MethodKind::Parameterized {
        source, param_type, ..
    } = method.kind()
    else {
        return Err(DefinitionError::TestMethod {
            method: method.method().to_string(),
            reason: MethodDefect::BadArgType,
        });
    };
    let defect = |reason| DefinitionError::ParameterizedTest {
        method: method.method().to_string(),
        reason,
    };

    let modifiers = method.modifiers();
    let signature = method.signature();
    if modifiers.is_static {
        return Err(defect(ParameterizedDefect::Static));
    }
    if modifiers.is_abstract {
        return Err(defect(ParameterizedDefect::Abstract));
    }
    if modifiers.is_private {
        return Err(defect(ParameterizedDefect::Private));
    }
    if source.trim().is_empty() {
        return Err(defect(ParameterizedDefect::EmptySource));
    }
    if signature.args.len() <= 1 {
        return Err(defect(ParameterizedDefect::NotMoreThanOneArg));
    }
    if signature.args[0] != ArgType::TestCase {
        return Err(defect(ParameterizedDefect::BadFirstArgType));
    }

    let parameters = context.parameters(method.method(), source)?;
    let declared: Vec<&str> = signature.args[1..]
        .iter()
        .map(|arg| match arg {
            ArgType::TestCase => "TestCase",
            ArgType::Value(name) => name.as_str(),
        })
        .collect();
    let provided = parameters.type_names();
    if declared.len() != provided.len() {
        return Err(defect(ParameterizedDefect::BadArgsNumber {
            expected: provided.len(),
            found: declared.len(),
        }));
    }
    let same_type = param_type.is_some_and(|id| id == parameters.type_id());
    if !same_type && !equivalences.all_equivalent(&declared, provided) {
        return Err(defect(ParameterizedDefect::BadArgsTypes {
            expected: provided.iter().map(ToString::to_string).collect(),
            found: declared.iter().map(ToString::to_string).collect(),
        }));
    }
    if !signature.returns_unit {
        return Err(defect(ParameterizedDefect::NotReturningUnit));
    }
    Ok(parameters)
}

/// Rejects a class in which two methods resolve to the same test name.
pub fn check_duplicate_names(class: &TestClass) -> Result<(), DefinitionError> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for method in class.methods() {
        *counts.entry(method.test_name()).or_default() += 1;
    }
    let duplicated: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    if duplicated.is_empty() {
        Ok(())
    } else {
        Err(DefinitionError::DuplicateTestNames(TestNames(duplicated)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestCase;
    use crate::class::{MethodSignature, Modifiers};
    use crate::errors::GiwtError;
    use crate::params::TestParameters;
    use crate::registry::ContextRegistry;
    use rstest::rstest;

    fn noop(_: &mut TestCase<(), ()>) -> Result<(), GiwtError> {
        Ok(())
    }

    fn noop_param(_: &mut TestCase<(), ()>, _: (i32, i32)) -> Result<(), GiwtError> {
        Ok(())
    }

    #[rstest]
    #[case(Modifiers { is_static: true, ..Default::default() }, MethodDefect::Static)]
    #[case(Modifiers { is_abstract: true, ..Default::default() }, MethodDefect::Abstract)]
    #[case(Modifiers { is_private: true, ..Default::default() }, MethodDefect::Private)]
    fn method_modifiers_are_rejected(#[case] modifiers: Modifiers, #[case] expected: MethodDefect) {
        let method = MethodDecl::test("m", noop).with_modifiers(modifiers);
        assert_eq!(
            validate_test_method(&method),
            Err(DefinitionError::TestMethod {
                method: "m".into(),
                reason: expected
            })
        );
    }

    #[rstest]
    #[case(vec![], true, MethodDefect::NotExactlyOneArg)]
    #[case(vec![ArgType::Value("i32".into())], true, MethodDefect::BadArgType)]
    #[case(vec![ArgType::TestCase], false, MethodDefect::NotReturningUnit)]
    fn method_signatures_are_checked(
        #[case] args: Vec<ArgType>,
        #[case] returns_unit: bool,
        #[case] expected: MethodDefect,
    ) {
        let method =
            MethodDecl::test("m", noop).with_signature(MethodSignature { args, returns_unit });
        assert_eq!(
            validate_test_method(&method),
            Err(DefinitionError::TestMethod {
                method: "m".into(),
                reason: expected
            })
        );
    }

    #[test]
    fn abstract_class_is_rejected() {
        let class = TestClass::new("Base").with_modifiers(Modifiers {
            is_abstract: true,
            ..Default::default()
        });
        assert_eq!(
            validate_class(&class),
            Err(DefinitionError::TestClass {
                class: "Base".into(),
                reason: ClassDefect::Abstract
            })
        );
    }

    fn sourced_class(method: MethodDecl) -> Rc<TestClass> {
        Rc::new(
            TestClass::new("Params")
                .parameter_source("pairs", || TestParameters::of([(1, 2)]))
                .parameter_source("triples", || TestParameters::of([(1, 2, 3)]))
                .parameter_source("labels", || TestParameters::of([("a".to_string(), 2)]))
                .method(method),
        )
    }

    fn check(method: MethodDecl) -> Result<usize, DefinitionError> {
        let class = sourced_class(method.clone());
        let mut registry = ContextRegistry::new();
        let context = registry.context(&class);
        validate_parameterized(&method, context, &TypeEquivalences::default()).map(|set| set.len())
    }

    #[test]
    fn matching_source_passes() {
        assert_eq!(check(MethodDecl::parameterized("m", "", "pairs", noop_param)), Ok(1));
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(matches!(
            check(MethodDecl::parameterized("m", "", " ", noop_param)),
            Err(DefinitionError::ParameterizedTest {
                reason: ParameterizedDefect::EmptySource,
                ..
            })
        ));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        assert!(matches!(
            check(MethodDecl::parameterized("m", "", "triples", noop_param)),
            Err(DefinitionError::ParameterizedTest {
                reason: ParameterizedDefect::BadArgsNumber {
                    expected: 3,
                    found: 2
                },
                ..
            })
        ));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        assert!(matches!(
            check(MethodDecl::parameterized("m", "", "labels", noop_param)),
            Err(DefinitionError::ParameterizedTest {
                reason: ParameterizedDefect::BadArgsTypes { .. },
                ..
            })
        ));
    }

    #[test]
    fn missing_source_is_reported() {
        assert_eq!(
            check(MethodDecl::parameterized("m", "", "nowhere", noop_param)),
            Err(DefinitionError::NoParameterSource("nowhere".into()))
        );
    }

    #[test]
    fn single_argument_parameterized_is_rejected() {
        let method = MethodDecl::parameterized("m", "", "pairs", noop_param).with_signature(
            MethodSignature {
                args: vec![ArgType::TestCase],
                returns_unit: true,
            },
        );
        assert!(matches!(
            check(method),
            Err(DefinitionError::ParameterizedTest {
                reason: ParameterizedDefect::NotMoreThanOneArg,
                ..
            })
        ));
    }

    #[test]
    fn host_declared_types_use_equivalences() {
        let method = MethodDecl::parameterized("m", "", "pairs", noop_param).with_signature(
            MethodSignature {
                args: vec![
                    ArgType::TestCase,
                    ArgType::Value("i64".into()),
                    ArgType::Value("u8".into()),
                ],
                returns_unit: true,
            },
        );
        let class = sourced_class(method.clone());
        let mut registry = ContextRegistry::new();
        let context = registry.context(&class);
        assert!(validate_parameterized(&method, context, &TypeEquivalences::default()).is_err());
        assert!(
            validate_parameterized(&method, context, &TypeEquivalences::numeric_widening()).is_ok()
        );
    }

    #[test]
    fn duplicate_names_are_rejected_once_each() {
        let class = TestClass::new("Shop")
            .method(MethodDecl::test("a", noop).named("checkout"))
            .method(MethodDecl::test("checkout", noop))
            .method(MethodDecl::test("refund", noop))
            .method(MethodDecl::test("b", noop).named("checkout"));
        assert_eq!(
            check_duplicate_names(&class),
            Err(DefinitionError::DuplicateTestNames(TestNames(vec![
                "checkout".into()
            ])))
        );
    }
}
