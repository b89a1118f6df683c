//! End-to-end scenarios: statement chains, parameterized naming, duplicate
//! names, captured errors and size expectations.

use giwt::descriptor::NodeKind;
use giwt::errors::{DefinitionError, VerificationError};
use giwt::prelude::*;
use giwt::{ContextRegistry, Engine, RecordingListener, ResultValue, RunResult, Selector};
use pretty_assertions::assert_eq;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct IllegalState(String);

fn run(engine: &Engine, selectors: &[Selector]) -> (RunResult, RecordingListener) {
    let mut registry = ContextRegistry::new();
    let discovery = engine.discover(selectors, &mut registry);
    discovery.check().unwrap();
    let mut listener = RecordingListener::new();
    let result = engine
        .execute(&discovery.plan, &mut registry, &mut listener, None)
        .unwrap();
    (result, listener)
}

#[test]
fn and_given_feeds_the_when_statement() {
    let mut tc: TestCase<i32, i32> = TestCase::new("arithmetic");
    tc.given("state = 1", || 1)
        .unwrap()
        .and("state *= 2", |state| state * 2)
        .when("state += 3", |state| state + 3)
        .then("is 5", |r| r.should_be(ExpectedToBe::equal_to(5)).verify());
    tc.run().unwrap();

    assert!(tc.is_closed());
    assert!(matches!(tc.result().unwrap().value(), ResultValue::Ok(5)));
    let statements: Vec<String> = tc.statements().iter().map(ToString::to_string).collect();
    assert_eq!(
        statements,
        vec!["GIVEN state = 1", "AND state *= 2", "WHEN state += 3", "THEN is 5"]
    );
}

#[test]
fn running_a_case_twice_fails() {
    let mut tc: TestCase<i32, i32> = TestCase::new("twice");
    tc.given("one", || 1)
        .unwrap()
        .when("same", |v| *v)
        .then("is 1", |r| r.should_be(ExpectedToBe::equal_to(1)).verify());
    tc.run().unwrap();
    assert!(matches!(tc.run(), Err(GiwtError::Closed)));
}

#[test]
fn parameterized_names_substitute_source_values() {
    let engine = Engine::new([TestClass::new("Increments")
        .parameter_source("pairs", || TestParameters::of([(1, 3), (2, 4)]))
        .parameterized(
            "adds_one",
            "{0}+1={1}",
            "pairs",
            |tc: &mut TestCase<i32, i32>, (a, _b): (i32, i32)| {
                tc.given_value("a", a)?
                    .when("adding 1", |v| v + 1)
                    .then("is a + 1", move |r| {
                        r.should_be(ExpectedToBe::equal_to(a + 1)).verify()
                    });
                Ok(())
            },
        )]);

    let mut registry = ContextRegistry::new();
    let discovery = engine.discover(&[Selector::All], &mut registry);
    let names: Vec<&str> = discovery
        .plan
        .root()
        .leaves()
        .iter()
        .map(|leaf| leaf.display_name())
        .collect();
    assert_eq!(names, vec!["1+1=3", "2+1=4"]);

    let (result, listener) = run(&engine, &[Selector::All]);
    assert_eq!(result.passed, 2);
    assert_eq!(
        listener.finished_units(),
        vec![("1+1=3".into(), true), ("2+1=4".into(), true)]
    );
}

#[test]
fn duplicate_display_names_are_rejected_before_running() {
    let ran = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = ran.clone();
    let engine = Engine::new([TestClass::new("Shop")
        .test("checkout", move |_: &mut TestCase<(), ()>| {
            flag.set(true);
            Ok(())
        })
        .method(
            MethodDecl::test("pay", |_: &mut TestCase<(), ()>| Ok(())).named("checkout"),
        )]);

    let mut registry = ContextRegistry::new();
    let discovery = engine.discover(&[Selector::All], &mut registry);
    assert!(matches!(
        discovery.errors.as_slice(),
        [DefinitionError::DuplicateTestNames(names)] if names.0 == vec!["checkout".to_string()]
    ));
    assert_eq!(discovery.plan.unit_count(), 0);
    assert!(registry.is_empty());

    let mut listener = RecordingListener::new();
    let result = engine
        .execute(&discovery.plan, &mut registry, &mut listener, None)
        .unwrap();
    assert_eq!(result.total(), 0);
    assert!(!ran.get());
}

#[test]
fn captured_errors_satisfy_failure_expectations() {
    let mut tc: TestCase<(), i32> = TestCase::new("boom");
    tc.try_when("it explodes", || Err::<i32, _>(IllegalState("boom".into())))
        .unwrap()
        .then("fails with boom", |r| {
            r.should_fail()
                .and(ExpectedToFail::with_message("boom"))
                .and(ExpectedToFail::with_type::<IllegalState>())
                .verify()
        });
    tc.run().unwrap();

    let error = tc.result().unwrap().value().error().unwrap();
    assert!(error.is::<IllegalState>());
    assert_eq!(error.message(), "boom");
}

#[test]
fn expecting_success_on_a_captured_error_cites_it() {
    let mut tc: TestCase<(), i32> = TestCase::new("boom");
    tc.try_when("it explodes", || Err::<i32, _>(IllegalState("boom".into())))
        .unwrap()
        .then("succeeds", |r| r.should_succeed().verify());

    match tc.run() {
        Err(GiwtError::Verification(error @ VerificationError::ExpectedSuccess { .. })) => {
            assert!(error.to_string().contains("boom"), "{error}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn size_expectations_cite_expected_and_actual() {
    assert!(ExpectedToHave::size(3).verify(&"abc").is_ok());

    let error = ExpectedToHave::size(4).verify(&"abc").unwrap_err();
    assert_eq!(error.expected(), Some("4"));
    assert_eq!(error.actual(), Some("3"));
}

#[test]
fn a_method_selector_runs_one_parameterized_method() {
    let engine = Engine::new([TestClass::new("Increments")
        .package("math")
        .parameter_source("pairs", || TestParameters::of([(1, 2), (5, 6)]))
        .parameterized(
            "adds_one",
            "",
            "pairs",
            |tc: &mut TestCase<i32, i32>, (a, b): (i32, i32)| {
                tc.given_value("a", a)?
                    .when("adding 1", |v| v + 1)
                    .then("is b", move |r| r.should_be(ExpectedToBe::equal_to(b)).verify());
                Ok(())
            },
        )
        .test("unrelated", |_: &mut TestCase<(), ()>| Ok(()))]);

    let selector = Selector::Method {
        class: "math::Increments".into(),
        method: "adds_one".into(),
    };
    let mut registry = ContextRegistry::new();
    let discovery = engine.discover(&[selector.clone()], &mut registry);
    let root = discovery.plan.root();
    assert_eq!(root.children().len(), 1);
    assert!(matches!(
        root.children()[0].kind(),
        NodeKind::ParameterizedMethod { .. }
    ));

    let (result, listener) = run(&engine, &[selector]);
    assert_eq!(result.passed, 2);
    assert_eq!(
        listener.finished_units(),
        vec![("adds_one[1, 2]".into(), true), ("adds_one[5, 6]".into(), true)]
    );
}

#[test]
fn a_missing_parameter_source_rejects_the_class() {
    let engine = Engine::new([
        TestClass::new("Broken").parameterized(
            "adds",
            "{0}",
            "missing",
            |_: &mut TestCase<(), ()>, (_a,): (i32,)| Ok(()),
        ),
        TestClass::new("Healthy").test("works", |tc: &mut TestCase<i32, i32>| {
            tc.given("one", || 1)?
                .when("same", |v| *v)
                .then("is 1", |r| r.should_be(ExpectedToBe::equal_to(1)).verify());
            Ok(())
        }),
    ]);

    let mut registry = ContextRegistry::new();
    let discovery = engine.discover(&[Selector::All], &mut registry);
    assert!(matches!(
        discovery.errors.as_slice(),
        [DefinitionError::NoParameterSource(name)] if name == "missing"
    ));
    assert_eq!(discovery.plan.root().paths(), vec!["Healthy > works"]);
}
