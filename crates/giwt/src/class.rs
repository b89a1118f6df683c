//! Test class declarations.
//!
//! A [`TestClass`] is what a user (or the `test_class!` macro) declares: its
//! test methods, lifecycle callbacks, extensions, parameter sources and an
//! optional configuration factory. Nothing here runs anything; the engine
//! validates the declarations during discovery and runs them afterwards.
//!
//! ```rust
//! use giwt::prelude::*;
//!
//! let class = TestClass::new("Calculator")
//!     .package("math")
//!     .before_each(|| {})
//!     .test("adds", |tc: &mut TestCase<i32, i32>| {
//!         tc.given("one", || 1)?
//!             .when("adding 2", |v| v + 2)
//!             .then("is 3", |r| r.should_be(ExpectedToBe::equal_to(3)).verify());
//!         Ok(())
//!     })
//!     .parameter_source("sums", || TestParameters::of([(1, 2), (2, 3)]))
//!     .parameterized(
//!         "adds_one",
//!         "{0}+1={1}",
//!         "sums",
//!         |tc: &mut TestCase<i32, i32>, (a, b): (i32, i32)| {
//!             tc.given_value("a", a)?
//!                 .when("adding 1", |v| v + 1)
//!                 .then("is b", move |r| r.should_be(ExpectedToBe::equal_to(b)).verify());
//!             Ok(())
//!         },
//!     );
//! assert_eq!(class.qualified_name(), "math::Calculator");
//! assert_eq!(class.methods().len(), 2);
//! ```

use std::any::TypeId;
use std::collections::HashSet;
use std::error::Error;
use std::rc::Rc;

use crate::capture::{self, Panicked};
use crate::case::TestCase;
use crate::errors::{DefinitionError, GiwtError, ParameterizedDefect, VerificationError};
use crate::params::{ParamTuple, ParameterSet, Params, TestParameters};
use crate::statement::StmtMsg;

// ============================================================================
// Unit bodies
// ============================================================================

/// What the engine hands to a unit body.
#[derive(Debug, Clone)]
pub struct UnitInvocation {
    pub name: String,
    pub parameters: Option<ParamTuple>,
}

/// Why a unit did not succeed.
#[derive(Debug)]
pub enum UnitFailure {
    Error(GiwtError),
    Panic(Panicked),
}

impl UnitFailure {
    /// Human readable reason, with expected and actual values when known.
    pub fn reason(&self) -> String {
        match self {
            UnitFailure::Error(GiwtError::Verification(VerificationError::Mismatch(e))) => {
                e.details()
            }
            UnitFailure::Error(error) => error.to_string(),
            UnitFailure::Panic(panic) => panic.message.clone(),
        }
    }

    /// Trace lines: the error and its sources, or the panic location.
    pub fn trace(&self) -> Vec<String> {
        match self {
            UnitFailure::Error(error) => {
                let mut lines = vec![format!("error: {error}")];
                let mut source = error.source();
                while let Some(cause) = source {
                    lines.push(format!("caused by: {cause}"));
                    source = cause.source();
                }
                lines
            }
            UnitFailure::Panic(panic) => panic.trace(),
        }
    }
}

/// What a unit body reports back: its statements and how it ended.
#[derive(Debug)]
pub struct UnitOutcome {
    pub statements: Vec<StmtMsg>,
    pub result: Result<(), UnitFailure>,
}

pub type UnitBody = Rc<dyn Fn(&UnitInvocation) -> UnitOutcome>;

/// What the body of a declared test may end with: nothing, or a `Result`
/// whose error fails the unit.
pub trait IntoUnitResult {
    fn into_unit_result(self) -> Result<(), GiwtError>;
}

impl IntoUnitResult for () {
    fn into_unit_result(self) -> Result<(), GiwtError> {
        Ok(())
    }
}

impl<E: Into<GiwtError>> IntoUnitResult for Result<(), E> {
    fn into_unit_result(self) -> Result<(), GiwtError> {
        self.map_err(Into::into)
    }
}

fn run_case<T: 'static, R: 'static>(
    name: &str,
    body: impl FnOnce(&mut TestCase<T, R>) -> Result<(), GiwtError>,
) -> UnitOutcome {
    let mut case = TestCase::<T, R>::new(name);
    let outcome = capture::catch(|| -> Result<(), GiwtError> {
        body(&mut case)?;
        case.run()
    });
    let result = match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(UnitFailure::Error(error)),
        Err(panic) => Err(UnitFailure::Panic(panic)),
    };
    UnitOutcome {
        statements: case.statements().to_vec(),
        result,
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Declared modifiers, as a host language would report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_private: bool,
}

/// Skip marker with an optional reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skip {
    pub reason: Option<String>,
}

impl Skip {
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("skipped")
    }
}

/// Argument of a declared method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    TestCase,
    Value(String),
}

/// The declared signature of a method, checked during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub args: Vec<ArgType>,
    pub returns_unit: bool,
}

impl MethodSignature {
    fn test_case() -> Self {
        MethodSignature {
            args: vec![ArgType::TestCase],
            returns_unit: true,
        }
    }

    fn parameterized<P: Params>() -> Self {
        let mut args = vec![ArgType::TestCase];
        args.extend(
            P::type_names()
                .into_iter()
                .map(|name| ArgType::Value(name.to_string())),
        );
        MethodSignature {
            args,
            returns_unit: true,
        }
    }
}

#[derive(Clone)]
pub enum MethodKind {
    Test,
    Parameterized {
        source: String,
        template: String,
        param_type: Option<TypeId>,
    },
}

/// A test method: identity, markers, signature and body.
#[derive(Clone)]
pub struct MethodDecl {
    method: String,
    test_name: Option<String>,
    kind: MethodKind,
    modifiers: Modifiers,
    signature: MethodSignature,
    skip: Option<Skip>,
    body: UnitBody,
}

impl MethodDecl {
    /// A plain test taking one test case.
    pub fn test<T, R, F>(method: impl Into<String>, body: F) -> Self
    where
        T: 'static,
        R: 'static,
        F: Fn(&mut TestCase<T, R>) -> Result<(), GiwtError> + 'static,
    {
        let unit: UnitBody =
            Rc::new(move |invocation: &UnitInvocation| run_case::<T, R>(&invocation.name, &body));
        MethodDecl {
            method: method.into(),
            test_name: None,
            kind: MethodKind::Test,
            modifiers: Modifiers::default(),
            signature: MethodSignature::test_case(),
            skip: None,
            body: unit,
        }
    }

    /// A test run once per tuple of the parameter source named `source`;
    /// `template` names each run, `{i}` being the i-th parameter.
    pub fn parameterized<T, R, P, F>(
        method: impl Into<String>,
        template: impl Into<String>,
        source: impl Into<String>,
        body: F,
    ) -> Self
    where
        T: 'static,
        R: 'static,
        P: Params,
        F: Fn(&mut TestCase<T, R>, P) -> Result<(), GiwtError> + 'static,
    {
        let method = method.into();
        let method_name = method.clone();
        let unit: UnitBody = Rc::new(move |invocation: &UnitInvocation| {
            match invocation.parameters.as_ref().and_then(ParamTuple::coerce::<P>) {
                Some(params) => run_case::<T, R>(&invocation.name, |tc| body(tc, params)),
                None => UnitOutcome {
                    statements: Vec::new(),
                    result: Err(UnitFailure::Error(
                        DefinitionError::ParameterizedTest {
                            method: method_name.clone(),
                            reason: ParameterizedDefect::BadArgsTypes {
                                expected: Vec::new(),
                                found: P::type_names().iter().map(ToString::to_string).collect(),
                            },
                        }
                        .into(),
                    )),
                },
            }
        });
        MethodDecl {
            method,
            test_name: None,
            kind: MethodKind::Parameterized {
                source: source.into(),
                template: template.into(),
                param_type: Some(TypeId::of::<P>()),
            },
            modifiers: Modifiers::default(),
            signature: MethodSignature::parameterized::<P>(),
            skip: None,
            body: unit,
        }
    }

    /// Explicit test name; an empty name falls back to the method identity.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    pub fn skipped(mut self, reason: Option<&str>) -> Self {
        self.skip = Some(Skip {
            reason: reason.map(str::to_string),
        });
        self
    }

    /// Overrides the declared modifiers; for host adapters.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Overrides the declared signature; for host adapters whose bodies are
    /// not typed Rust closures.
    pub fn with_signature(mut self, signature: MethodSignature) -> Self {
        self.signature = signature;
        if let MethodKind::Parameterized { param_type, .. } = &mut self.kind {
            *param_type = None;
        }
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Resolved test name: the explicit name, else the parameterized
    /// template, else the method identity.
    pub fn test_name(&self) -> &str {
        match (&self.test_name, &self.kind) {
            (Some(name), _) if !name.is_empty() => name,
            (_, MethodKind::Parameterized { template, .. }) if !template.is_empty() => template,
            _ => &self.method,
        }
    }

    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self.kind, MethodKind::Parameterized { .. })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn skip(&self) -> Option<&Skip> {
        self.skip.as_ref()
    }

    /// Runs the body for one invocation.
    pub fn invoke(&self, invocation: &UnitInvocation) -> UnitOutcome {
        (self.body)(invocation)
    }
}

impl std::fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDecl")
            .field("method", &self.method)
            .field("test_name", &self.test_name)
            .field("modifiers", &self.modifiers)
            .field("signature", &self.signature)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

/// A named provider of parameter tuples.
#[derive(Clone)]
pub struct ParameterSource {
    method: String,
    name: Option<String>,
    provider: Rc<dyn Fn() -> ParameterSet>,
}

impl ParameterSource {
    pub fn new<P, F>(method: impl Into<String>, provider: F) -> Self
    where
        P: Params,
        F: Fn() -> TestParameters<P> + 'static,
    {
        ParameterSource {
            method: method.into(),
            name: None,
            provider: Rc::new(move || ParameterSet::from(provider())),
        }
    }

    /// Name used by parameterized methods instead of the method identity.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn resolved_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => &self.method,
        }
    }

    pub fn provide(&self) -> ParameterSet {
        (self.provider)()
    }
}

/// Shared parameter sources and report exclusions for a class.
#[derive(Clone, Default)]
pub struct TestConfiguration {
    sources: Vec<ParameterSource>,
    excluded_from_report: HashSet<String>,
}

impl TestConfiguration {
    pub fn new() -> Self {
        TestConfiguration::default()
    }

    pub fn parameter_source<P, F>(self, name: impl Into<String>, provider: F) -> Self
    where
        P: Params,
        F: Fn() -> TestParameters<P> + 'static,
    {
        self.source(ParameterSource::new(name, provider))
    }

    pub fn source(mut self, source: ParameterSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Leaves the class named `class` (simple or qualified) out of the report.
    pub fn exclude_from_report(mut self, class: impl Into<String>) -> Self {
        self.excluded_from_report.insert(class.into());
        self
    }

    pub fn sources(&self) -> &[ParameterSource] {
        &self.sources
    }

    pub fn excludes(&self, class: &TestClass) -> bool {
        self.excluded_from_report.contains(class.name())
            || self.excluded_from_report.contains(&class.qualified_name())
    }
}

/// Lifecycle callback kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

#[derive(Clone)]
pub struct CallbackDecl {
    pub kind: CallbackKind,
    pub order: i32,
    pub run: Rc<dyn Fn()>,
}

/// Callbacks contributed by a registered extension.
pub trait Extension {
    fn before_all(&self) {}

    fn after_all(&self) {}

    fn before_each(&self) {}

    fn after_each(&self) {}
}

/// A declared test class.
#[derive(Clone)]
pub struct TestClass {
    name: String,
    package: Option<String>,
    modifiers: Modifiers,
    skip: Option<Skip>,
    configuration: Option<Rc<dyn Fn() -> TestConfiguration>>,
    callbacks: Vec<CallbackDecl>,
    extensions: Vec<Rc<dyn Extension>>,
    sources: Vec<ParameterSource>,
    methods: Vec<Rc<MethodDecl>>,
}

impl TestClass {
    pub fn new(name: impl Into<String>) -> Self {
        TestClass {
            name: name.into(),
            package: None,
            modifiers: Modifiers::default(),
            skip: None,
            configuration: None,
            callbacks: Vec::new(),
            extensions: Vec::new(),
            sources: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Skips every method of the class that has no skip marker of its own.
    pub fn skipped(mut self, reason: Option<&str>) -> Self {
        self.skip = Some(Skip {
            reason: reason.map(str::to_string),
        });
        self
    }

    /// Factory of the class configuration, invoked once per run.
    pub fn configure_with(mut self, factory: impl Fn() -> TestConfiguration + 'static) -> Self {
        self.configuration = Some(Rc::new(factory));
        self
    }

    pub fn extend_with(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Rc::new(extension));
        self
    }

    /// Registers a callback; callbacks of one kind run by ascending `order`.
    pub fn callback(mut self, kind: CallbackKind, order: i32, run: impl Fn() + 'static) -> Self {
        self.callbacks.push(CallbackDecl {
            kind,
            order,
            run: Rc::new(run),
        });
        self
    }

    pub fn before_all(self, run: impl Fn() + 'static) -> Self {
        self.callback(CallbackKind::BeforeAll, 0, run)
    }

    pub fn after_all(self, run: impl Fn() + 'static) -> Self {
        self.callback(CallbackKind::AfterAll, 0, run)
    }

    pub fn before_each(self, run: impl Fn() + 'static) -> Self {
        self.callback(CallbackKind::BeforeEach, 0, run)
    }

    pub fn after_each(self, run: impl Fn() + 'static) -> Self {
        self.callback(CallbackKind::AfterEach, 0, run)
    }

    pub fn parameter_source<P, F>(self, name: impl Into<String>, provider: F) -> Self
    where
        P: Params,
        F: Fn() -> TestParameters<P> + 'static,
    {
        self.source(ParameterSource::new(name, provider))
    }

    pub fn source(mut self, source: ParameterSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn test<T, R, F>(self, method: impl Into<String>, body: F) -> Self
    where
        T: 'static,
        R: 'static,
        F: Fn(&mut TestCase<T, R>) -> Result<(), GiwtError> + 'static,
    {
        self.method(MethodDecl::test(method, body))
    }

    pub fn parameterized<T, R, P, F>(
        self,
        method: impl Into<String>,
        template: impl Into<String>,
        source: impl Into<String>,
        body: F,
    ) -> Self
    where
        T: 'static,
        R: 'static,
        P: Params,
        F: Fn(&mut TestCase<T, R>, P) -> Result<(), GiwtError> + 'static,
    {
        self.method(MethodDecl::parameterized(method, template, source, body))
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(Rc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// `package::Name`, or the bare name outside a package.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}::{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn skip(&self) -> Option<&Skip> {
        self.skip.as_ref()
    }

    pub fn configuration(&self) -> Option<TestConfiguration> {
        self.configuration.as_ref().map(|factory| factory())
    }

    pub fn callbacks(&self) -> &[CallbackDecl] {
        &self.callbacks
    }

    pub fn extensions(&self) -> &[Rc<dyn Extension>] {
        &self.extensions
    }

    pub fn sources(&self) -> &[ParameterSource] {
        &self.sources
    }

    pub fn methods(&self) -> &[Rc<MethodDecl>] {
        &self.methods
    }

    pub fn find_method(&self, method: &str) -> Option<&Rc<MethodDecl>> {
        self.methods.iter().find(|m| m.method() == method)
    }
}

impl std::fmt::Debug for TestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClass")
            .field("name", &self.name)
            .field("package", &self.package)
            .field("modifiers", &self.modifiers)
            .field("skip", &self.skip)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::ExpectedToBe;

    fn adds_one(tc: &mut TestCase<i32, i32>, (a, b): (i32, i32)) -> Result<(), GiwtError> {
        tc.given_value("a", a)?
            .when("adding 1", |v| v + 1)
            .then("is b", move |r| r.should_be(ExpectedToBe::equal_to(b)).verify());
        Ok(())
    }

    #[test]
    fn body_tails_convert_to_unit_results() {
        assert!(().into_unit_result().is_ok());
        assert!(Ok::<(), GiwtError>(()).into_unit_result().is_ok());
        let tail: Result<(), DefinitionError> =
            Err(DefinitionError::NoParameterSource("sums".into()));
        assert!(matches!(
            tail.into_unit_result(),
            Err(GiwtError::Definition(DefinitionError::NoParameterSource(_)))
        ));
    }

    #[test]
    fn test_name_falls_back_to_template_then_method() {
        let plain = MethodDecl::test("checkout", |_: &mut TestCase<(), ()>| Ok(()));
        assert_eq!(plain.test_name(), "checkout");
        assert_eq!(plain.clone().named("").test_name(), "checkout");
        assert_eq!(plain.named("Checkout flow").test_name(), "Checkout flow");

        let param = MethodDecl::parameterized("adds", "{0}+1={1}", "sums", adds_one);
        assert_eq!(param.test_name(), "{0}+1={1}");
    }

    #[test]
    fn parameterized_signature_lists_tuple_types() {
        let param = MethodDecl::parameterized("adds", "", "sums", adds_one);
        assert_eq!(
            param.signature().args,
            vec![
                ArgType::TestCase,
                ArgType::Value("i32".into()),
                ArgType::Value("i32".into())
            ]
        );
    }

    #[test]
    fn invoke_runs_the_case_and_reports_statements() {
        let param = MethodDecl::parameterized("adds", "{0}+1={1}", "sums", adds_one);
        let ok = param.invoke(&UnitInvocation {
            name: "1+1=2".into(),
            parameters: Some(ParamTuple::new((1, 2))),
        });
        assert!(ok.result.is_ok());
        assert_eq!(ok.statements.len(), 3);

        let failed = param.invoke(&UnitInvocation {
            name: "1+1=3".into(),
            parameters: Some(ParamTuple::new((1, 3))),
        });
        let failure = failed.result.unwrap_err();
        assert!(failure.reason().contains("Expected : 3"), "{}", failure.reason());
    }

    #[test]
    fn mismatched_tuple_type_fails_the_unit() {
        let param = MethodDecl::parameterized("adds", "", "sums", adds_one);
        let outcome = param.invoke(&UnitInvocation {
            name: "wrong".into(),
            parameters: Some(ParamTuple::new(("x".to_string(),))),
        });
        assert!(matches!(
            outcome.result,
            Err(UnitFailure::Error(GiwtError::Definition(_)))
        ));
    }

    #[test]
    fn panicking_body_is_a_panic_failure() {
        let method = MethodDecl::test("boom", |_: &mut TestCase<(), ()>| -> Result<(), GiwtError> {
            panic!("body exploded")
        });
        let outcome = method.invoke(&UnitInvocation {
            name: "boom".into(),
            parameters: None,
        });
        match outcome.result {
            Err(UnitFailure::Panic(panic)) => assert_eq!(panic.message, "body exploded"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn configuration_exclusion_accepts_simple_or_qualified_names() {
        let class = TestClass::new("Checkout").package("shop");
        assert!(TestConfiguration::new()
            .exclude_from_report("Checkout")
            .excludes(&class));
        assert!(TestConfiguration::new()
            .exclude_from_report("shop::Checkout")
            .excludes(&class));
        assert!(!TestConfiguration::new().excludes(&class));
    }
}
