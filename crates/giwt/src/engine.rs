//! Discovery and execution of registered test classes.
//!
//! Discovery validates the declarations selected by a list of [`Selector`]s
//! and builds a [`TestPlan`]. Execution walks the plan depth first: class
//! callbacks around the class subtree, per-unit callbacks around every unit,
//! one fresh [`TestCase`](crate::case::TestCase) per unit. A failing unit never
//! stops its siblings.

use std::collections::HashSet;
use std::rc::Rc;

use crate::capture;
use crate::class::{MethodDecl, MethodKind, TestClass, UnitFailure, UnitInvocation};
use crate::descriptor::{NodeKind, Selector, TestDescriptor, TestPlan, UniqueId, UnitTarget};
use crate::errors::{DefinitionError, DefinitionErrors, GiwtError};
use crate::listener::{ExecutionListener, FailureInfo, TestExecutionResult};
use crate::params::TypeEquivalences;
use crate::registry::{ClassContext, ContextRegistry, Hook};
use crate::report::{ReportSink, TestCaseReport, TestReport};
use crate::statement::DescriptionItem;
use crate::validate::{
    check_duplicate_names, validate_class, validate_parameterized, validate_test_method,
};

/// Counts of one run, the failures as `path: reason`, and the report.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunResult {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
    pub report: TestCaseReport,
}

impl RunResult {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// A discovered plan and the definition errors of the classes left out of it.
#[derive(Debug)]
pub struct Discovery {
    pub plan: TestPlan,
    pub errors: Vec<DefinitionError>,
}

impl Discovery {
    pub fn check(&self) -> Result<(), DefinitionErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DefinitionErrors(self.errors.clone()))
        }
    }
}

/// Whether a unit's class callbacks already ran around its class node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackScope {
    /// The method was selected on its own; class callbacks run around it.
    StandaloneMethod,
    UnderClass,
}

pub struct Engine {
    classes: Vec<Rc<TestClass>>,
    equivalences: TypeEquivalences,
}

impl Engine {
    pub fn new(classes: impl IntoIterator<Item = TestClass>) -> Self {
        Engine {
            classes: classes.into_iter().map(Rc::new).collect(),
            equivalences: TypeEquivalences::numeric_widening(),
        }
    }

    /// Type names accepted as equivalent when checking parameterized
    /// arguments; numeric widening unless replaced.
    pub fn with_equivalences(mut self, equivalences: TypeEquivalences) -> Self {
        self.equivalences = equivalences;
        self
    }

    pub fn classes(&self) -> &[Rc<TestClass>] {
        &self.classes
    }

    fn find_class(&self, name: &str) -> Option<&Rc<TestClass>> {
        self.classes
            .iter()
            .find(|class| class.name() == name || class.qualified_name() == name)
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Qualified names of the classes some class-level selector picks as a
    /// whole; method selectors inside them add nothing.
    fn covered_classes(&self, selectors: &[Selector]) -> HashSet<String> {
        let mut covered = HashSet::new();
        for selector in selectors {
            let picked: Vec<&Rc<TestClass>> = match selector {
                Selector::All => self.classes.iter().collect(),
                Selector::Package(package) => self
                    .classes
                    .iter()
                    .filter(|class| class.package_name() == Some(package.as_str()))
                    .collect(),
                Selector::Class(name) => self.find_class(name).into_iter().collect(),
                Selector::Method { .. } => Vec::new(),
            };
            covered.extend(picked.into_iter().map(|class| class.qualified_name()));
        }
        covered
    }

    pub fn discover(&self, selectors: &[Selector], registry: &mut ContextRegistry) -> Discovery {
        let mut discovery = Discovering {
            engine: self,
            registry,
            errors: Vec::new(),
            seen: HashSet::new(),
            covered: self.covered_classes(selectors),
            seen_methods: HashSet::new(),
        };
        let mut root = TestDescriptor::root();
        for selector in selectors {
            match selector {
                Selector::All => {
                    for class in &self.classes {
                        discovery.append_class(&mut root, class);
                    }
                }
                Selector::Package(package) => {
                    let mut node = TestDescriptor::package(root.id(), package);
                    for class in self
                        .classes
                        .iter()
                        .filter(|class| class.package_name() == Some(package.as_str()))
                    {
                        discovery.append_class(&mut node, class);
                    }
                    if !node.children().is_empty() {
                        root.push_child(node);
                    }
                }
                Selector::Class(name) => match self.find_class(name) {
                    Some(class) => discovery.append_class(&mut root, class),
                    None => tracing::warn!(class = %name, "no such test class"),
                },
                Selector::Method { class, method } => {
                    let found = self
                        .find_class(class)
                        .and_then(|c| c.find_method(method).map(|m| (c, m)));
                    match found {
                        Some((class, method)) => discovery.append_method(&mut root, class, method),
                        None => tracing::warn!(class = %class, method = %method, "no such test method"),
                    }
                }
            }
        }

        let Discovering {
            registry, errors, ..
        } = discovery;
        let reported = root
            .classes()
            .into_iter()
            .filter(|name| {
                self.classes
                    .iter()
                    .find(|class| &class.qualified_name() == name)
                    .is_some_and(|class| registry.context(class).is_reported())
            })
            .collect();
        let plan = TestPlan::new(root, reported);
        tracing::info!(
            units = plan.unit_count(),
            errors = errors.len(),
            "discovery finished"
        );
        Discovery { plan, errors }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    pub fn execute(
        &self,
        plan: &TestPlan,
        registry: &mut ContextRegistry,
        listener: &mut dyn ExecutionListener,
        sink: Option<&mut dyn ReportSink>,
    ) -> Result<RunResult, GiwtError> {
        let mut execution = Execution {
            registry,
            listener,
            result: RunResult::default(),
        };
        execution.walk(plan.root(), &mut Vec::new(), CallbackScope::StandaloneMethod);
        let result = execution.result;

        let expected = plan.reported_classes().len();
        if result.report.len() == expected {
            if let Some(sink) = sink {
                sink.process(&result.report.document())?;
            }
        } else {
            tracing::warn!(
                expected,
                received = result.report.len(),
                "report incomplete, not generated"
            );
        }
        tracing::info!(
            passed = result.passed,
            failed = result.failed,
            skipped = result.skipped,
            "run finished"
        );
        Ok(result)
    }
}

// ============================================================================
// Discovery walk
// ============================================================================

struct Discovering<'e, 'r> {
    engine: &'e Engine,
    registry: &'r mut ContextRegistry,
    errors: Vec<DefinitionError>,
    seen: HashSet<String>,
    covered: HashSet<String>,
    seen_methods: HashSet<(String, String)>,
}

impl Discovering<'_, '_> {
    fn reject(&mut self, class: &TestClass, error: DefinitionError) {
        tracing::warn!(class = %class.qualified_name(), %error, "test class rejected");
        self.registry.evict(&class.qualified_name());
        self.errors.push(error);
    }

    fn append_class(&mut self, parent: &mut TestDescriptor, class: &Rc<TestClass>) {
        if !self.seen.insert(class.qualified_name()) {
            return;
        }
        match self.class_node(parent.id(), class) {
            Ok(Some(node)) => {
                tracing::info!(class = %class.qualified_name(), units = node.leaves().len(), "discovered test class");
                parent.push_child(node);
            }
            Ok(None) => tracing::debug!(class = %class.qualified_name(), "not a test class"),
            Err(error) => self.reject(class, error),
        }
    }

    fn class_node(
        &mut self,
        parent: &UniqueId,
        class: &Rc<TestClass>,
    ) -> Result<Option<TestDescriptor>, DefinitionError> {
        validate_class(class)?;
        if class.methods().is_empty() {
            return Ok(None);
        }
        check_duplicate_names(class)?;
        let mut node = TestDescriptor::class(parent, class.clone());
        let context = self.registry.context(class);
        for method in class.methods() {
            let child = method_node(node.id(), class, method, context, &self.engine.equivalences)?;
            context.add_test_method(method.clone());
            node.push_child(child);
        }
        Ok(Some(node))
    }

    fn append_method(
        &mut self,
        root: &mut TestDescriptor,
        class: &Rc<TestClass>,
        method: &Rc<MethodDecl>,
    ) {
        let class_name = class.qualified_name();
        if self.covered.contains(&class_name)
            || !self
                .seen_methods
                .insert((class_name, method.method().to_string()))
        {
            tracing::debug!(class = %class.qualified_name(), method = %method.method(), "method already selected");
            return;
        }
        let node = validate_class(class)
            .and_then(|()| check_duplicate_names(class))
            .and_then(|()| {
                let context = self.registry.context(class);
                let node = method_node(root.id(), class, method, context, &self.engine.equivalences)?;
                context.add_test_method(method.clone());
                Ok(node)
            });
        match node {
            Ok(node) => root.push_child(node),
            Err(error) => self.reject(class, error),
        }
    }
}

fn method_node(
    parent: &UniqueId,
    class: &Rc<TestClass>,
    method: &Rc<MethodDecl>,
    context: &mut ClassContext,
    equivalences: &TypeEquivalences,
) -> Result<TestDescriptor, DefinitionError> {
    match method.kind() {
        MethodKind::Test => {
            validate_test_method(method)?;
            Ok(TestDescriptor::method(parent, class.clone(), method.clone()))
        }
        MethodKind::Parameterized { template, .. } => {
            let parameters = validate_parameterized(method, context, equivalences)?;
            let mut node = TestDescriptor::parameterized(parent, class.clone(), method.clone());
            for (index, tuple) in parameters.tuples().iter().enumerate() {
                let target = UnitTarget {
                    class: class.clone(),
                    method: method.clone(),
                    parameters: Some(tuple.clone()),
                };
                let instance = TestDescriptor::instance(node.id(), index, template, target);
                node.push_child(instance);
            }
            Ok(node)
        }
    }
}

// ============================================================================
// Execution walk
// ============================================================================

struct Execution<'r, 'l> {
    registry: &'r mut ContextRegistry,
    listener: &'l mut dyn ExecutionListener,
    result: RunResult,
}

/// Runs every hook in order, stopping at the first panic.
fn run_hooks(hooks: &[Hook]) -> Result<(), UnitFailure> {
    for hook in hooks {
        capture::catch(|| (hook.run)()).map_err(UnitFailure::Panic)?;
    }
    Ok(())
}

fn failure_info(failure: &UnitFailure) -> FailureInfo {
    FailureInfo {
        reason: failure.reason(),
        trace: failure.trace(),
    }
}

impl Execution<'_, '_> {
    fn walk(&mut self, node: &TestDescriptor, path: &mut Vec<String>, scope: CallbackScope) {
        match node.kind() {
            NodeKind::Root => {
                self.listener.started(node);
                for child in node.children() {
                    self.walk(child, path, scope);
                }
                self.listener.finished(node, &TestExecutionResult::default());
            }
            NodeKind::Package(_) => self.container(node, path, scope),
            NodeKind::Class(class) => self.class(node, class, path),
            NodeKind::ParameterizedMethod { class, .. } => {
                self.container(node, path, scope);
                if scope == CallbackScope::StandaloneMethod {
                    self.registry.evict(&class.qualified_name());
                }
            }
            NodeKind::Method(target) => {
                self.unit(node, target, path, scope);
                if scope == CallbackScope::StandaloneMethod {
                    self.registry.evict(&target.class.qualified_name());
                }
            }
            NodeKind::ParameterizedInstance(target) => self.unit(node, target, path, scope),
        }
    }

    fn container(&mut self, node: &TestDescriptor, path: &mut Vec<String>, scope: CallbackScope) {
        self.listener.started(node);
        path.push(node.display_name().to_string());
        for child in node.children() {
            self.walk(child, path, scope);
        }
        path.pop();
        self.listener.finished(node, &TestExecutionResult::default());
    }

    fn class(&mut self, node: &TestDescriptor, class: &Rc<TestClass>, path: &mut Vec<String>) {
        let name = class.qualified_name();
        self.listener.started(node);
        path.push(node.display_name().to_string());
        let callbacks = self.registry.context(class).callbacks();

        match run_hooks(&callbacks.before_all) {
            Ok(()) => {
                for child in node.children() {
                    self.walk(child, path, CallbackScope::UnderClass);
                }
            }
            Err(failure) => {
                tracing::error!(class = %name, reason = %failure.reason(), "before_all callback failed");
                let info = FailureInfo {
                    reason: format!("before_all callback failed: {}", failure.reason()),
                    trace: failure.trace(),
                };
                for leaf in node.leaves() {
                    if let Some(target) = leaf.target() {
                        self.listener.started(leaf);
                        self.record_failure(leaf, target, path, Vec::new(), info.clone());
                    }
                }
            }
        }

        let teardown = run_hooks(&callbacks.after_all);
        path.pop();
        self.registry.evict(&name);
        let result = match teardown {
            Ok(()) => TestExecutionResult::default(),
            Err(failure) => {
                tracing::error!(class = %name, reason = %failure.reason(), "after_all callback failed");
                TestExecutionResult::failed(Vec::new(), failure_info(&failure))
            }
        };
        self.listener.finished(node, &result);
    }

    fn unit(
        &mut self,
        node: &TestDescriptor,
        target: &UnitTarget,
        path: &mut Vec<String>,
        scope: CallbackScope,
    ) {
        self.listener.started(node);
        if let Some(skip) = target.method.skip().or(target.class.skip()) {
            self.listener.skipped(node, skip.reason());
            self.result.skipped += 1;
            if self.is_reported(&target.class) {
                self.result
                    .report
                    .class_report(&target.class.qualified_name())
                    .add_test_report(TestReport::skipped(node.display_name()));
            }
            return;
        }

        let callbacks = self.registry.context(&target.class).callbacks();
        let standalone = scope == CallbackScope::StandaloneMethod;
        let mut statements = Vec::new();

        let mut outcome = if standalone {
            run_hooks(&callbacks.before_all)
        } else {
            Ok(())
        };
        if outcome.is_ok() {
            outcome = run_hooks(&callbacks.before_each).and_then(|()| {
                let ran = target.method.invoke(&UnitInvocation {
                    name: node.display_name().to_string(),
                    parameters: target.parameters.clone(),
                });
                statements = ran.statements.iter().map(DescriptionItem::from).collect();
                ran.result
            });
            let after_each = run_hooks(&callbacks.after_each);
            outcome = outcome.and(after_each);
        }
        if standalone {
            let after_all = run_hooks(&callbacks.after_all);
            outcome = outcome.and(after_all);
        }

        match outcome {
            Ok(()) => {
                self.result.passed += 1;
                if self.is_reported(&target.class) {
                    self.result
                        .report
                        .class_report(&target.class.qualified_name())
                        .add_test_report(TestReport::success(node.display_name(), statements.clone()));
                }
                self.listener
                    .finished(node, &TestExecutionResult::successful(statements));
            }
            Err(failure) => {
                tracing::debug!(unit = %node.display_name(), reason = %failure.reason(), "unit failed");
                self.record_failure(node, target, path, statements, failure_info(&failure));
            }
        }
    }

    fn record_failure(
        &mut self,
        node: &TestDescriptor,
        target: &UnitTarget,
        path: &[String],
        statements: Vec<DescriptionItem>,
        info: FailureInfo,
    ) {
        let mut full_path = path.to_vec();
        full_path.push(node.display_name().to_string());
        self.result.failed += 1;
        self.result
            .failures
            .push(format!("{}: {}", full_path.join(" > "), info.reason));
        if self.is_reported(&target.class) {
            self.result
                .report
                .class_report(&target.class.qualified_name())
                .add_test_report(TestReport::failure(
                    node.display_name(),
                    statements.clone(),
                    info.reason.clone(),
                    info.trace.clone(),
                ));
        }
        self.listener
            .finished(node, &TestExecutionResult::failed(statements, info));
    }

    fn is_reported(&mut self, class: &Rc<TestClass>) -> bool {
        self.registry.context(class).is_reported()
    }
}
