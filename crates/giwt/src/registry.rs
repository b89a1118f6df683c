//! Per-class state built lazily during one discovery/execution pass.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::{CallbackKind, MethodDecl, ParameterSource, TestClass, TestConfiguration};
use crate::errors::DefinitionError;
use crate::params::ParameterSet;

/// A callback ready to run, with the order it was sorted by.
#[derive(Clone)]
pub struct Hook {
    pub order: i32,
    pub run: Rc<dyn Fn()>,
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook").field("order", &self.order).finish()
    }
}

/// The four callback lists of a class, each sorted by ascending order.
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    pub before_all: Vec<Hook>,
    pub after_all: Vec<Hook>,
    pub before_each: Vec<Hook>,
    pub after_each: Vec<Hook>,
}

impl Callbacks {
    /// Class callbacks sorted by order, then every extension's callbacks.
    pub fn resolve(class: &TestClass) -> Self {
        let mut callbacks = Callbacks::default();
        let mut declared = class.callbacks().to_vec();
        declared.sort_by_key(|c| c.order);
        for decl in declared {
            let hook = Hook {
                order: decl.order,
                run: decl.run,
            };
            callbacks.list_mut(decl.kind).push(hook);
        }
        for extension in class.extensions() {
            let (a, b, c, d) = (
                extension.clone(),
                extension.clone(),
                extension.clone(),
                extension.clone(),
            );
            callbacks.before_all.push(Hook {
                order: 0,
                run: Rc::new(move || a.before_all()),
            });
            callbacks.after_all.push(Hook {
                order: 0,
                run: Rc::new(move || b.after_all()),
            });
            callbacks.before_each.push(Hook {
                order: 0,
                run: Rc::new(move || c.before_each()),
            });
            callbacks.after_each.push(Hook {
                order: 0,
                run: Rc::new(move || d.after_each()),
            });
        }
        callbacks
    }

    fn list_mut(&mut self, kind: CallbackKind) -> &mut Vec<Hook> {
        match kind {
            CallbackKind::BeforeAll => &mut self.before_all,
            CallbackKind::AfterAll => &mut self.after_all,
            CallbackKind::BeforeEach => &mut self.before_each,
            CallbackKind::AfterEach => &mut self.after_each,
        }
    }

    pub fn get(&self, kind: CallbackKind) -> &[Hook] {
        match kind {
            CallbackKind::BeforeAll => &self.before_all,
            CallbackKind::AfterAll => &self.after_all,
            CallbackKind::BeforeEach => &self.before_each,
            CallbackKind::AfterEach => &self.after_each,
        }
    }
}

/// Everything the engine derived from one class.
pub struct ClassContext {
    class: Rc<TestClass>,
    configuration: Option<TestConfiguration>,
    callbacks: Rc<Callbacks>,
    parameters: HashMap<String, Rc<ParameterSet>>,
    test_methods: Vec<Rc<MethodDecl>>,
}

impl ClassContext {
    fn new(class: Rc<TestClass>) -> Self {
        tracing::debug!(class = %class.qualified_name(), "building class context");
        ClassContext {
            configuration: class.configuration(),
            callbacks: Rc::new(Callbacks::resolve(&class)),
            class,
            parameters: HashMap::new(),
            test_methods: Vec::new(),
        }
    }

    pub fn class(&self) -> &Rc<TestClass> {
        &self.class
    }

    pub fn configuration(&self) -> Option<&TestConfiguration> {
        self.configuration.as_ref()
    }

    pub fn callbacks(&self) -> Rc<Callbacks> {
        self.callbacks.clone()
    }

    /// Whether the class shows up in the report.
    pub fn is_reported(&self) -> bool {
        !self
            .configuration
            .as_ref()
            .is_some_and(|config| config.excludes(&self.class))
    }

    pub fn add_test_method(&mut self, method: Rc<MethodDecl>) {
        self.test_methods.push(method);
    }

    pub fn test_methods(&self) -> &[Rc<MethodDecl>] {
        &self.test_methods
    }

    /// Finds the parameter source named `name`: the class's own sources
    /// first, then the configuration's.
    pub fn find_source(&self, name: &str) -> Result<&ParameterSource, DefinitionError> {
        let own = matching_sources(self.class.sources(), name);
        let candidates = if own.is_empty() {
            self.configuration
                .as_ref()
                .map(|config| matching_sources(config.sources(), name))
                .unwrap_or_default()
        } else {
            own
        };
        match candidates.as_slice() {
            [] => Err(DefinitionError::NoParameterSource(name.to_string())),
            [source] => Ok(*source),
            _ => Err(DefinitionError::MultipleParameterSources(name.to_string())),
        }
    }

    /// Parameters of `method`, taken from `source` once and then cached.
    pub fn parameters(&mut self, method: &str, source: &str) -> Result<Rc<ParameterSet>, DefinitionError> {
        if let Some(set) = self.parameters.get(method) {
            return Ok(set.clone());
        }
        let set = Rc::new(self.find_source(source)?.provide());
        tracing::debug!(method, source, tuples = set.len(), "resolved parameters");
        self.parameters.insert(method.to_string(), set.clone());
        Ok(set)
    }
}

fn matching_sources<'a>(sources: &'a [ParameterSource], name: &str) -> Vec<&'a ParameterSource> {
    sources
        .iter()
        .filter(|source| source.resolved_name() == name)
        .collect()
}

/// Class contexts keyed by qualified class name, scoped to one run.
#[derive(Default)]
pub struct ContextRegistry {
    contexts: IndexMap<String, ClassContext>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        ContextRegistry::default()
    }

    /// The context of `class`, built on first use.
    pub fn context(&mut self, class: &Rc<TestClass>) -> &mut ClassContext {
        self.contexts
            .entry(class.qualified_name())
            .or_insert_with(|| ClassContext::new(class.clone()))
    }

    pub fn contains(&self, class: &str) -> bool {
        self.contexts.contains_key(class)
    }

    /// Drops the context of a class whose subtree is done.
    pub fn evict(&mut self, class: &str) {
        if self.contexts.shift_remove(class).is_some() {
            tracing::debug!(class, "evicted class context");
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TestParameters;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    fn ordered_class(log: &Rc<RefCell<Vec<i32>>>) -> Rc<TestClass> {
        let mut class = TestClass::new("Ordered");
        for order in [3, -1, 2, 0] {
            let log = log.clone();
            class = class.callback(CallbackKind::BeforeEach, order, move || {
                log.borrow_mut().push(order)
            });
        }
        Rc::new(class)
    }

    #[test]
    fn callbacks_run_in_ascending_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = ordered_class(&log);
        let mut registry = ContextRegistry::new();
        let callbacks = registry.context(&class).callbacks();
        for hook in callbacks.get(CallbackKind::BeforeEach) {
            (hook.run)();
        }
        assert_eq!(*log.borrow(), vec![-1, 0, 2, 3]);
    }

    #[test]
    fn resolution_is_idempotent_across_evictions() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = ordered_class(&log);
        let mut registry = ContextRegistry::new();
        let orders = |cb: &Callbacks| -> Vec<i32> {
            cb.before_each.iter().map(|h| h.order).collect()
        };
        let first = orders(&registry.context(&class).callbacks());
        registry.evict("Ordered");
        assert!(registry.is_empty());
        let second = orders(&registry.context(&class).callbacks());
        assert_eq!(first, second);
    }

    #[test]
    fn configuration_factory_runs_once_per_context() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let class = Rc::new(TestClass::new("Configured").configure_with(move || {
            counter.set(counter.get() + 1);
            TestConfiguration::new()
        }));
        let mut registry = ContextRegistry::new();
        registry.context(&class);
        registry.context(&class);
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn sources_resolve_from_class_then_configuration() {
        let class = Rc::new(
            TestClass::new("Sources")
                .parameter_source("own", || TestParameters::of([(1,)]))
                .configure_with(|| {
                    TestConfiguration::new()
                        .parameter_source("shared", || TestParameters::of([(2,), (3,)]))
                        .parameter_source("twice", || TestParameters::of([(1,)]))
                        .parameter_source("twice", || TestParameters::of([(2,)]))
                }),
        );
        let mut registry = ContextRegistry::new();
        let context = registry.context(&class);
        assert_eq!(context.parameters("a", "own").unwrap().len(), 1);
        assert_eq!(context.parameters("b", "shared").unwrap().len(), 2);
        assert_eq!(
            context.parameters("c", "missing").unwrap_err(),
            DefinitionError::NoParameterSource("missing".into())
        );
        assert_eq!(
            context.parameters("d", "twice").unwrap_err(),
            DefinitionError::MultipleParameterSources("twice".into())
        );
    }

    #[test]
    fn parameters_are_cached_per_method() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let class = Rc::new(TestClass::new("Cached").parameter_source("src", move || {
            counter.set(counter.get() + 1);
            TestParameters::of([(1,)])
        }));
        let mut registry = ContextRegistry::new();
        let context = registry.context(&class);
        context.parameters("m", "src").unwrap();
        context.parameters("m", "src").unwrap();
        assert_eq!(calls.get(), 1);
    }
}
