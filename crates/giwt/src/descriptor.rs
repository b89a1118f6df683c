//! The discovered test plan: a tree of descriptors.
//!
//! ```text
//! [engine:giwt]
//!   [class:shop::Checkout]
//!     [method:checkout]
//!     [parameterized:adds]
//!       [instance:#0]
//!       [instance:#1]
//!   [method:refund]            (selected on its own)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::class::{MethodDecl, TestClass};
use crate::params::ParamTuple;

pub const ENGINE_ID: &str = "giwt";

/// Path of typed segments identifying a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueId {
    segments: Vec<(String, String)>,
}

impl UniqueId {
    pub fn root() -> Self {
        UniqueId {
            segments: vec![("engine".to_string(), ENGINE_ID.to_string())],
        }
    }

    pub fn append(&self, kind: &str, value: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push((kind.to_string(), value.into()));
        UniqueId { segments }
    }

    pub fn last_value(&self) -> &str {
        self.segments.last().map_or("", |(_, value)| value.as_str())
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .segments
            .iter()
            .map(|(kind, value)| format!("[{kind}:{value}]"))
            .collect::<Vec<String>>();
        f.write_str(&parts.join("/"))
    }
}

/// What an executable leaf runs.
#[derive(Debug, Clone)]
pub struct UnitTarget {
    pub class: Rc<TestClass>,
    pub method: Rc<MethodDecl>,
    pub parameters: Option<ParamTuple>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Package(String),
    Class(Rc<TestClass>),
    Method(UnitTarget),
    ParameterizedMethod {
        class: Rc<TestClass>,
        method: Rc<MethodDecl>,
    },
    ParameterizedInstance(UnitTarget),
}

/// One node of the test plan.
#[derive(Debug, Clone)]
pub struct TestDescriptor {
    id: UniqueId,
    display_name: String,
    kind: NodeKind,
    children: Vec<TestDescriptor>,
}

impl TestDescriptor {
    pub fn root() -> Self {
        TestDescriptor {
            id: UniqueId::root(),
            display_name: "giwt".to_string(),
            kind: NodeKind::Root,
            children: Vec::new(),
        }
    }

    pub fn package(parent: &UniqueId, package: &str) -> Self {
        TestDescriptor {
            id: parent.append("package", package),
            display_name: package.to_string(),
            kind: NodeKind::Package(package.to_string()),
            children: Vec::new(),
        }
    }

    pub fn class(parent: &UniqueId, class: Rc<TestClass>) -> Self {
        TestDescriptor {
            id: parent.append("class", class.qualified_name()),
            display_name: class.name().to_string(),
            kind: NodeKind::Class(class),
            children: Vec::new(),
        }
    }

    pub fn method(parent: &UniqueId, class: Rc<TestClass>, method: Rc<MethodDecl>) -> Self {
        TestDescriptor {
            id: parent.append("method", method.method()),
            display_name: method.test_name().to_string(),
            kind: NodeKind::Method(UnitTarget {
                class,
                method,
                parameters: None,
            }),
            children: Vec::new(),
        }
    }

    pub fn parameterized(parent: &UniqueId, class: Rc<TestClass>, method: Rc<MethodDecl>) -> Self {
        TestDescriptor {
            id: parent.append("parameterized", method.method()),
            display_name: method.method().to_string(),
            kind: NodeKind::ParameterizedMethod { class, method },
            children: Vec::new(),
        }
    }

    /// Instance `index` of a parameterized method; `template` names it.
    pub fn instance(
        parent: &UniqueId,
        index: usize,
        template: &str,
        target: UnitTarget,
    ) -> Self {
        let display_name = match &target.parameters {
            Some(tuple) if !template.is_empty() => tuple.format_name(template),
            Some(tuple) => format!(
                "{}[{}]",
                target.method.method(),
                tuple.display_values().join(", ")
            ),
            None => target.method.test_name().to_string(),
        };
        TestDescriptor {
            id: parent.append("instance", format!("#{index}")),
            display_name,
            kind: NodeKind::ParameterizedInstance(target),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &UniqueId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[TestDescriptor] {
        &self.children
    }

    pub fn push_child(&mut self, child: TestDescriptor) {
        self.children.push(child);
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Method(_) | NodeKind::ParameterizedInstance(_)
        )
    }

    /// The unit run by this node, for leaves.
    pub fn target(&self) -> Option<&UnitTarget> {
        match &self.kind {
            NodeKind::Method(target) | NodeKind::ParameterizedInstance(target) => Some(target),
            _ => None,
        }
    }

    /// Every leaf below (or at) this node, depth first.
    pub fn leaves(&self) -> Vec<&TestDescriptor> {
        if self.is_leaf() {
            return vec![self];
        }
        self.children.iter().flat_map(TestDescriptor::leaves).collect()
    }

    /// Leaf paths joined with ` > `, as printed by `--list`.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        let named = !matches!(self.kind, NodeKind::Root);
        if named {
            prefix.push(self.display_name.clone());
        }
        if self.is_leaf() {
            out.push(prefix.join(" > "));
        }
        for child in &self.children {
            child.collect_paths(prefix, out);
        }
        if named {
            prefix.pop();
        }
    }

    /// Keeps the leaves whose path contains `filter` (case-insensitive) and
    /// drops containers left empty. Returns whether anything is left.
    pub fn retain_matching(&mut self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.retain_under(&mut Vec::new(), &filter)
    }

    fn retain_under(&mut self, prefix: &mut Vec<String>, filter: &str) -> bool {
        let named = !matches!(self.kind, NodeKind::Root);
        if named {
            prefix.push(self.display_name.clone());
        }
        let keep = if self.is_leaf() {
            prefix.join(" > ").to_lowercase().contains(filter)
        } else {
            self.children.retain_mut(|child| child.retain_under(prefix, filter));
            !self.children.is_empty()
        };
        if named {
            prefix.pop();
        }
        keep
    }

    /// Qualified names of the classes owning a leaf of this tree.
    pub fn classes(&self) -> IndexSet<String> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| leaf.target())
            .map(|target| target.class.qualified_name())
            .collect()
    }
}

/// Which part of the registered classes to discover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every registered class, each directly under the root.
    All,
    /// The classes of one package, grouped under a package node.
    Package(String),
    /// One class, by simple or qualified name.
    Class(String),
    /// One method run on its own, without its class node.
    Method { class: String, method: String },
}

/// The tree to execute and the classes expected in its report.
#[derive(Debug, Clone)]
pub struct TestPlan {
    root: TestDescriptor,
    reported: IndexSet<String>,
}

impl TestPlan {
    pub fn new(root: TestDescriptor, reported: IndexSet<String>) -> Self {
        TestPlan { root, reported }
    }

    pub fn root(&self) -> &TestDescriptor {
        &self.root
    }

    /// Qualified names of the classes that will get a class report.
    pub fn reported_classes(&self) -> &IndexSet<String> {
        &self.reported
    }

    pub fn unit_count(&self) -> usize {
        self.root.leaves().len()
    }

    /// Applies a path filter to the plan.
    pub fn retain_matching(&mut self, filter: &str) {
        self.root.retain_matching(filter);
        let remaining: HashSet<String> = self.root.classes().into_iter().collect();
        self.reported.retain(|class| remaining.contains(class));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestCase;
    use crate::errors::GiwtError;

    fn noop(_: &mut TestCase<(), ()>) -> Result<(), GiwtError> {
        Ok(())
    }

    fn sample() -> TestDescriptor {
        let class = Rc::new(
            TestClass::new("Checkout")
                .package("shop")
                .test("pays", noop)
                .test("refunds", noop),
        );
        let mut root = TestDescriptor::root();
        let mut node = TestDescriptor::class(root.id(), class.clone());
        for method in class.methods() {
            let child = TestDescriptor::method(node.id(), class.clone(), method.clone());
            node.push_child(child);
        }
        root.push_child(node);
        root
    }

    #[test]
    fn ids_render_as_typed_segments() {
        let root = sample();
        let leaf = root.leaves()[0];
        assert_eq!(
            leaf.id().to_string(),
            "[engine:giwt]/[class:shop::Checkout]/[method:pays]"
        );
        assert_eq!(leaf.id().last_value(), "pays");
    }

    #[test]
    fn paths_join_display_names() {
        assert_eq!(
            sample().paths(),
            vec!["Checkout > pays".to_string(), "Checkout > refunds".to_string()]
        );
    }

    #[test]
    fn filter_prunes_leaves_and_empty_containers() {
        let mut root = sample();
        assert!(root.retain_matching("REFUND"));
        assert_eq!(root.paths(), vec!["Checkout > refunds".to_string()]);
        assert!(!root.retain_matching("nothing"));
        assert!(root.children().is_empty());
    }
}
