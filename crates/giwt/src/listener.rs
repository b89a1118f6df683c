//! Execution events and the listeners that consume them.
//!
//! [`ConsoleListener`] prints an indented tree:
//!
//! ```text
//! Checkout
//!   ✓ pays
//!   adds
//!     ✓ 1+1=2
//!     ✗ 1+1=3
//!       Error: Expected value to be <3> but got <2>
//!   - refunds (not yet)
//! ```

use std::io::{self, Write};
use std::time::Duration;

use crate::descriptor::{NodeKind, TestDescriptor};
use crate::engine::RunResult;
use crate::statement::DescriptionItem;

/// Why a unit failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub reason: String,
    pub trace: Vec<String>,
}

/// How a node finished. Containers always finish without a failure unless a
/// class callback failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestExecutionResult {
    pub statements: Vec<DescriptionItem>,
    pub failure: Option<FailureInfo>,
}

impl TestExecutionResult {
    pub fn successful(statements: Vec<DescriptionItem>) -> Self {
        TestExecutionResult {
            statements,
            failure: None,
        }
    }

    pub fn failed(statements: Vec<DescriptionItem>, failure: FailureInfo) -> Self {
        TestExecutionResult {
            statements,
            failure: Some(failure),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.failure.is_none()
    }
}

pub trait ExecutionListener {
    fn started(&mut self, _node: &TestDescriptor) {}

    fn skipped(&mut self, _node: &TestDescriptor, _reason: &str) {}

    fn finished(&mut self, _node: &TestDescriptor, _result: &TestExecutionResult) {}
}

// ============================================================================
// Console
// ============================================================================

/// Prints the tree of executed nodes to a writer (stdout by default).
pub struct ConsoleListener<W: Write = io::Stdout> {
    out: W,
    depth: usize,
    verbose: bool,
}

impl ConsoleListener {
    pub fn stdout(verbose: bool) -> Self {
        ConsoleListener::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleListener<W> {
    /// With `verbose`, every unit's statements are printed under it.
    pub fn new(out: W, verbose: bool) -> Self {
        ConsoleListener {
            out,
            depth: 0,
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    fn line(&mut self, text: &str) {
        // Console output is best effort.
        let _ = writeln!(self.out, "{}{text}", self.indent());
    }
}

fn is_container(node: &TestDescriptor) -> bool {
    matches!(
        node.kind(),
        NodeKind::Package(_) | NodeKind::Class(_) | NodeKind::ParameterizedMethod { .. }
    )
}

impl<W: Write> ExecutionListener for ConsoleListener<W> {
    fn started(&mut self, node: &TestDescriptor) {
        if is_container(node) {
            self.line(node.display_name());
            self.depth += 1;
        }
    }

    fn skipped(&mut self, node: &TestDescriptor, reason: &str) {
        self.line(&format!("- {} ({reason})", node.display_name()));
    }

    fn finished(&mut self, node: &TestDescriptor, result: &TestExecutionResult) {
        if is_container(node) {
            if let Some(failure) = &result.failure {
                self.line(&format!("Error: {}", failure.reason));
            }
            self.depth = self.depth.saturating_sub(1);
            return;
        }
        if !node.is_leaf() {
            return;
        }
        match &result.failure {
            None => self.line(&format!("✓ {}", node.display_name())),
            Some(failure) => {
                self.line(&format!("✗ {}", node.display_name()));
                for (i, reason) in failure.reason.lines().enumerate() {
                    if i == 0 {
                        self.line(&format!("  Error: {reason}"));
                    } else {
                        self.line(&format!("  {reason}"));
                    }
                }
            }
        }
        if self.verbose || result.failure.is_some() {
            for statement in &result.statements {
                self.line(&format!("  {statement}"));
            }
        }
    }
}

// ============================================================================
// Recording
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Skipped(String, String),
    Finished(String, bool),
}

/// Keeps every event by display name; for assertions in tests and adapters.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Vec<Event>,
}

impl RecordingListener {
    pub fn new() -> Self {
        RecordingListener::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Display names of the leaves that finished, with their success.
    pub fn finished_units(&self) -> Vec<(String, bool)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Finished(name, ok) => Some((name.clone(), *ok)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_units(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Skipped(name, reason) => Some((name.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }
}

impl ExecutionListener for RecordingListener {
    fn started(&mut self, node: &TestDescriptor) {
        self.events.push(Event::Started(node.display_name().to_string()));
    }

    fn skipped(&mut self, node: &TestDescriptor, reason: &str) {
        self.events.push(Event::Skipped(
            node.display_name().to_string(),
            reason.to_string(),
        ));
    }

    fn finished(&mut self, node: &TestDescriptor, result: &TestExecutionResult) {
        if node.is_leaf() {
            self.events.push(Event::Finished(
                node.display_name().to_string(),
                result.is_successful(),
            ));
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Prints PASS or FAIL, the counts and every failure numbered.
pub fn print_summary(out: &mut impl Write, result: &RunResult, elapsed: Duration) -> io::Result<()> {
    let elapsed_str = format!("{:.3}s", elapsed.as_secs_f64());

    let parts: Vec<String> = [
        (result.passed > 0).then(|| format!("{} passed", result.passed)),
        (result.failed > 0).then(|| format!("{} failed", result.failed)),
        (result.skipped > 0).then(|| format!("{} skipped", result.skipped)),
    ]
    .into_iter()
    .flatten()
    .collect();
    let parts = if parts.is_empty() {
        "no tests".to_string()
    } else {
        parts.join(", ")
    };

    writeln!(out)?;
    if result.failed > 0 {
        writeln!(out, "FAIL")?;
        writeln!(out, "{parts} ({elapsed_str})")?;
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for (i, failure) in result.failures.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, failure)?;
        }
        writeln!(out)?;
    } else {
        writeln!(out, "PASS")?;
        writeln!(out, "{parts} ({elapsed_str})")?;
    }
    Ok(())
}
