//! Tracing hooks for the interpreter.
//!
//! [`NoopTracer`] compiles away entirely. [`PrintTracer`] collects an
//! indented call tree of rule attempts for debugging grammars.

use scrivener_core::{Colors, Stream};

use crate::graph::{NodeId, RuleGraph};
use crate::value::Outcome;

/// Verbosity level for trace output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Named rules only.
    #[default]
    Default,
    /// Every node, including anonymous combinators and terminals.
    Verbose,
    /// Every node, with the input at each attempt.
    VeryVerbose,
}

/// Interpreter instrumentation.
///
/// - `trace_enter` - before a node is evaluated
/// - `trace_exit` - after it produced an outcome
/// - `trace_pruned` - when dispatch skips a node without evaluating it
///
/// Deep evaluations continue on other threads, so tracers must be `Send`.
pub trait Tracer: Send {
    fn trace_enter(&mut self, graph: &RuleGraph, id: NodeId, stream: &Stream, pos: usize);

    fn trace_exit(&mut self, graph: &RuleGraph, id: NodeId, outcome: &Outcome);

    fn trace_pruned(&mut self, graph: &RuleGraph, id: NodeId, pos: usize);
}

/// No-op tracer that gets optimized away completely.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_enter(&mut self, _graph: &RuleGraph, _id: NodeId, _stream: &Stream, _pos: usize) {}

    #[inline(always)]
    fn trace_exit(&mut self, _graph: &RuleGraph, _id: NodeId, _outcome: &Outcome) {}

    #[inline(always)]
    fn trace_pruned(&mut self, _graph: &RuleGraph, _id: NodeId, _pos: usize) {}
}

/// Width of the input preview at `VeryVerbose`.
const PREVIEW_WIDTH: usize = 16;

/// Tracer that collects an indented log of rule attempts.
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
    /// One entry per open attempt: whether it printed an enter line.
    open: Vec<bool>,
    depth: usize,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            verbosity,
            colors,
            lines: Vec::new(),
            open: Vec::new(),
            depth: 0,
        }
    }

    pub fn builder() -> PrintTracerBuilder {
        PrintTracerBuilder::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Print all trace lines to stderr.
    pub fn print(&self) {
        for line in &self.lines {
            eprintln!("{line}");
        }
    }

    fn shows(&self, graph: &RuleGraph, id: NodeId) -> bool {
        self.verbosity != Verbosity::Default || graph.node(id).name().is_some()
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(format!("{}{line}", "  ".repeat(self.depth)));
    }
}

impl Tracer for PrintTracer {
    fn trace_enter(&mut self, graph: &RuleGraph, id: NodeId, stream: &Stream, pos: usize) {
        let shown = self.shows(graph, id);
        self.open.push(shown);
        if !shown {
            return;
        }
        let c = self.colors;
        let (row, col) = stream.row_col(pos);
        let mut line = format!("{}{}{} @ {row}:{col}", c.blue, graph.describe(id), c.reset);
        if self.verbosity == Verbosity::VeryVerbose {
            let preview = stream.snippet(pos, PREVIEW_WIDTH);
            line.push_str(&format!(" {}{preview:?}{}", c.dim, c.reset));
        }
        self.push_line(line);
        self.depth += 1;
    }

    fn trace_exit(&mut self, graph: &RuleGraph, id: NodeId, outcome: &Outcome) {
        if !self.open.pop().unwrap_or(false) {
            return;
        }
        self.depth = self.depth.saturating_sub(1);
        let c = self.colors;
        let name = graph.describe(id);
        let line = match outcome {
            Outcome::Match(value, end) => {
                format!("{}✓{} {name} -> {end} {}{value}{}", c.green, c.reset, c.dim, c.reset)
            }
            Outcome::Miss => format!("{}✗{} {name}", c.red, c.reset),
            Outcome::Failure => format!("{}✗ failure{} {name}", c.red, c.reset),
        };
        self.push_line(line);
    }

    fn trace_pruned(&mut self, graph: &RuleGraph, id: NodeId, pos: usize) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        let c = self.colors;
        let line = format!("{}- {} pruned at {pos}{}", c.dim, graph.describe(id), c.reset);
        self.push_line(line);
    }
}

/// Builder for [`PrintTracer`].
#[derive(Default)]
pub struct PrintTracerBuilder {
    verbosity: Verbosity,
    colored: bool,
}

impl PrintTracerBuilder {
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn colored(mut self, enabled: bool) -> Self {
        self.colored = enabled;
        self
    }

    pub fn build(self) -> PrintTracer {
        PrintTracer::new(self.verbosity, Colors::new(self.colored))
    }
}
