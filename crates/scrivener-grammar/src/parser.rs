//! A snapped grammar ready to run.

use std::sync::Arc;

use indexmap::IndexMap;

use scrivener_core::{Colors, Stream};

use crate::context::ParserContext;
use crate::engine::{
    Interpreter, Limits, NoopTracer, ParseError, ParseResult, PrintTracer, Tracer, Verbosity,
};
use crate::grammar::{Grammar, Library};
use crate::graph::{self, NodeId, RuleGraph, SnapError};
use crate::value::{Outcome, Value};

/// A grammar snapped into a rule graph, with a designated main rule.
///
/// Immutable once built; any number of parses may run against it
/// concurrently, each with its own [`ParserContext`].
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: Grammar,
    graph: Arc<RuleGraph>,
    main: NodeId,
    main_name: String,
    limits: Limits,
}

impl Parser {
    pub fn new(grammar: Grammar, main: &str) -> Result<Self, SnapError> {
        Self::with_library(grammar, main, &Library::new())
    }

    /// Snap `grammar`, resolving `import`s through `library`.
    pub fn with_library(grammar: Grammar, main: &str, library: &Library) -> Result<Self, SnapError> {
        let graph = graph::snap(&grammar, library)?;
        let main_id = graph
            .lookup(main)
            .ok_or_else(|| SnapError::UndefinedRule(main.to_string()))?;
        Ok(Self {
            grammar,
            graph: Arc::new(graph),
            main: main_id,
            main_name: main.to_string(),
            limits: Limits::default(),
        })
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn get_limits(&self) -> Limits {
        self.limits
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    pub fn main(&self) -> NodeId {
        self.main
    }

    pub fn main_name(&self) -> &str {
        &self.main_name
    }

    pub fn namespace(&self) -> &IndexMap<String, NodeId> {
        self.graph.namespace()
    }

    /// Parse `text` with the main rule in a fresh context.
    pub fn parse(&self, text: &str) -> ParseResult<Value> {
        let stream = Stream::new(text);
        let mut ctx = ParserContext::new();
        self.parse_in(&stream, 0, &mut ctx).map(|(value, _)| value)
    }

    /// Parse `text` with the named rule in a fresh context.
    pub fn parse_rule(&self, name: &str, text: &str) -> ParseResult<Value> {
        let stream = Stream::new(text);
        let mut ctx = ParserContext::new();
        self.run(name, &stream, 0, &mut ctx).map(|(value, _)| value)
    }

    /// Parse with the main rule; a context with the debug flag set prints a
    /// trace of named rules to stderr.
    pub fn parse_in(
        &self,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        self.run(&self.main_name, stream, pos, ctx)
    }

    /// Evaluate the named rule, returning its raw outcome.
    pub fn call(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let id = self.entry(name)?;
        if ctx.is_debug() {
            let mut tracer = PrintTracer::new(Verbosity::Default, Colors::OFF);
            let outcome = self.call_traced(id, stream, pos, ctx, &mut tracer);
            tracer.print();
            outcome
        } else {
            self.call_traced(id, stream, pos, ctx, &mut NoopTracer)
        }
    }

    /// Evaluate node `id` with a caller-supplied tracer.
    ///
    /// On error the context is unwound to the depth it had on entry.
    pub fn call_traced<T: Tracer>(
        &self,
        id: NodeId,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
        tracer: &mut T,
    ) -> ParseResult<Outcome> {
        let depth = ctx.depth();
        let outcome = Interpreter::new(&self.graph, stream, tracer)
            .limits(self.limits)
            .eval(id, pos, ctx);
        if outcome.is_err() {
            ctx.truncate(depth);
        }
        outcome
    }

    /// Parse `text` with the main rule, collecting a trace.
    pub fn trace(&self, text: &str, tracer: &mut PrintTracer) -> ParseResult<Value> {
        let stream = Stream::new(text);
        let mut ctx = ParserContext::new();
        let outcome = self.call_traced(self.main, &stream, 0, &mut ctx, tracer)?;
        self.finish(&self.main_name, outcome, &stream, 0)
            .map(|(value, _)| value)
    }

    fn run(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        let outcome = self.call(name, stream, pos, ctx)?;
        self.finish(name, outcome, stream, pos)
    }

    fn finish(
        &self,
        name: &str,
        outcome: Outcome,
        stream: &Stream,
        pos: usize,
    ) -> ParseResult<(Value, usize)> {
        match outcome {
            Outcome::Match(value, end) => Ok((value, end)),
            Outcome::Miss => Err(ParseError::no_match(name, stream, pos)),
            Outcome::Failure => Err(ParseError::Failure {
                rule: name.to_string(),
            }),
        }
    }

    fn entry(&self, name: &str) -> ParseResult<NodeId> {
        self.graph
            .lookup(name)
            .ok_or_else(|| ParseError::UnknownRule(name.to_string()))
    }
}
