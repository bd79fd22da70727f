//! Loaded modules.

use scrivener_bytecode::{Constant, Module, RoutineId};
use scrivener_core::{Colors, Stream};
use scrivener_grammar::expr::eval_str;
use scrivener_grammar::{Action, Bindings, Limits, Outcome, ParseError, ParseResult, ParserContext, Pattern, Value};

use super::error::LoadError;
use super::trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
use super::vm::VM;

/// A module ready to run: regexes compiled, expressions parsed and
/// constants evaluated once.
///
/// Immutable once loaded; each parse runs its own [`VM`].
#[derive(Debug, Clone)]
pub struct Program {
    module: Module,
    regexes: Vec<Pattern>,
    actions: Vec<Action>,
    consts: Vec<Value>,
    limits: Limits,
}

impl Program {
    pub fn load(module: &Module) -> Result<Self, LoadError> {
        let tables = module.tables();
        let regexes = tables
            .regexes
            .iter()
            .enumerate()
            .map(|(index, source)| Pattern::new(source.as_str()).map_err(|error| LoadError::Regex { index, error }))
            .collect::<Result<_, _>>()?;
        let actions = tables
            .exprs
            .iter()
            .enumerate()
            .map(|(index, source)| Action::parse(source.as_str()).map_err(|error| LoadError::Expr { index, error }))
            .collect::<Result<_, _>>()?;

        let empty = Bindings::new();
        let consts = tables
            .consts
            .iter()
            .enumerate()
            .map(|(index, constant)| match constant {
                Constant::Empty => Ok(Value::Empty),
                Constant::Literal(source) => {
                    eval_str(source, &empty).map_err(|error| LoadError::Constant {
                        index,
                        source_text: source.clone(),
                        error,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            module: module.clone(),
            regexes,
            actions,
            consts,
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

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn main_name(&self) -> &str {
        self.module.main_name()
    }

    pub(crate) fn regex(&self, index: usize) -> &Pattern {
        &self.regexes[index]
    }

    pub(crate) fn action(&self, index: usize) -> &Action {
        &self.actions[index]
    }

    pub(crate) fn constant(&self, index: usize) -> &Value {
        &self.consts[index]
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
    /// trace of named routines to stderr.
    pub fn parse_in(
        &self,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        self.run(self.main_name(), stream, pos, ctx)
    }

    /// Run the named entry, returning its raw outcome.
    pub fn call(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let entry = self.entry(name)?;
        if ctx.is_debug() {
            let mut tracer = PrintTracer::new(Verbosity::Default, Colors::OFF);
            let outcome = self.call_traced(entry, stream, pos, ctx, &mut tracer);
            tracer.print();
            outcome
        } else {
            self.call_traced(entry, stream, pos, ctx, &mut NoopTracer)
        }
    }

    /// Run routine `entry` with a caller-supplied tracer.
    ///
    /// On error the context is unwound to the depth it had on entry.
    pub fn call_traced<T: Tracer>(
        &self,
        entry: RoutineId,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
        tracer: &mut T,
    ) -> ParseResult<Outcome> {
        let depth = ctx.depth();
        let outcome = VM::builder(self, stream)
            .limits(self.limits)
            .build()
            .execute_with(entry, pos, ctx, tracer);
        if outcome.is_err() {
            ctx.truncate(depth);
        }
        outcome
    }

    /// Parse `text` with the main rule, collecting a trace.
    pub fn trace(&self, text: &str, tracer: &mut PrintTracer) -> ParseResult<Value> {
        let stream = Stream::new(text);
        let mut ctx = ParserContext::new();
        let outcome = self.call_traced(self.module.main(), &stream, 0, &mut ctx, tracer)?;
        finish(self.main_name(), outcome, &stream, 0).map(|(value, _)| value)
    }

    fn run(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        let outcome = self.call(name, stream, pos, ctx)?;
        finish(name, outcome, stream, pos)
    }

    fn entry(&self, name: &str) -> ParseResult<RoutineId> {
        self.module
            .entry(name)
            .ok_or_else(|| ParseError::UnknownRule(name.to_string()))
    }
}

/// Turn a top-level outcome into a value, the same way the interpreter does.
fn finish(name: &str, outcome: Outcome, stream: &Stream, pos: usize) -> ParseResult<(Value, usize)> {
    match outcome {
        Outcome::Match(value, end) => Ok((value, end)),
        Outcome::Miss => Err(ParseError::no_match(name, stream, pos)),
        Outcome::Failure => Err(ParseError::Failure {
            rule: name.to_string(),
        }),
    }
}
