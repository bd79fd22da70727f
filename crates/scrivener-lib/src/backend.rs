//! The two ways of running a grammar behind one interface.

use scrivener_bytecode::Module;
use scrivener_core::{Colors, Stream};
use scrivener_grammar::engine::{self, ParseResult, Verbosity};
use scrivener_grammar::{Limits, Outcome, Parser, ParserContext, Value};
use scrivener_vm::{self as vm, Program};

use crate::Result;

/// A grammar compiled to a module and loaded into the VM.
#[derive(Debug, Clone)]
pub struct CompiledParser {
    program: Program,
}

impl CompiledParser {
    pub fn new(module: &Module) -> Result<Self> {
        Ok(Self {
            program: Program::load(module)?,
        })
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.program = self.program.limits(limits);
        self
    }

    pub fn get_limits(&self) -> Limits {
        self.program.get_limits()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn module(&self) -> &Module {
        self.program.module()
    }

    /// Module source, loadable again with [`crate::load_module`].
    pub fn to_source(&self) -> String {
        self.module().to_source()
    }

    pub fn main_name(&self) -> &str {
        self.program.main_name()
    }

    pub fn parse(&self, text: &str) -> ParseResult<Value> {
        self.program.parse(text)
    }

    pub fn parse_rule(&self, name: &str, text: &str) -> ParseResult<Value> {
        self.program.parse_rule(name, text)
    }

    pub fn parse_in(
        &self,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        self.program.parse_in(stream, pos, ctx)
    }

    pub fn call(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        self.program.call(name, stream, pos, ctx)
    }
}

/// A runnable grammar, interpreted or compiled.
#[derive(Debug)]
pub enum Backend {
    Interpreted(Parser),
    Compiled(CompiledParser),
}

impl Backend {
    /// Switch to the compiled backend; compiled backends are returned as is.
    pub fn into_compiled(self) -> Result<Self> {
        match self {
            Backend::Interpreted(parser) => crate::compile(&parser).map(Backend::Compiled),
            compiled @ Backend::Compiled(_) => Ok(compiled),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Backend::Interpreted(_) => "interpreter",
            Backend::Compiled(_) => "vm",
        }
    }

    pub fn main_name(&self) -> &str {
        match self {
            Backend::Interpreted(parser) => parser.main_name(),
            Backend::Compiled(compiled) => compiled.main_name(),
        }
    }

    pub fn parse(&self, text: &str) -> ParseResult<Value> {
        match self {
            Backend::Interpreted(parser) => parser.parse(text),
            Backend::Compiled(compiled) => compiled.parse(text),
        }
    }

    pub fn parse_rule(&self, name: &str, text: &str) -> ParseResult<Value> {
        match self {
            Backend::Interpreted(parser) => parser.parse_rule(name, text),
            Backend::Compiled(compiled) => compiled.parse_rule(name, text),
        }
    }

    pub fn parse_in(
        &self,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<(Value, usize)> {
        match self {
            Backend::Interpreted(parser) => parser.parse_in(stream, pos, ctx),
            Backend::Compiled(compiled) => compiled.parse_in(stream, pos, ctx),
        }
    }

    pub fn call(
        &self,
        name: &str,
        stream: &Stream,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        match self {
            Backend::Interpreted(parser) => parser.call(name, stream, pos, ctx),
            Backend::Compiled(compiled) => compiled.call(name, stream, pos, ctx),
        }
    }

    /// Parse `text` with the main rule, returning the result and the trace lines.
    pub fn trace(
        &self,
        text: &str,
        verbosity: Verbosity,
        colors: Colors,
    ) -> (ParseResult<Value>, Vec<String>) {
        match self {
            Backend::Interpreted(parser) => {
                let mut tracer = engine::PrintTracer::new(verbosity, colors);
                let result = parser.trace(text, &mut tracer);
                (result, tracer.into_lines())
            }
            Backend::Compiled(compiled) => {
                let mut tracer = vm::PrintTracer::new(verbosity, colors);
                let result = compiled.program.trace(text, &mut tracer);
                (result, tracer.into_lines())
            }
        }
    }
}
