//! Tracing hooks for the VM.
//!
//! [`NoopTracer`] compiles away entirely. [`PrintTracer`] collects an
//! indented log of routine calls and, at the highest verbosity, of every
//! executed instruction.

use scrivener_bytecode::{Instruction, RoutineId};
use scrivener_core::{Colors, Stream};
use scrivener_grammar::Value;

pub use scrivener_grammar::engine::Verbosity;

use super::program::Program;
use super::vm::Status;

/// VM instrumentation.
///
/// - `trace_call` - a routine is entered (including the entry routine)
/// - `trace_return` - a routine returns with the given registers
/// - `trace_instruction` - before each instruction executes
pub trait Tracer {
    fn trace_call(&mut self, program: &Program, routine: RoutineId, stream: &Stream, pos: usize);

    fn trace_return(
        &mut self,
        program: &Program,
        routine: RoutineId,
        status: Status,
        value: &Value,
        pos: usize,
    );

    fn trace_instruction(&mut self, routine: RoutineId, addr: u32, instr: &Instruction);
}

/// No-op tracer that gets optimized away completely.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_call(&mut self, _program: &Program, _routine: RoutineId, _stream: &Stream, _pos: usize) {}

    #[inline(always)]
    fn trace_return(
        &mut self,
        _program: &Program,
        _routine: RoutineId,
        _status: Status,
        _value: &Value,
        _pos: usize,
    ) {
    }

    #[inline(always)]
    fn trace_instruction(&mut self, _routine: RoutineId, _addr: u32, _instr: &Instruction) {}
}

/// Tracer that collects an indented log of routine calls.
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
    /// One entry per open call: whether it printed an enter line.
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

    /// Anonymous routines are named after their node id and only shown
    /// above the default verbosity.
    fn shows(&self, name: &str) -> bool {
        self.verbosity != Verbosity::Default || !name.starts_with('#')
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(format!("{}{line}", "  ".repeat(self.depth)));
    }
}

impl Tracer for PrintTracer {
    fn trace_call(&mut self, program: &Program, routine: RoutineId, stream: &Stream, pos: usize) {
        let name = program.module().routine(routine).name();
        let shown = self.shows(name);
        self.open.push(shown);
        if !shown {
            return;
        }
        let c = self.colors;
        let (row, col) = stream.row_col(pos);
        self.push_line(format!("{}{name}{} @ {row}:{col}", c.blue, c.reset));
        self.depth += 1;
    }

    fn trace_return(
        &mut self,
        program: &Program,
        routine: RoutineId,
        status: Status,
        value: &Value,
        pos: usize,
    ) {
        if !self.open.pop().unwrap_or(false) {
            return;
        }
        self.depth = self.depth.saturating_sub(1);
        let c = self.colors;
        let name = program.module().routine(routine).name();
        let line = match status {
            Status::Match => {
                format!("{}✓{} {name} -> {pos} {}{value}{}", c.green, c.reset, c.dim, c.reset)
            }
            Status::Miss => format!("{}✗{} {name}", c.red, c.reset),
            Status::Failure => format!("{}✗ failure{} {name}", c.red, c.reset),
        };
        self.push_line(line);
    }

    fn trace_instruction(&mut self, routine: RoutineId, addr: u32, instr: &Instruction) {
        if self.verbosity != Verbosity::VeryVerbose {
            return;
        }
        let c = self.colors;
        self.push_line(format!("{}{routine}@{addr}{} {instr}", c.dim, c.reset));
    }
}
