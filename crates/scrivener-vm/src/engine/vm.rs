//! Virtual machine for executing compiled modules.

use scrivener_bytecode::{Instruction, RoutineId};
use scrivener_core::Stream;
use scrivener_grammar::engine::{actions, terminals};
use scrivener_grammar::graph::guard_admits;
use scrivener_grammar::{Bindings, Limits, Outcome, ParseError, ParseResult, ParserContext, Value};

use super::frame::FrameStack;
use super::program::Program;
use super::trace::{NoopTracer, Tracer};

/// Outcome register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Match,
    Miss,
    Failure,
}

/// Values gathered by a repetition or an interleaved-text scan.
#[derive(Debug, Default)]
struct Collector {
    items: Vec<Value>,
    count: u32,
    /// End of the last collected match; text after it is still pending.
    last: usize,
}

/// Execution state for one run over a stream.
pub struct VM<'p, 's> {
    program: &'p Program,
    stream: &'s Stream,
    status: Status,
    value: Value,
    pos: usize,
    marks: Vec<usize>,
    collectors: Vec<Collector>,
    frames: FrameStack,
    /// Active rule routines, counted against the recursion limit.
    rule_depth: u32,
    limits: Limits,
}

/// Builder for VM instances.
pub struct VMBuilder<'p, 's> {
    program: &'p Program,
    stream: &'s Stream,
    limits: Limits,
}

impl<'p, 's> VMBuilder<'p, 's> {
    pub fn new(program: &'p Program, stream: &'s Stream) -> Self {
        Self {
            program,
            stream,
            limits: Limits::default(),
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the maximum nesting of rule routines.
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.limits = self.limits.recursion_limit(limit);
        self
    }

    pub fn build(self) -> VM<'p, 's> {
        VM {
            program: self.program,
            stream: self.stream,
            status: Status::Match,
            value: Value::Empty,
            pos: 0,
            marks: Vec::new(),
            collectors: Vec::new(),
            frames: FrameStack::new(),
            rule_depth: 0,
            limits: self.limits,
        }
    }
}

impl<'p, 's> VM<'p, 's> {
    pub fn builder(program: &'p Program, stream: &'s Stream) -> VMBuilder<'p, 's> {
        VMBuilder::new(program, stream)
    }

    /// Run routine `entry` at `pos` without tracing.
    pub fn execute(
        self,
        entry: RoutineId,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        self.execute_with(entry, pos, ctx, &mut NoopTracer)
    }

    /// Run routine `entry` at `pos`, reporting to `tracer`.
    pub fn execute_with<T: Tracer>(
        mut self,
        entry: RoutineId,
        pos: usize,
        ctx: &mut ParserContext,
        tracer: &mut T,
    ) -> ParseResult<Outcome> {
        let program = self.program;
        let module = program.module();
        let mut routine = entry;
        let mut code = module.routine(routine).code();
        let mut ip = 0u32;
        self.pos = pos;
        self.enter(routine)?;
        tracer.trace_call(program, routine, self.stream, pos);

        loop {
            let instr = &code[ip as usize];
            tracer.trace_instruction(routine, ip, instr);
            ip += 1;

            match instr {
                Instruction::Jump(target) => ip = target.0,
                Instruction::JumpIfMiss(target) => {
                    if self.status == Status::Miss {
                        ip = target.0;
                    }
                }
                Instruction::JumpIfMatch(target) => {
                    if self.status == Status::Match {
                        ip = target.0;
                    }
                }
                Instruction::JumpIfFailure(target) => {
                    if self.status == Status::Failure {
                        ip = target.0;
                    }
                }
                Instruction::Guard { set, skip } => {
                    let set = module.tables().charset(*set);
                    if !guard_admits(Some(set), self.stream.char_at(self.pos)) {
                        self.status = Status::Miss;
                        ip = skip.0;
                    }
                }
                Instruction::Behind { len, miss } => {
                    let len = *len as usize;
                    if self.pos < len {
                        self.status = Status::Miss;
                        ip = miss.0;
                    } else {
                        self.marks.push(self.pos);
                        self.pos -= len;
                    }
                }
                Instruction::RepeatStep { rule, exit } => {
                    let start = self.pop_mark();
                    if self.pos <= start {
                        if !self.stream.at_end(start) {
                            let rule = module.tables().string(*rule);
                            return Err(ParseError::zero_width_repeat(rule, self.stream, start));
                        }
                        self.pos = start;
                        ip = exit.0;
                    } else {
                        let value = std::mem::take(&mut self.value);
                        let collector = self.collector();
                        collector.count += 1;
                        if value != Value::Empty {
                            collector.items.push(value);
                        }
                    }
                }
                Instruction::RepeatMax { max, exit } => {
                    if self.collector().count == *max {
                        ip = exit.0;
                    }
                }
                Instruction::MixedCheck { exit } => {
                    if self.pos >= self.stream.len() {
                        ip = exit.0;
                    }
                }
                Instruction::Call(callee) => {
                    self.enter(*callee)?;
                    self.frames.push(routine, ip);
                    routine = *callee;
                    code = module.routine(routine).code();
                    ip = 0;
                    tracer.trace_call(program, routine, self.stream, self.pos);
                }
                Instruction::Ret => {
                    tracer.trace_return(program, routine, self.status, &self.value, self.pos);
                    if module.routine(routine).is_rule() {
                        self.rule_depth -= 1;
                    }
                    match self.frames.pop() {
                        Some(frame) => {
                            routine = frame.routine;
                            code = module.routine(routine).code();
                            ip = frame.return_addr;
                        }
                        None => return Ok(self.outcome()),
                    }
                }
                Instruction::WallError { wall, rule } => {
                    let tables = module.tables();
                    return Err(ParseError::wall(
                        tables.string(*wall),
                        tables.string(*rule),
                        self.stream,
                        self.pos,
                    ));
                }
                other => self.step(other, ctx)?,
            }
        }
    }

    /// Count entry into `routine` when it is a rule body.
    fn enter(&mut self, routine: RoutineId) -> ParseResult<()> {
        if !self.program.module().routine(routine).is_rule() {
            return Ok(());
        }
        let limit = self.limits.get_recursion_limit();
        if self.rule_depth >= limit {
            return Err(ParseError::RecursionLimitExceeded { limit });
        }
        self.rule_depth += 1;
        Ok(())
    }

    /// Execute an instruction that never transfers control.
    fn step(&mut self, instr: &Instruction, ctx: &mut ParserContext) -> ParseResult<()> {
        use Instruction as I;
        let program = self.program;
        let tables = program.module().tables();
        let stream = self.stream;
        let pos = self.pos;

        match instr {
            I::Any => self.set(terminals::any(stream, pos)),
            I::AlphaNum => self.set(terminals::alphanum(stream, pos)),
            I::StreamStart => self.set(terminals::stream_start(pos)),
            I::LineStart => self.set(terminals::line_start(stream, pos)),
            I::LineEnd => self.set(terminals::line_end(stream, pos)),
            I::StreamEnd => self.set(terminals::stream_end(stream, pos)),
            I::BlockBreak => self.set(terminals::block_break(stream, pos, ctx)),
            I::Empty => self.set(Outcome::Match(Value::Empty, pos)),
            I::Literal(s) => self.set(terminals::literal(stream, pos, tables.string(*s))),
            I::Among(c) => self.set(terminals::among(stream, pos, tables.charset(*c))),
            I::Regex(x) => self.set(terminals::regex(stream, pos, program.regex(x.index()), ctx)),
            I::Const(k) => self.set(Outcome::Match(program.constant(k.index()).clone(), pos)),
            I::Put { name, value } => {
                let value = program.constant(value.index());
                self.set(terminals::put(pos, tables.string(*name), value, ctx));
            }
            I::Get { name, default } => {
                let default = program.constant(default.index());
                self.set(terminals::get(pos, tables.string(*name), default, ctx));
            }
            I::Do(e) => self.set(actions::run_do(program.action(e.index()), pos, ctx)?),
            I::DoCode(e) => {
                self.set(actions::run_do_code(program.action(e.index()), stream, pos, ctx)?)
            }
            I::If(e) => self.set(actions::run_if(program.action(e.index()), pos, ctx)?),
            I::IfCode(e) => {
                self.set(actions::run_if_code(program.action(e.index()), stream, pos, ctx)?)
            }
            I::Code(s) => self.set(terminals::code(stream, pos, tables.string(*s))?),
            I::Args => self.set(terminals::args(stream, pos)?),
            I::Miss => self.status = Status::Miss,

            I::PushPos => self.marks.push(pos),
            I::PopPos => self.pos = self.pop_mark(),
            I::DropPos => {
                self.pop_mark();
            }

            I::ScopePush => ctx.push(),
            I::ScopeMerge => ctx.merge(),
            I::ScopeDiscard => ctx.discard(),
            I::BindParams(pairs) => {
                let bindings = pairs
                    .iter()
                    .map(|(name, e)| {
                        let value = actions::evaluate(program.action(e.index()), &*ctx)?;
                        Ok((tables.string(*name).to_string(), value))
                    })
                    .collect::<ParseResult<Bindings>>()?;
                ctx.push_with(bindings);
            }

            I::Not => match self.status {
                Status::Miss => self.matched(Value::Empty),
                _ => self.status = Status::Miss,
            },
            I::Peek => match self.status {
                Status::Miss => {}
                _ => self.matched(Value::Empty),
            },
            I::FailIf => {
                if self.status != Status::Miss {
                    self.status = Status::Failure;
                }
            }
            I::Opt => match self.status {
                Status::Match => {
                    let value = std::mem::take(&mut self.value);
                    self.value = Value::List(vec![value]);
                }
                Status::Miss => self.matched(Value::List(Vec::new())),
                Status::Failure => {}
            },
            I::Replace(k) => {
                if self.status == Status::Match {
                    self.value = program.constant(k.index()).clone();
                }
            }
            I::Take => {
                let start = self.pop_mark();
                if self.status == Status::Match {
                    self.value = Value::str(stream.slice(start, self.pos));
                }
            }
            I::Bind(name) => {
                if self.status == Status::Match {
                    ctx.set(tables.string(*name), self.value.clone());
                }
            }
            I::Extent(rule) => {
                let start = self.pop_mark();
                if self.status == Status::Match {
                    let value = std::mem::take(&mut self.value);
                    self.value = terminals::with_extent(value, start, self.pos).map_err(|found| {
                        ParseError::ExtentNotMap {
                            rule: tables.string(*rule).to_string(),
                            found,
                        }
                    })?;
                }
            }
            I::BehindEnd => {
                let end = self.pop_mark();
                if self.status == Status::Match && self.pos == end {
                    self.value = Value::Empty;
                } else {
                    self.status = Status::Miss;
                }
                self.pos = end;
            }

            I::Collect => self.collectors.push(Collector {
                last: pos,
                ..Collector::default()
            }),
            I::RepeatEnd { min } => {
                let collector = self.pop_collector();
                if collector.count >= *min {
                    self.matched(Value::List(collector.items));
                } else {
                    self.status = Status::Miss;
                }
            }
            I::CollectDrop => {
                self.pop_collector();
            }
            I::MixedItem(rule) => {
                let start = self.pop_mark();
                if self.pos <= start {
                    return Err(ParseError::zero_width_content(
                        tables.string(*rule),
                        stream,
                        start,
                    ));
                }
                let value = std::mem::take(&mut self.value);
                let end = self.pos;
                let collector = self.collector();
                if start > collector.last {
                    let chunk = terminals::text_chunk(stream, collector.last, start);
                    collector.items.push(chunk);
                }
                collector.items.push(value);
                collector.last = end;
            }
            I::Advance => self.pos += 1,
            I::MixedEnd => {
                let mut collector = self.pop_collector();
                if pos > collector.last {
                    collector.items.push(terminals::text_chunk(stream, collector.last, pos));
                }
                self.matched(Value::List(collector.items));
            }

            I::Jump(_)
            | I::JumpIfMiss(_)
            | I::JumpIfMatch(_)
            | I::JumpIfFailure(_)
            | I::Guard { .. }
            | I::Behind { .. }
            | I::RepeatStep { .. }
            | I::RepeatMax { .. }
            | I::MixedCheck { .. }
            | I::Call(_)
            | I::Ret
            | I::WallError { .. } => unreachable!("control flow is handled by the dispatch loop"),
        }
        Ok(())
    }

    /// Load a terminal's outcome into the registers. A miss or failure
    /// leaves the position where it was.
    #[inline]
    fn set(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Match(value, end) => {
                self.status = Status::Match;
                self.value = value;
                self.pos = end;
            }
            Outcome::Miss => self.status = Status::Miss,
            Outcome::Failure => self.status = Status::Failure,
        }
    }

    #[inline]
    fn matched(&mut self, value: Value) {
        self.status = Status::Match;
        self.value = value;
    }

    fn outcome(self) -> Outcome {
        match self.status {
            Status::Match => Outcome::Match(self.value, self.pos),
            Status::Miss => Outcome::Miss,
            Status::Failure => Outcome::Failure,
        }
    }

    fn pop_mark(&mut self) -> usize {
        self.marks.pop().expect("verified code never underflows the position stack")
    }

    fn collector(&mut self) -> &mut Collector {
        self.collectors
            .last_mut()
            .expect("verified code only collects inside a collector")
    }

    fn pop_collector(&mut self) -> Collector {
        self.collectors
            .pop()
            .expect("verified code never underflows the collector stack")
    }
}
