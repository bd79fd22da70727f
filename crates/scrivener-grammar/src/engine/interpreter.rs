//! Direct evaluation of a snapped rule graph.
//!
//! This is the reference semantics: the compiled backend must agree with it
//! on every outcome, position, value and context effect.

use scrivener_core::Stream;

use super::actions;
use super::error::{ParseError, ParseResult};
use super::terminals;
use super::trace::Tracer;
use crate::context::ParserContext;
use crate::graph::{NodeId, Op, RuleGraph, guard_admits};
use crate::value::{Outcome, Value};

/// Node evaluations nested on one thread's stack before evaluation moves
/// to a fresh thread.
const STACK_SEGMENT_DEPTH: u32 = 64;

/// Stack size of each continuation thread.
const STACK_SEGMENT_SIZE: usize = 4 << 20;

/// Runtime limits for evaluation.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Maximum nesting of named rule entries (default: 1,024).
    pub(crate) recursion_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_limit: 1024,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recursion limit.
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }
}

/// Recursive evaluator over one stream.
///
/// Only entries into named rules count against the recursion limit. The
/// host stack is bounded separately: every [`STACK_SEGMENT_DEPTH`] nested
/// evaluations continue on a new thread, so deep input reports
/// `RecursionLimitExceeded` instead of overflowing.
pub struct Interpreter<'a, T: Tracer> {
    graph: &'a RuleGraph,
    stream: &'a Stream,
    tracer: &'a mut T,
    limits: Limits,
    /// Active named rules.
    rule_depth: u32,
    /// Active node evaluations on all threads.
    nesting: u32,
}

impl<'a, T: Tracer> Interpreter<'a, T> {
    pub fn new(graph: &'a RuleGraph, stream: &'a Stream, tracer: &'a mut T) -> Self {
        Self {
            graph,
            stream,
            tracer,
            limits: Limits::default(),
            rule_depth: 0,
            nesting: 0,
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Evaluate node `id` at `pos`.
    pub fn eval(&mut self, id: NodeId, pos: usize, ctx: &mut ParserContext) -> ParseResult<Outcome> {
        let rule = self.graph.is_rule(id);
        if rule {
            let limit = self.limits.recursion_limit;
            if self.rule_depth >= limit {
                return Err(ParseError::RecursionLimitExceeded { limit });
            }
            self.rule_depth += 1;
        }
        self.nesting += 1;
        let outcome = if self.nesting % STACK_SEGMENT_DEPTH == 0 {
            self.eval_on_new_stack(id, pos, ctx)
        } else {
            self.eval_traced(id, pos, ctx)
        };
        self.nesting -= 1;
        if rule {
            self.rule_depth -= 1;
        }
        outcome
    }

    fn eval_traced(&mut self, id: NodeId, pos: usize, ctx: &mut ParserContext) -> ParseResult<Outcome> {
        self.tracer.trace_enter(self.graph, id, self.stream, pos);
        let outcome = self.eval_op(id, pos, ctx);
        if let Ok(outcome) = &outcome {
            self.tracer.trace_exit(self.graph, id, outcome);
        }
        outcome
    }

    /// Continue evaluation on a thread with a fresh stack, blocking until it
    /// finishes. Panics propagate to the caller.
    #[cold]
    fn eval_on_new_stack(
        &mut self,
        id: NodeId,
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let limit = self.limits.recursion_limit;
        std::thread::scope(|scope| {
            let spawned = std::thread::Builder::new()
                .name("scrivener-eval".into())
                .stack_size(STACK_SEGMENT_SIZE)
                .spawn_scoped(scope, || self.eval_traced(id, pos, ctx));
            match spawned {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
                Err(_) => Err(ParseError::RecursionLimitExceeded { limit }),
            }
        })
    }

    fn eval_op(&mut self, id: NodeId, pos: usize, ctx: &mut ParserContext) -> ParseResult<Outcome> {
        let graph = self.graph;
        let stream = self.stream;
        let outcome = match graph.op(id) {
            Op::Any => terminals::any(stream, pos),
            Op::AlphaNum => terminals::alphanum(stream, pos),
            Op::StreamStart => terminals::stream_start(pos),
            Op::LineStart => terminals::line_start(stream, pos),
            Op::LineEnd => terminals::line_end(stream, pos),
            Op::StreamEnd => terminals::stream_end(stream, pos),
            Op::BlockBreak => terminals::block_break(stream, pos, ctx),
            Op::Put { name, value } => terminals::put(pos, name, value, ctx),
            Op::Get { name, default } => terminals::get(pos, name, default, ctx),
            Op::Literal(text) => terminals::literal(stream, pos, text),
            Op::Among(set) => terminals::among(stream, pos, set),
            Op::Regex(pattern) => terminals::regex(stream, pos, pattern, ctx),
            Op::Value(value) => Outcome::Match(value.clone(), pos),
            Op::FirstChars(_) | Op::Wall(_) => Outcome::Match(Value::Empty, pos),
            Op::Do(action) => actions::run_do(action, pos, ctx)?,
            Op::DoCode(action) => actions::run_do_code(action, stream, pos, ctx)?,
            Op::If(action) => actions::run_if(action, pos, ctx)?,
            Op::IfCode(action) => actions::run_if_code(action, stream, pos, ctx)?,
            Op::Code(ends) => terminals::code(stream, pos, ends)?,
            Op::Args => terminals::args(stream, pos)?,

            Op::Or(children) => self.eval_or(id, children, pos, ctx)?,
            Op::Seq(children) => self.eval_seq(id, children, pos, ctx)?,
            Op::Repeat { rule, min, max } => self.eval_repeat(id, *rule, *min, *max, pos, ctx)?,
            Op::Mixed { until, content } => self.eval_mixed(id, *until, *content, pos, ctx)?,

            Op::Not(child) => {
                ctx.push();
                let outcome = self.eval(*child, pos, ctx)?;
                ctx.discard();
                match outcome {
                    Outcome::Miss => Outcome::Match(Value::Empty, pos),
                    _ => Outcome::Miss,
                }
            }
            Op::Peek(child) => {
                ctx.push();
                let outcome = self.eval(*child, pos, ctx)?;
                ctx.discard();
                match outcome {
                    Outcome::Miss => Outcome::Miss,
                    _ => Outcome::Match(Value::Empty, pos),
                }
            }
            Op::LookBehind { rule, len } => match pos.checked_sub(*len) {
                Some(start) => {
                    ctx.push();
                    match self.eval(*rule, start, ctx)? {
                        Outcome::Match(_, end) if end == pos => {
                            ctx.merge();
                            Outcome::Match(Value::Empty, pos)
                        }
                        _ => {
                            ctx.discard();
                            Outcome::Miss
                        }
                    }
                }
                None => Outcome::Miss,
            },
            Op::FailIf(child) => match self.eval(*child, pos, ctx)? {
                Outcome::Miss => Outcome::Miss,
                _ => Outcome::Failure,
            },
            Op::Opt(child) => match self.eval(*child, pos, ctx)? {
                Outcome::Match(value, end) => Outcome::Match(Value::List(vec![value]), end),
                Outcome::Miss => Outcome::Match(Value::List(Vec::new()), pos),
                Outcome::Failure => Outcome::Failure,
            },
            Op::Replace { rule, value } => match self.eval(*rule, pos, ctx)? {
                Outcome::Match(_, end) => Outcome::Match(value.clone(), end),
                other => other,
            },
            Op::Take(child) => match self.eval(*child, pos, ctx)? {
                Outcome::Match(_, end) => Outcome::Match(Value::str(stream.slice(pos, end)), end),
                other => other,
            },
            Op::Bind { rule, name } => match self.eval(*rule, pos, ctx)? {
                Outcome::Match(value, end) => {
                    ctx.set(name, value.clone());
                    Outcome::Match(value, end)
                }
                other => other,
            },
            Op::Extent(child) => match self.eval(*child, pos, ctx)? {
                Outcome::Match(value, end) => {
                    let value = terminals::with_extent(value, pos, end).map_err(|found| {
                        ParseError::ExtentNotMap {
                            rule: graph.describe(id),
                            found,
                        }
                    })?;
                    Outcome::Match(value, end)
                }
                other => other,
            },
            Op::Params { rule, .. } => self.eval(*rule, pos, ctx)?,
            Op::Call { target, args } => {
                let names = match graph.op(*target) {
                    Op::Params { names, .. } => names,
                    _ => unreachable!("snap validates call targets"),
                };
                let params = actions::bind_params(names, args, ctx)?;
                ctx.push_with(params);
                let outcome = self.eval(*target, pos, ctx)?;
                ctx.discard();
                outcome
            }
        };
        Ok(outcome)
    }

    fn eval_or(
        &mut self,
        id: NodeId,
        children: &[NodeId],
        pos: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let table = self.graph.or_table(id);
        for &index in table.candidates(self.stream.char_at(pos)) {
            ctx.push();
            match self.eval(children[index], pos, ctx)? {
                Outcome::Miss => ctx.discard(),
                outcome => {
                    ctx.merge();
                    return Ok(outcome);
                }
            }
        }
        Ok(Outcome::Miss)
    }

    fn eval_seq(
        &mut self,
        id: NodeId,
        children: &[NodeId],
        start: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let graph = self.graph;
        let stream = self.stream;
        let guards = graph.seq_guards(id);
        let mut wall: Option<&str> = None;
        let mut output = Value::None;
        let mut pos = start;

        ctx.push();
        for (index, &child) in children.iter().enumerate() {
            if let Op::Wall(name) = graph.op(child) {
                wall = Some(name);
                continue;
            }

            let guard = guards.get(index).and_then(Option::as_ref);
            let outcome = if guard_admits(guard, stream.char_at(pos)) {
                self.eval(child, pos, ctx)?
            } else {
                self.tracer.trace_pruned(graph, child, pos);
                Outcome::Miss
            };

            match outcome {
                Outcome::Match(value, end) => {
                    output = value;
                    pos = end;
                }
                Outcome::Miss => {
                    ctx.discard();
                    return match wall {
                        Some(wall) => Err(ParseError::wall(wall, graph.describe(child), stream, pos)),
                        None => Ok(Outcome::Miss),
                    };
                }
                Outcome::Failure => {
                    ctx.discard();
                    return Ok(Outcome::Failure);
                }
            }
        }
        ctx.discard();
        Ok(Outcome::Match(output, pos))
    }

    fn eval_repeat(
        &mut self,
        id: NodeId,
        rule: NodeId,
        min: usize,
        max: Option<usize>,
        start: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let stream = self.stream;
        let mut items = Vec::new();
        let mut count = 0;
        let mut pos = start;

        ctx.push();
        loop {
            let (value, end) = match self.eval(rule, pos, ctx)? {
                Outcome::Match(value, end) => (value, end),
                Outcome::Miss => break,
                Outcome::Failure => {
                    ctx.discard();
                    return Ok(Outcome::Failure);
                }
            };
            if end <= pos {
                if stream.at_end(pos) {
                    break;
                }
                return Err(ParseError::zero_width_repeat(self.graph.describe(id), stream, pos));
            }
            pos = end;
            if value != Value::Empty {
                items.push(value);
            }
            count += 1;
            if max == Some(count) {
                break;
            }
        }

        if count >= min {
            ctx.merge();
            Ok(Outcome::Match(Value::List(items), pos))
        } else {
            ctx.discard();
            Ok(Outcome::Miss)
        }
    }

    fn eval_mixed(
        &mut self,
        id: NodeId,
        until: NodeId,
        content: Option<NodeId>,
        start: usize,
        ctx: &mut ParserContext,
    ) -> ParseResult<Outcome> {
        let graph = self.graph;
        let stream = self.stream;
        let (until_guard, content_guard) = graph.mixed_guards(id);
        let mut output = Vec::new();
        let mut last = start;
        let mut pos = start;

        ctx.push();
        while pos < stream.len() {
            let current = stream.char_at(pos);
            if guard_admits(until_guard, current) {
                match self.eval(until, pos, ctx)? {
                    Outcome::Miss => {}
                    Outcome::Failure => {
                        ctx.discard();
                        return Ok(Outcome::Miss);
                    }
                    Outcome::Match(..) => break,
                }
            }

            let Some(content) = content else {
                pos += 1;
                continue;
            };
            if !guard_admits(content_guard, current) {
                pos += 1;
                continue;
            }
            match self.eval(content, pos, ctx)? {
                Outcome::Miss => pos += 1,
                Outcome::Failure => {
                    ctx.discard();
                    return Ok(Outcome::Miss);
                }
                Outcome::Match(_, end) if end <= pos => {
                    return Err(ParseError::zero_width_content(graph.describe(content), stream, pos));
                }
                Outcome::Match(value, end) => {
                    if pos > last {
                        output.push(terminals::text_chunk(stream, last, pos));
                    }
                    output.push(value);
                    last = end;
                    pos = end;
                }
            }
        }
        if pos > last {
            output.push(terminals::text_chunk(stream, last, pos));
        }
        ctx.discard();
        Ok(Outcome::Match(Value::List(output), pos))
    }
}
