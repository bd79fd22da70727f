//! Action evaluation against the parse context.

use scrivener_core::Stream;

use super::error::{ParseError, ParseResult};
use super::terminals::to_int;
use crate::context::ParserContext;
use crate::expr::{self, Env};
use crate::rule::Action;
use crate::value::{Outcome, Value};

impl Env for ParserContext {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Context bindings plus the raw stream and position, for code actions.
struct CodeEnv<'a> {
    ctx: &'a ParserContext,
    stream: &'a Stream,
    pos: usize,
}

impl Env for CodeEnv<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "stream" => Some(Value::str(self.stream.as_str())),
            "i" => Some(to_int(self.pos)),
            _ => self.ctx.lookup(name),
        }
    }
}

/// Evaluate an action in `env`, attaching its source to any error.
pub fn evaluate(action: &Action, env: &dyn Env) -> ParseResult<Value> {
    expr::eval(action.expr(), env).map_err(|error| ParseError::Action {
        code: action.source().to_string(),
        error,
    })
}

pub fn run_do(action: &Action, pos: usize, ctx: &ParserContext) -> ParseResult<Outcome> {
    Ok(Outcome::Match(evaluate(action, ctx)?, pos))
}

pub fn run_do_code(
    action: &Action,
    stream: &Stream,
    pos: usize,
    ctx: &ParserContext,
) -> ParseResult<Outcome> {
    let env = CodeEnv { ctx, stream, pos };
    Ok(Outcome::Match(evaluate(action, &env)?, pos))
}

pub fn run_if(action: &Action, pos: usize, ctx: &ParserContext) -> ParseResult<Outcome> {
    Ok(gate(evaluate(action, ctx)?, pos))
}

pub fn run_if_code(
    action: &Action,
    stream: &Stream,
    pos: usize,
    ctx: &ParserContext,
) -> ParseResult<Outcome> {
    let env = CodeEnv { ctx, stream, pos };
    Ok(gate(evaluate(action, &env)?, pos))
}

fn gate(value: Value, pos: usize) -> Outcome {
    if value.is_truthy() {
        Outcome::Match(Value::Empty, pos)
    } else {
        Outcome::Miss
    }
}

/// Evaluate call arguments in the caller's context and pair them with the
/// callee's parameter names. Extra parameters stay unbound.
pub fn bind_params(
    names: &[String],
    args: &[Action],
    ctx: &ParserContext,
) -> ParseResult<crate::context::Bindings> {
    names
        .iter()
        .zip(args)
        .map(|(name, action)| Ok((name.clone(), evaluate(action, ctx)?)))
        .collect()
}
