//! The action expression language.
//!
//! A small, sandboxed expression language evaluated against the parser
//! context: literals, variables, arithmetic, comparisons, boolean logic,
//! conditionals, indexing and slicing, builtin functions, string and dict
//! methods, and constructors for rules (used by the grammar bootstrap).

mod builtins;
mod eval;
mod lexer;
mod parser;

pub use eval::{CallArgs, Env, EvalError, EvalResult, eval, values_equal};
pub use parser::{Arg, BinaryOp, Expr, ExprError, UnaryOp, parse};

/// Parse and evaluate `source` in one step.
pub fn eval_str(source: &str, env: &dyn Env) -> Result<crate::value::Value, EvalStrError> {
    let expr = parse(source)?;
    Ok(eval(&expr, env)?)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalStrError {
    #[error(transparent)]
    Parse(#[from] ExprError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod expr_tests;
