use std::cmp::Ordering;

use indexmap::IndexMap;

use super::builtins;
use super::parser::{Arg, BinaryOp, Expr, UnaryOp};
use crate::rule::RuleError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("name `{0}` is not defined")]
    UndefinedVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{type_name}` has no method `{method}`")]
    UnknownMethod {
        type_name: &'static str,
        method: String,
    },

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Argument(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow or oversized result")]
    Overflow,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key {0:?} not found")]
    KeyNotFound(String),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Name resolution for expression evaluation.
pub trait Env {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Env for IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Arguments of a call after splats are expanded.
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl CallArgs {
    /// Take a named argument out, if given.
    pub fn take_named(&mut self, name: &str) -> Option<Value> {
        let index = self.named.iter().position(|(n, _)| n == name)?;
        Some(self.named.remove(index).1)
    }
}

pub fn eval(expr: &Expr, env: &dyn Env) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => env
            .lookup(name)
            .or_else(|| builtins::constant(name))
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::List(items) => Ok(Value::List(
            items.iter().map(|item| eval(item, env)).collect::<EvalResult<_>>()?,
        )),
        Expr::Dict(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match eval(key, env)? {
                    Value::Str(s) => s,
                    other => {
                        return Err(EvalError::Type(format!(
                            "dict keys must be str, not {}",
                            other.type_name()
                        )));
                    }
                };
                map.insert(key, eval(value, env)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value.as_int() {
                    Some(n) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                    None => Err(EvalError::Type(format!(
                        "bad operand type for unary -: {}",
                        value.type_name()
                    ))),
                },
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, env)?;
            let rhs = eval(rhs, env)?;
            binary(*op, lhs, rhs)
        }
        Expr::And(lhs, rhs) => {
            let lhs = eval(lhs, env)?;
            if lhs.is_truthy() { eval(rhs, env) } else { Ok(lhs) }
        }
        Expr::Or(lhs, rhs) => {
            let lhs = eval(lhs, env)?;
            if lhs.is_truthy() { Ok(lhs) } else { eval(rhs, env) }
        }
        Expr::Cond {
            then,
            cond,
            otherwise,
        } => {
            if eval(cond, env)?.is_truthy() {
                eval(then, env)
            } else {
                eval(otherwise, env)
            }
        }
        Expr::Call { func, args } => {
            let args = eval_args(args, env)?;
            builtins::call(func, args)
        }
        Expr::Method { recv, name, args } => {
            let recv = eval(recv, env)?;
            let args = eval_args(args, env)?;
            builtins::call_method(recv, name, args)
        }
        Expr::Index(base, index) => {
            let base = eval(base, env)?;
            let index = eval(index, env)?;
            subscript(base, index)
        }
        Expr::Slice(base, start, end) => {
            let base = eval(base, env)?;
            let start = start.as_ref().map(|e| eval_int(e, env)).transpose()?;
            let end = end.as_ref().map(|e| eval_int(e, env)).transpose()?;
            slice(base, start, end)
        }
    }
}

fn eval_int(expr: &Expr, env: &dyn Env) -> EvalResult<i64> {
    let value = eval(expr, env)?;
    value.as_int().ok_or_else(|| {
        EvalError::Type(format!("slice indices must be int, not {}", value.type_name()))
    })
}

fn eval_args(args: &[Arg], env: &dyn Env) -> EvalResult<CallArgs> {
    let mut out = CallArgs::default();
    for arg in args {
        match arg {
            Arg::Pos(expr) => out.positional.push(eval(expr, env)?),
            Arg::Splat(expr) => match eval(expr, env)? {
                Value::List(items) => out.positional.extend(items),
                other => {
                    return Err(EvalError::Type(format!(
                        "argument after * must be a list, not {}",
                        other.type_name()
                    )));
                }
            },
            Arg::Named(name, expr) => out.named.push((name.clone(), eval(expr, env)?)),
        }
    }
    Ok(out)
}

fn type_error(op: &str, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand types for {op}: {} and {}",
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn ints(lhs: &Value, rhs: &Value) -> Option<(i64, i64)> {
    match (lhs, rhs) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Some((lhs.as_int()?, rhs.as_int()?))
        }
        _ => None,
    }
}

/// Largest string (in bytes) or list a repetition may build.
pub const MAX_REPEAT_LEN: usize = 1 << 24;

fn repeat_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn check_repeat(len: usize, count: usize) -> Result<(), EvalError> {
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(()),
        _ => Err(EvalError::Overflow),
    }
}

pub(crate) fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult {
    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (lhs, rhs) => {
                let (a, b) = ints(&lhs, &rhs).ok_or_else(|| type_error("+", &lhs, &rhs))?;
                a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow)
            }
        },
        BinaryOp::Sub => {
            let (a, b) = ints(&lhs, &rhs).ok_or_else(|| type_error("-", &lhs, &rhs))?;
            a.checked_sub(b).map(Value::Int).ok_or(EvalError::Overflow)
        }
        BinaryOp::Mul => match (lhs, rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let count = repeat_count(n);
                check_repeat(s.len(), count)?;
                Ok(Value::Str(s.repeat(count)))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let count = repeat_count(n);
                check_repeat(items.len(), count)?;
                let mut out = Vec::with_capacity(items.len() * count);
                for _ in 0..count {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::List(out))
            }
            (lhs, rhs) => {
                let (a, b) = ints(&lhs, &rhs).ok_or_else(|| type_error("*", &lhs, &rhs))?;
                a.checked_mul(b).map(Value::Int).ok_or(EvalError::Overflow)
            }
        },
        BinaryOp::Div => {
            let (a, b) = ints(&lhs, &rhs).ok_or_else(|| type_error("//", &lhs, &rhs))?;
            floor_div(a, b)
        }
        BinaryOp::Mod => {
            let (a, b) = ints(&lhs, &rhs).ok_or_else(|| type_error("%", &lhs, &rhs))?;
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            // Result takes the divisor's sign.
            Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| type_error("comparison", &lhs, &rhs))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::In => contains(&rhs, &lhs).map(Value::Bool),
        BinaryOp::NotIn => contains(&rhs, &lhs).map(|found| Value::Bool(!found)),
    }
}

fn floor_div(a: i64, b: i64) -> EvalResult {
    if b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(Value::Int(q - 1))
    } else {
        Ok(Value::Int(q))
    }
}

/// Equality with `True == 1` the way the action language expects.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match ints(lhs, rhs) {
        Some((a, b)) => a == b,
        None => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let Some((a, b)) = ints(lhs, rhs) {
        return Some(a.cmp(&b));
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => None,
    }
}

fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match (container, item) {
        (Value::Str(hay), Value::Str(needle)) => Ok(hay.contains(needle.as_str())),
        (Value::List(items), item) => Ok(items.iter().any(|x| values_equal(x, item))),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (container, item) => Err(EvalError::Type(format!(
            "`in` not supported between {} and {}",
            item.type_name(),
            container.type_name()
        ))),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

fn subscript(base: Value, index: Value) -> EvalResult {
    match (base, index) {
        (Value::List(items), index) => {
            let i = index.as_int().ok_or_else(|| {
                EvalError::Type(format!("list indices must be int, not {}", index.type_name()))
            })?;
            let len = items.len();
            let at = normalize_index(i, len).ok_or(EvalError::IndexOutOfRange { index: i, len })?;
            Ok(items.into_iter().nth(at).unwrap_or_default())
        }
        (Value::Str(s), index) => {
            let i = index.as_int().ok_or_else(|| {
                EvalError::Type(format!("str indices must be int, not {}", index.type_name()))
            })?;
            let len = s.chars().count();
            let at = normalize_index(i, len).ok_or(EvalError::IndexOutOfRange { index: i, len })?;
            Ok(Value::Str(s.chars().nth(at).map(String::from).unwrap_or_default()))
        }
        (Value::Map(mut map), Value::Str(key)) => {
            map.shift_remove(&key).ok_or(EvalError::KeyNotFound(key))
        }
        (base, index) => Err(EvalError::Type(format!(
            "{} is not subscriptable by {}",
            base.type_name(),
            index.type_name()
        ))),
    }
}

/// Clamp slice bounds the way sequence slicing does.
fn slice_bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { i + len as i64 } else { i };
        i.clamp(0, len as i64) as usize
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    (start, end.max(start))
}

fn slice(base: Value, start: Option<i64>, end: Option<i64>) -> EvalResult {
    match base {
        Value::List(items) => {
            let (start, end) = slice_bounds(start, end, items.len());
            Ok(Value::List(items[start..end].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(start, end, chars.len());
            Ok(Value::Str(chars[start..end].iter().collect()))
        }
        other => Err(EvalError::Type(format!("{} cannot be sliced", other.type_name()))),
    }
}
