//! Builtin functions, methods and rule constructors of the action language.

use indexmap::IndexMap;

use super::eval::{CallArgs, EvalError, EvalResult};
use crate::rule::Rule;
use crate::value::Value;

/// Zero-argument rules reachable as bare names (`Any`, `LineEnd`, ...).
pub(crate) fn constant(name: &str) -> Option<Value> {
    let rule = match name {
        "Any" => Rule::any(),
        "AlphaNum" => Rule::alphanum(),
        "StreamStart" => Rule::stream_start(),
        "LineStart" => Rule::line_start(),
        "LineEnd" => Rule::line_end(),
        "StreamEnd" => Rule::stream_end(),
        "BlockBreak" => Rule::block_break(),
        "Args" => Rule::args(),
        _ => return None,
    };
    Some(Value::Rule(rule))
}

/// Positional-or-keyword argument access for one call.
struct Signature<'a> {
    func: &'a str,
    args: CallArgs,
}

impl<'a> Signature<'a> {
    fn new(func: &'a str, args: CallArgs, max_positional: usize) -> EvalResult<Self> {
        if args.positional.len() > max_positional {
            return Err(EvalError::Argument(format!(
                "{func}() takes at most {max_positional} positional arguments ({} given)",
                args.positional.len()
            )));
        }
        Ok(Self { func, args })
    }

    fn opt(&mut self, index: usize, name: &str) -> Option<Value> {
        match self.args.positional.get_mut(index) {
            Some(slot) => Some(std::mem::take(slot)),
            None => self.args.take_named(name),
        }
    }

    fn req(&mut self, index: usize, name: &str) -> EvalResult<Value> {
        self.opt(index, name).ok_or_else(|| {
            EvalError::Argument(format!("{}() missing argument `{name}`", self.func))
        })
    }

    fn finish(self) -> EvalResult<()> {
        match self.args.named.first() {
            Some((name, _)) => Err(EvalError::Argument(format!(
                "{}() got an unexpected keyword argument `{name}`",
                self.func
            ))),
            None => Ok(()),
        }
    }
}

fn expect_str(func: &str, value: Value) -> EvalResult<String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::Type(format!(
            "{func}() expected str, got {}",
            other.type_name()
        ))),
    }
}

fn expect_int(func: &str, value: &Value) -> EvalResult<i64> {
    value.as_int().ok_or_else(|| {
        EvalError::Type(format!("{func}() expected int, got {}", value.type_name()))
    })
}

fn expect_usize(func: &str, value: &Value) -> EvalResult<usize> {
    let n = expect_int(func, value)?;
    usize::try_from(n)
        .map_err(|_| EvalError::Argument(format!("{func}() expected a non-negative count, got {n}")))
}

fn expect_rule(func: &str, value: Value) -> EvalResult<Rule> {
    match value {
        Value::Rule(rule) => Ok(rule),
        Value::Str(s) => Ok(Rule::literal(s)),
        other => Err(EvalError::Type(format!(
            "{func}() expected a rule, got {}",
            other.type_name()
        ))),
    }
}

fn expect_strings(func: &str, value: Value) -> EvalResult<Vec<String>> {
    match value {
        Value::List(items) => items.into_iter().map(|v| expect_str(func, v)).collect(),
        Value::None => Ok(Vec::new()),
        other => Err(EvalError::Type(format!(
            "{func}() expected a list of str, got {}",
            other.type_name()
        ))),
    }
}

fn join_values(func: &str, items: Value, sep: &str) -> EvalResult<String> {
    let items = match items {
        Value::List(items) => items,
        other => {
            return Err(EvalError::Type(format!(
                "{func}() expected a list, got {}",
                other.type_name()
            )));
        }
    };
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(&expect_str(func, item)?);
    }
    Ok(out)
}

fn parse_int(text: &str, base: u32) -> EvalResult<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = if base == 16 {
        digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits)
    } else {
        digits
    };
    let invalid = || EvalError::Argument(format!("invalid literal for int() with base {base}: {text:?}"));
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    let magnitude = i64::from_str_radix(digits, base).map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn rules_from(func: &str, values: Vec<Value>) -> EvalResult<Vec<Rule>> {
    values.into_iter().map(|v| expect_rule(func, v)).collect()
}

fn unary_rule(func: &str, args: CallArgs, build: fn(Rule) -> Rule) -> EvalResult {
    let mut sig = Signature::new(func, args, 1)?;
    let rule = expect_rule(func, sig.req(0, "rule")?)?;
    sig.finish()?;
    Ok(Value::Rule(build(rule)))
}

pub(crate) fn call(func: &str, args: CallArgs) -> EvalResult {
    match func {
        "int" => {
            let mut sig = Signature::new(func, args, 2)?;
            let value = sig.req(0, "x")?;
            let base = sig.opt(1, "base");
            sig.finish()?;
            match (value, base) {
                (Value::Str(s), base) => {
                    let base = match base {
                        Some(b) => expect_int(func, &b)?,
                        None => 10,
                    };
                    let base = u32::try_from(base)
                        .ok()
                        .filter(|b| (2..=36).contains(b))
                        .ok_or_else(|| EvalError::Argument(format!("int() base must be 2..36, got {base}")))?;
                    parse_int(&s, base).map(Value::Int)
                }
                (value, None) => expect_int(func, &value).map(Value::Int),
                (value, Some(_)) => Err(EvalError::Type(format!(
                    "int() can't convert {} with explicit base",
                    value.type_name()
                ))),
            }
        }
        "str" => {
            let mut sig = Signature::new(func, args, 1)?;
            let value = sig.opt(0, "x").unwrap_or(Value::Str(String::new()));
            sig.finish()?;
            Ok(Value::Str(value.to_text()))
        }
        "len" => {
            let mut sig = Signature::new(func, args, 1)?;
            let value = sig.req(0, "x")?;
            sig.finish()?;
            let len = match &value {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(EvalError::Type(format!(
                        "object of type {} has no len()",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::Int(len as i64))
        }
        "chr" => {
            let mut sig = Signature::new(func, args, 1)?;
            let code = expect_int(func, &sig.req(0, "i")?)?;
            sig.finish()?;
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| EvalError::Argument(format!("chr() arg not in range: {code}")))
        }
        "ord" => {
            let mut sig = Signature::new(func, args, 1)?;
            let s = expect_str(func, sig.req(0, "c")?)?;
            sig.finish()?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Int(i64::from(u32::from(c)))),
                _ => Err(EvalError::Argument(format!(
                    "ord() expected a character, but string of length {} found",
                    s.chars().count()
                ))),
            }
        }
        "bool" => {
            let mut sig = Signature::new(func, args, 1)?;
            let value = sig.opt(0, "x").unwrap_or(Value::Bool(false));
            sig.finish()?;
            Ok(Value::Bool(value.is_truthy()))
        }
        "list" => {
            let mut sig = Signature::new(func, args, 1)?;
            let value = sig.opt(0, "x").unwrap_or(Value::List(Vec::new()));
            sig.finish()?;
            match value {
                Value::List(items) => Ok(Value::List(items)),
                Value::Str(s) => Ok(Value::List(s.chars().map(|c| Value::Str(c.to_string())).collect())),
                Value::Map(map) => Ok(Value::List(map.into_keys().map(Value::Str).collect())),
                other => Err(EvalError::Type(format!(
                    "{} object is not iterable",
                    other.type_name()
                ))),
            }
        }
        "dict" => {
            if args.positional.len() > 1 {
                return Err(EvalError::Argument("dict() takes at most 1 positional argument".into()));
            }
            let mut args = args;
            let mut map = IndexMap::new();
            if let Some(pairs) = args.positional.pop() {
                match pairs {
                    Value::Map(m) => map.extend(m),
                    Value::List(items) => {
                        for item in items {
                            let pair = match item {
                                Value::List(pair) => pair,
                                other => {
                                    return Err(EvalError::Type(format!(
                                        "dict() sequence element is {}, not a pair",
                                        other.type_name()
                                    )));
                                }
                            };
                            let [key, value]: [Value; 2] = pair.try_into().map_err(|_| {
                                EvalError::Argument("dict() sequence element must have length 2".into())
                            })?;
                            map.insert(expect_str(func, key)?, value);
                        }
                    }
                    other => {
                        return Err(EvalError::Type(format!(
                            "dict() cannot convert {}",
                            other.type_name()
                        )));
                    }
                }
            }
            map.extend(args.named);
            Ok(Value::Map(map))
        }
        "join" => {
            let mut sig = Signature::new(func, args, 2)?;
            let items = sig.req(0, "items")?;
            let sep = match sig.opt(1, "sep") {
                Some(sep) => expect_str(func, sep)?,
                None => String::new(),
            };
            sig.finish()?;
            join_values(func, items, &sep).map(Value::Str)
        }
        _ => rule_constructor(func, args),
    }
}

fn rule_constructor(func: &str, args: CallArgs) -> EvalResult {
    if let Some(rule) = constant(func) {
        Signature::new(func, args, 0)?.finish()?;
        return Ok(rule);
    }
    let rule = match func {
        "String" | "Literal" => {
            let mut sig = Signature::new(func, args, 1)?;
            let text = expect_str(func, sig.req(0, "text")?)?;
            sig.finish()?;
            Rule::literal(text)
        }
        "Among" => {
            let mut sig = Signature::new(func, args, 1)?;
            let chars = expect_str(func, sig.req(0, "chars")?)?;
            sig.finish()?;
            Rule::among(chars.as_str())
        }
        "FirstChars" => {
            let mut sig = Signature::new(func, args, 1)?;
            let chars = expect_str(func, sig.req(0, "chars")?)?;
            sig.finish()?;
            Rule::first_chars(chars.as_str())
        }
        "Regex" => {
            let mut sig = Signature::new(func, args, 1)?;
            let pattern = expect_str(func, sig.req(0, "pattern")?)?;
            sig.finish()?;
            Rule::regex(&pattern)?
        }
        "Value" => {
            let mut sig = Signature::new(func, args, 1)?;
            let value = sig.req(0, "value")?;
            sig.finish()?;
            Rule::value(value)
        }
        "Put" => {
            let mut sig = Signature::new(func, args, 2)?;
            let name = expect_str(func, sig.req(0, "name")?)?;
            let value = sig.req(1, "value")?;
            sig.finish()?;
            Rule::put(name, value)
        }
        "Get" => {
            let mut sig = Signature::new(func, args, 2)?;
            let name = expect_str(func, sig.req(0, "name")?)?;
            let default = sig.opt(1, "default").unwrap_or_default();
            sig.finish()?;
            Rule::get(name, default)
        }
        "Do" | "DoCode" | "If" | "IfCode" => {
            let mut sig = Signature::new(func, args, 1)?;
            let source = expect_str(func, sig.req(0, "code")?)?;
            sig.finish()?;
            match func {
                "Do" => Rule::do_expr(&source)?,
                "DoCode" => Rule::do_code(&source)?,
                "If" => Rule::if_expr(&source)?,
                _ => Rule::if_code(&source)?,
            }
        }
        "Wall" => {
            let mut sig = Signature::new(func, args, 1)?;
            let name = expect_str(func, sig.req(0, "name")?)?;
            sig.finish()?;
            Rule::wall(name)
        }
        "Code" => {
            let mut sig = Signature::new(func, args, 1)?;
            let ends = expect_str(func, sig.req(0, "ends")?)?;
            sig.finish()?;
            Rule::code(ends)
        }
        "Mixed" => {
            let mut sig = Signature::new(func, args, 2)?;
            let until = expect_rule(func, sig.req(0, "until")?)?;
            let content = match sig.opt(1, "content") {
                None | Some(Value::None) => None,
                Some(value) => Some(expect_rule(func, value)?),
            };
            sig.finish()?;
            Rule::mixed(until, content)
        }
        "FailIf" => return unary_rule(func, args, Rule::fail_if),
        "Extent" => return unary_rule(func, args, Rule::extent),
        "Take" => return unary_rule(func, args, Rule::take),
        "LookBehind" => return unary_rule(func, args, Rule::look_behind),
        "Not" => return unary_rule(func, args, Rule::not),
        "Peek" => return unary_rule(func, args, Rule::peek),
        "Star" => return unary_rule(func, args, Rule::star),
        "Plus" => return unary_rule(func, args, Rule::plus),
        "Opt" => return unary_rule(func, args, Rule::opt),
        "Replace" => {
            let mut sig = Signature::new(func, args, 2)?;
            let rule = expect_rule(func, sig.req(0, "rule")?)?;
            let value = sig.req(1, "value")?;
            sig.finish()?;
            Rule::replace(rule, value)
        }
        "Repeat" => {
            let mut sig = Signature::new(func, args, 3)?;
            let rule = expect_rule(func, sig.req(0, "rule")?)?;
            let min = match sig.opt(1, "min") {
                Some(v) => expect_usize(func, &v)?,
                None => 0,
            };
            let max = match sig.opt(2, "max") {
                None | Some(Value::None) => None,
                Some(v) => Some(expect_usize(func, &v)?),
            };
            sig.finish()?;
            Rule::repeat(rule, min, max)?
        }
        "Bind" => {
            let mut sig = Signature::new(func, args, 2)?;
            let first = sig.req(0, "name")?;
            let second = sig.req(1, "rule")?;
            sig.finish()?;
            // Accept both Bind(name, rule) and Bind(rule, name).
            match (first, second) {
                (Value::Str(name), rule) => Rule::bind(name, expect_rule(func, rule)?),
                (rule, Value::Str(name)) => Rule::bind(name, expect_rule(func, rule)?),
                (a, b) => {
                    return Err(EvalError::Type(format!(
                        "Bind() expected a name and a rule, got {} and {}",
                        a.type_name(),
                        b.type_name()
                    )));
                }
            }
        }
        "Seq" => Rule::seq(rules_from(func, args.positional)?),
        "Or" => Rule::or(rules_from(func, args.positional)?),
        "Call" => {
            let mut sig = Signature::new(func, args, 2)?;
            let name = expect_str(func, sig.req(0, "name")?)?;
            let call_args = match sig.opt(1, "args") {
                Some(v) => expect_strings(func, v)?,
                None => Vec::new(),
            };
            sig.finish()?;
            Rule::call_with(name, call_args)?
        }
        "Call2" => {
            let mut sig = Signature::new(func, args, 3)?;
            let module = expect_str(func, sig.req(0, "module")?)?;
            let name = expect_str(func, sig.req(1, "name")?)?;
            let call_args = match sig.opt(2, "args") {
                Some(v) => expect_strings(func, v)?,
                None => Vec::new(),
            };
            sig.finish()?;
            Rule::call2(module, name, call_args)?
        }
        "Params" => {
            let mut sig = Signature::new(func, args, 2)?;
            let rule = expect_rule(func, sig.req(0, "rule")?)?;
            let names = expect_strings(func, sig.req(1, "names")?)?;
            sig.finish()?;
            Rule::params(rule, names)
        }
        _ => return Err(EvalError::UnknownFunction(func.to_string())),
    };
    Ok(Value::Rule(rule))
}

pub(crate) fn call_method(recv: Value, name: &str, args: CallArgs) -> EvalResult {
    let unknown = |recv: &Value| EvalError::UnknownMethod {
        type_name: recv.type_name(),
        method: name.to_string(),
    };
    match recv {
        Value::Str(s) => {
            let mut sig = Signature::new(name, args, 2)?;
            let result = match name {
                "join" => {
                    let items = sig.req(0, "items")?;
                    Value::Str(join_values(name, items, &s)?)
                }
                "strip" => match sig.opt(0, "chars") {
                    None | Some(Value::None) => Value::Str(s.trim().to_string()),
                    Some(chars) => {
                        let chars = expect_str(name, chars)?;
                        Value::Str(s.trim_matches(|c| chars.contains(c)).to_string())
                    }
                },
                "lower" => Value::Str(s.to_lowercase()),
                "upper" => Value::Str(s.to_uppercase()),
                "startswith" => {
                    let prefix = expect_str(name, sig.req(0, "prefix")?)?;
                    Value::Bool(s.starts_with(&prefix))
                }
                "endswith" => {
                    let suffix = expect_str(name, sig.req(0, "suffix")?)?;
                    Value::Bool(s.ends_with(&suffix))
                }
                "split" => {
                    let parts: Vec<Value> = match sig.opt(0, "sep") {
                        None | Some(Value::None) => {
                            s.split_whitespace().map(Value::str).collect()
                        }
                        Some(sep) => {
                            let sep = expect_str(name, sep)?;
                            if sep.is_empty() {
                                return Err(EvalError::Argument("empty separator".into()));
                            }
                            s.split(sep.as_str()).map(Value::str).collect()
                        }
                    };
                    Value::List(parts)
                }
                "replace" => {
                    let old = expect_str(name, sig.req(0, "old")?)?;
                    let new = expect_str(name, sig.req(1, "new")?)?;
                    Value::Str(s.replace(&old, &new))
                }
                _ => return Err(unknown(&Value::Str(s))),
            };
            sig.finish()?;
            Ok(result)
        }
        Value::Map(map) => {
            let mut sig = Signature::new(name, args, 2)?;
            let result = match name {
                "get" => {
                    let key = expect_str(name, sig.req(0, "key")?)?;
                    let default = sig.opt(1, "default").unwrap_or_default();
                    map.get(&key).cloned().unwrap_or(default)
                }
                "keys" => Value::List(map.keys().cloned().map(Value::Str).collect()),
                _ => return Err(unknown(&Value::Map(map))),
            };
            sig.finish()?;
            Ok(result)
        }
        other => Err(unknown(&other)),
    }
}
