//! Builder-form rules.
//!
//! A [`Rule`] is an immutable, cheaply clonable handle. Grammars are written
//! as trees of rules where recursion goes through [`RuleKind::Call`] by name;
//! the snap pass turns the named graph into an arena of resolved nodes.

use std::fmt;
use std::ops::{Add, BitOr};
use std::sync::Arc;

use regex_automata::meta::Regex;
use regex_automata::{Anchored, Input, PatternID};

use scrivener_core::{CharSet, Stream, escape};

use crate::expr::{self, Expr};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("invalid regular expression /{pattern}/: {message}")]
    Regex { pattern: String, message: String },

    #[error("invalid expression `{code}`: {error}")]
    Expr { code: String, error: expr::ExprError },

    #[error("invalid repeat bounds {{{min},{max}}}")]
    Bounds { min: usize, max: usize },

    #[error("repeat count `{{0}}` allows no repetitions; use `*` for any number")]
    ZeroRepeat,
}

/// A compiled action expression together with the text it was written as.
///
/// Actions compare by source text.
#[derive(Clone)]
pub struct Action {
    source: String,
    expr: Arc<Expr>,
}

impl Action {
    pub fn parse(source: impl Into<String>) -> Result<Self, RuleError> {
        let source = source.into();
        let expr = expr::parse(&source).map_err(|error| RuleError::Expr {
            code: source.clone(),
            error,
        })?;
        Ok(Self {
            source,
            expr: Arc::new(expr),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// An anchored regular expression.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Arc<Regex>,
    groups: Vec<String>,
}

/// A successful anchored regex match.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub text: String,
    /// Character position after the match.
    pub end: usize,
    /// Named groups in declaration order; unmatched groups are `None`.
    pub groups: Vec<(String, Value)>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self, RuleError> {
        let source = source.into();
        let regex = Regex::new(&source).map_err(|e| RuleError::Regex {
            pattern: source.clone(),
            message: e.to_string(),
        })?;
        let groups = regex
            .group_info()
            .pattern_names(PatternID::ZERO)
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(Self {
            source,
            regex: Arc::new(regex),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn group_names(&self) -> &[String] {
        &self.groups
    }

    /// Match anchored at `pos`. Assertions see the whole stream.
    pub fn match_at(&self, stream: &Stream, pos: usize) -> Option<PatternMatch> {
        let haystack = stream.as_str();
        let start = stream.byte_offset(pos);
        let input = Input::new(haystack)
            .range(start..)
            .anchored(Anchored::Yes);
        let mut caps = self.regex.create_captures();
        self.regex.search_captures(&input, &mut caps);
        let whole = caps.get_match()?;

        let groups = self
            .groups
            .iter()
            .map(|name| {
                let value = caps
                    .get_group_by_name(name)
                    .map_or(Value::None, |span| Value::str(&haystack[span.range()]));
                (name.clone(), value)
            })
            .collect();

        Some(PatternMatch {
            text: haystack[whole.range()].to_string(),
            end: stream.char_pos(whole.end()),
            groups,
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Any,
    AlphaNum,
    StreamStart,
    LineStart,
    LineEnd,
    StreamEnd,
    BlockBreak,
    Put { name: String, value: Value },
    Get { name: String, default: Value },
    Literal(String),
    Among(CharSet),
    Regex(Pattern),
    Value(Value),
    Or(Vec<Rule>),
    Seq(Vec<Rule>),
    Not(Rule),
    Peek(Rule),
    LookBehind(Rule),
    FailIf(Rule),
    Repeat {
        rule: Rule,
        min: usize,
        max: Option<usize>,
    },
    Opt(Rule),
    FirstChars(CharSet),
    Replace { rule: Rule, value: Value },
    Take(Rule),
    Bind { rule: Rule, name: String },
    Extent(Rule),
    Params { rule: Rule, names: Vec<String> },
    Call {
        module: Option<String>,
        name: String,
        args: Vec<Action>,
    },
    Mixed {
        until: Rule,
        content: Option<Rule>,
    },
    Do(Action),
    DoCode(Action),
    If(Action),
    IfCode(Action),
    Wall(String),
    Code(String),
    Args,
}

#[derive(Debug, PartialEq)]
struct RuleDef {
    name: Option<String>,
    kind: RuleKind,
}

/// Shared handle to a rule.
///
/// Equality is structural; two handles to the same allocation are equal
/// without walking the tree.
#[derive(Clone)]
pub struct Rule(Arc<RuleDef>);

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Rule(Arc::new(RuleDef { name: None, kind }))
    }

    pub fn kind(&self) -> &RuleKind {
        &self.0.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// A copy of this rule carrying `name`. Children stay shared.
    pub fn named(&self, name: impl Into<String>) -> Rule {
        Rule(Arc::new(RuleDef {
            name: Some(name.into()),
            kind: self.0.kind.clone(),
        }))
    }

    /// Address of the shared definition; stable for the handle's lifetime.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn any() -> Rule {
        Rule::new(RuleKind::Any)
    }

    pub fn alphanum() -> Rule {
        Rule::new(RuleKind::AlphaNum)
    }

    pub fn stream_start() -> Rule {
        Rule::new(RuleKind::StreamStart)
    }

    pub fn line_start() -> Rule {
        Rule::new(RuleKind::LineStart)
    }

    pub fn line_end() -> Rule {
        Rule::new(RuleKind::LineEnd)
    }

    pub fn stream_end() -> Rule {
        Rule::new(RuleKind::StreamEnd)
    }

    pub fn block_break() -> Rule {
        Rule::new(RuleKind::BlockBreak)
    }

    pub fn put(name: impl Into<String>, value: impl Into<Value>) -> Rule {
        Rule::new(RuleKind::Put {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn get(name: impl Into<String>, default: impl Into<Value>) -> Rule {
        Rule::new(RuleKind::Get {
            name: name.into(),
            default: default.into(),
        })
    }

    pub fn literal(text: impl Into<String>) -> Rule {
        Rule::new(RuleKind::Literal(text.into()))
    }

    pub fn among(chars: impl Into<CharSet>) -> Rule {
        Rule::new(RuleKind::Among(chars.into()))
    }

    pub fn regex(pattern: &str) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::Regex(Pattern::new(pattern)?)))
    }

    pub fn value(value: impl Into<Value>) -> Rule {
        Rule::new(RuleKind::Value(value.into()))
    }

    pub fn or(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::new(RuleKind::Or(rules.into_iter().collect()))
    }

    pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::new(RuleKind::Seq(rules.into_iter().collect()))
    }

    pub fn not(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Not(rule.into()))
    }

    pub fn peek(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Peek(rule.into()))
    }

    pub fn look_behind(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::LookBehind(rule.into()))
    }

    pub fn fail_if(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::FailIf(rule.into()))
    }

    /// `min` to `max` repetitions; `max = None` is unbounded. A maximum of
    /// zero is rejected.
    pub fn repeat(rule: impl Into<Rule>, min: usize, max: Option<usize>) -> Result<Rule, RuleError> {
        match max {
            Some(0) => return Err(RuleError::ZeroRepeat),
            Some(max) if max < min => return Err(RuleError::Bounds { min, max }),
            _ => {}
        }
        Ok(Rule::new(RuleKind::Repeat {
            rule: rule.into(),
            min,
            max,
        }))
    }

    pub fn star(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Repeat {
            rule: rule.into(),
            min: 0,
            max: None,
        })
    }

    pub fn plus(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Repeat {
            rule: rule.into(),
            min: 1,
            max: None,
        })
    }

    pub fn opt(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Opt(rule.into()))
    }

    pub fn first_chars(chars: impl Into<CharSet>) -> Rule {
        Rule::new(RuleKind::FirstChars(chars.into()))
    }

    pub fn replace(rule: impl Into<Rule>, value: impl Into<Value>) -> Rule {
        Rule::new(RuleKind::Replace {
            rule: rule.into(),
            value: value.into(),
        })
    }

    pub fn take(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Take(rule.into()))
    }

    pub fn bind(name: impl Into<String>, rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Bind {
            rule: rule.into(),
            name: name.into(),
        })
    }

    pub fn extent(rule: impl Into<Rule>) -> Rule {
        Rule::new(RuleKind::Extent(rule.into()))
    }

    pub fn params<S: Into<String>>(rule: impl Into<Rule>, names: impl IntoIterator<Item = S>) -> Rule {
        Rule::new(RuleKind::Params {
            rule: rule.into(),
            names: names.into_iter().map(Into::into).collect(),
        })
    }

    pub fn call(name: impl Into<String>) -> Rule {
        Rule::new(RuleKind::Call {
            module: None,
            name: name.into(),
            args: Vec::new(),
        })
    }

    /// Call with argument expressions, parsed eagerly.
    pub fn call_with<S: AsRef<str>>(
        name: impl Into<String>,
        args: impl IntoIterator<Item = S>,
    ) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::Call {
            module: None,
            name: name.into(),
            args: parse_actions(args)?,
        }))
    }

    /// Call into an imported grammar.
    pub fn call2<S: AsRef<str>>(
        module: impl Into<String>,
        name: impl Into<String>,
        args: impl IntoIterator<Item = S>,
    ) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::Call {
            module: Some(module.into()),
            name: name.into(),
            args: parse_actions(args)?,
        }))
    }

    pub fn mixed(until: impl Into<Rule>, content: Option<Rule>) -> Rule {
        Rule::new(RuleKind::Mixed {
            until: until.into(),
            content,
        })
    }

    pub fn do_expr(source: &str) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::Do(Action::parse(source)?)))
    }

    pub fn do_code(source: &str) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::DoCode(Action::parse(source)?)))
    }

    pub fn if_expr(source: &str) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::If(Action::parse(source)?)))
    }

    pub fn if_code(source: &str) -> Result<Rule, RuleError> {
        Ok(Rule::new(RuleKind::IfCode(Action::parse(source)?)))
    }

    pub fn wall(name: impl Into<String>) -> Rule {
        Rule::new(RuleKind::Wall(name.into()))
    }

    pub fn code(ends: impl Into<String>) -> Rule {
        Rule::new(RuleKind::Code(ends.into()))
    }

    pub fn args() -> Rule {
        Rule::new(RuleKind::Args)
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Rule> {
        match self.kind() {
            RuleKind::Or(rules) | RuleKind::Seq(rules) => rules.iter().collect(),
            RuleKind::Not(rule)
            | RuleKind::Peek(rule)
            | RuleKind::LookBehind(rule)
            | RuleKind::FailIf(rule)
            | RuleKind::Opt(rule)
            | RuleKind::Take(rule)
            | RuleKind::Extent(rule)
            | RuleKind::Repeat { rule, .. }
            | RuleKind::Replace { rule, .. }
            | RuleKind::Bind { rule, .. }
            | RuleKind::Params { rule, .. } => vec![rule],
            RuleKind::Mixed { until, content } => {
                let mut children = vec![until];
                children.extend(content);
                children
            }
            _ => Vec::new(),
        }
    }

    /// Grammar-like rendering of this rule's definition, ignoring its own name.
    pub fn body(&self) -> String {
        let mut out = String::new();
        write_kind(&mut out, self.kind());
        out
    }
}

fn parse_actions<S: AsRef<str>>(args: impl IntoIterator<Item = S>) -> Result<Vec<Action>, RuleError> {
    args.into_iter().map(|a| Action::parse(a.as_ref())).collect()
}

impl From<&str> for Rule {
    fn from(text: &str) -> Self {
        Rule::literal(text)
    }
}

impl From<String> for Rule {
    fn from(text: String) -> Self {
        Rule::literal(text)
    }
}

impl From<&Rule> for Rule {
    fn from(rule: &Rule) -> Self {
        rule.clone()
    }
}

fn unnamed_children(rule: Rule, is_seq: bool) -> Vec<Rule> {
    match rule.kind() {
        RuleKind::Seq(rules) if is_seq && rule.name().is_none() => rules.clone(),
        RuleKind::Or(rules) if !is_seq && rule.name().is_none() => rules.clone(),
        _ => vec![rule],
    }
}

impl<R: Into<Rule>> Add<R> for Rule {
    type Output = Rule;

    fn add(self, rhs: R) -> Rule {
        let mut rules = unnamed_children(self, true);
        rules.extend(unnamed_children(rhs.into(), true));
        Rule::seq(rules)
    }
}

impl Add<Rule> for &str {
    type Output = Rule;

    fn add(self, rhs: Rule) -> Rule {
        Rule::literal(self) + rhs
    }
}

impl<R: Into<Rule>> BitOr<R> for Rule {
    type Output = Rule;

    fn bitor(self, rhs: R) -> Rule {
        let mut rules = unnamed_children(self, false);
        rules.extend(unnamed_children(rhs.into(), false));
        Rule::or(rules)
    }
}

impl BitOr<Rule> for &str {
    type Output = Rule;

    fn bitor(self, rhs: Rule) -> Rule {
        Rule::literal(self) | rhs
    }
}

fn write_child(out: &mut String, rule: &Rule) {
    match rule.name() {
        Some(name) => out.push_str(name),
        None => match rule.kind() {
            RuleKind::Or(_) | RuleKind::Seq(_) => {
                out.push('(');
                write_kind(out, rule.kind());
                out.push(')');
            }
            kind => write_kind(out, kind),
        },
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value.to_literal() {
        Some(text) => out.push_str(&text),
        None => out.push_str(&value.to_string()),
    }
}

fn write_kind(out: &mut String, kind: &RuleKind) {
    match kind {
        RuleKind::Any => out.push_str("any"),
        RuleKind::AlphaNum => out.push_str("alphanum"),
        RuleKind::StreamStart => out.push_str("streamstart"),
        RuleKind::LineStart => out.push_str("linestart"),
        RuleKind::LineEnd => out.push_str("lineend"),
        RuleKind::StreamEnd => out.push_str("streamend"),
        RuleKind::BlockBreak => out.push_str("blockbreak"),
        RuleKind::Put { name, value } => {
            out.push_str(&format!("Put({name}, "));
            write_value(out, value);
            out.push(')');
        }
        RuleKind::Get { name, default } => {
            out.push_str(&format!("Get({name}, "));
            write_value(out, default);
            out.push(')');
        }
        RuleKind::Literal(text) => out.push_str(&escape::quote(text)),
        RuleKind::Among(set) => out.push_str(&format!("{set:?}")),
        RuleKind::Regex(pattern) => out.push_str(&format!("{pattern:?}")),
        RuleKind::Value(value) => {
            out.push_str("-> ");
            write_value(out, value);
        }
        RuleKind::Or(rules) => {
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    out.push_str(" | ");
                }
                write_child(out, rule);
            }
        }
        RuleKind::Seq(rules) => {
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_child(out, rule);
            }
        }
        RuleKind::Not(rule) => {
            out.push('~');
            write_child(out, rule);
        }
        RuleKind::Peek(rule) => {
            out.push_str("~~");
            write_child(out, rule);
        }
        RuleKind::LookBehind(rule) => {
            out.push('^');
            write_child(out, rule);
        }
        RuleKind::FailIf(rule) => {
            out.push_str(".(");
            write_child(out, rule);
            out.push(')');
        }
        RuleKind::Repeat { rule, min, max } => {
            write_child(out, rule);
            match (min, max) {
                (0, None) => out.push('*'),
                (1, None) => out.push('+'),
                (min, None) => out.push_str(&format!("{{{min},}}")),
                (min, Some(max)) if min == max => out.push_str(&format!("{{{min}}}")),
                (min, Some(max)) => out.push_str(&format!("{{{min},{max}}}")),
            }
        }
        RuleKind::Opt(rule) => {
            write_child(out, rule);
            out.push('?');
        }
        RuleKind::FirstChars(set) => out.push_str(&format!(">{set:?}")),
        RuleKind::Replace { rule, value } => {
            out.push_str("Replace(");
            write_child(out, rule);
            out.push_str(", ");
            write_value(out, value);
            out.push(')');
        }
        RuleKind::Take(rule) => {
            out.push('<');
            write_child(out, rule);
            out.push('>');
        }
        RuleKind::Bind { rule, name } => {
            write_child(out, rule);
            out.push(':');
            out.push_str(name);
        }
        RuleKind::Extent(rule) => {
            out.push_str("x(");
            write_child(out, rule);
            out.push(')');
        }
        RuleKind::Params { rule, names } => {
            out.push_str(&format!("Params[{}] ", names.join(" ")));
            write_child(out, rule);
        }
        RuleKind::Call { module, name, args } => {
            if let Some(module) = module {
                out.push_str(module);
                out.push('.');
            }
            out.push_str(name);
            if !args.is_empty() {
                let args: Vec<&str> = args.iter().map(Action::source).collect();
                out.push_str(&format!("({})", args.join(" ")));
            }
        }
        RuleKind::Mixed { until, content } => {
            out.push_str("@(");
            write_child(out, until);
            if let Some(content) = content {
                out.push_str(", ");
                write_child(out, content);
            }
            out.push(')');
        }
        RuleKind::Do(action) => out.push_str(&format!("!({})", action.source())),
        RuleKind::DoCode(action) => out.push_str(&format!("!!({})", action.source())),
        RuleKind::If(action) => out.push_str(&format!("?({})", action.source())),
        RuleKind::IfCode(action) => out.push_str(&format!("??({})", action.source())),
        RuleKind::Wall(name) => out.push_str(&format!("!!{name}")),
        RuleKind::Code(ends) => out.push_str(&format!("Code({})", escape::quote(ends))),
        RuleKind::Args => out.push_str("Args"),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => f.write_str(&self.body()),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<{name} = {}>", self.body()),
            None => write!(f, "<{}>", self.body()),
        }
    }
}
