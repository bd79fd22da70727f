//! Snapped rule graphs.
//!
//! The snap pass lowers builder [`Rule`](crate::Rule)s into an arena of
//! [`Node`]s addressed by [`NodeId`]. Named calls without arguments are
//! replaced by direct references, so recursion becomes a cycle of ids.
//! The arena is immutable afterwards except for per-node dispatch tables,
//! which are computed on first use.

mod analysis;
mod dispatch;
mod snap;

use std::fmt::{self, Write as _};
use std::sync::OnceLock;

use indexmap::IndexMap;

use scrivener_core::{CharSet, Colors, escape};

use crate::rule::{Action, Pattern};
use crate::value::Value;

pub use dispatch::{Dispatch, OrTable, guard_admits};
pub use snap::SnapError;
pub(crate) use snap::snap;

#[cfg(test)]
mod graph_tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_index(index: usize) -> Self {
        NodeId(u32::try_from(index).expect("rule graph exceeds u32 nodes"))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("#{}", self.0))
    }
}

/// A snapped rule.
#[derive(Clone, Debug)]
pub enum Op {
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
    Or(Vec<NodeId>),
    Seq(Vec<NodeId>),
    Not(NodeId),
    Peek(NodeId),
    /// `len` is the child's fixed length, filled in once the graph is complete.
    LookBehind { rule: NodeId, len: usize },
    FailIf(NodeId),
    Repeat {
        rule: NodeId,
        min: usize,
        max: Option<usize>,
    },
    Opt(NodeId),
    FirstChars(CharSet),
    Replace { rule: NodeId, value: Value },
    Take(NodeId),
    Bind { rule: NodeId, name: String },
    Extent(NodeId),
    Params { rule: NodeId, names: Vec<String> },
    /// A call with arguments; the target is always a `Params` node.
    Call { target: NodeId, args: Vec<Action> },
    Mixed {
        until: NodeId,
        content: Option<NodeId>,
    },
    Do(Action),
    DoCode(Action),
    If(Action),
    IfCode(Action),
    Wall(String),
    Code(String),
    Args,
}

impl Op {
    /// Variant name, as used in dumps and traces.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Op::Any => "Any",
            Op::AlphaNum => "AlphaNum",
            Op::StreamStart => "StreamStart",
            Op::LineStart => "LineStart",
            Op::LineEnd => "LineEnd",
            Op::StreamEnd => "StreamEnd",
            Op::BlockBreak => "BlockBreak",
            Op::Put { .. } => "Put",
            Op::Get { .. } => "Get",
            Op::Literal(_) => "Literal",
            Op::Among(_) => "Among",
            Op::Regex(_) => "Regex",
            Op::Value(_) => "Value",
            Op::Or(_) => "Or",
            Op::Seq(_) => "Seq",
            Op::Not(_) => "Not",
            Op::Peek(_) => "Peek",
            Op::LookBehind { .. } => "LookBehind",
            Op::FailIf(_) => "FailIf",
            Op::Repeat { .. } => "Repeat",
            Op::Opt(_) => "Opt",
            Op::FirstChars(_) => "FirstChars",
            Op::Replace { .. } => "Replace",
            Op::Take(_) => "Take",
            Op::Bind { .. } => "Bind",
            Op::Extent(_) => "Extent",
            Op::Params { .. } => "Params",
            Op::Call { .. } => "Call",
            Op::Mixed { .. } => "Mixed",
            Op::Do(_) => "Do",
            Op::DoCode(_) => "DoCode",
            Op::If(_) => "If",
            Op::IfCode(_) => "IfCode",
            Op::Wall(_) => "Wall",
            Op::Code(_) => "Code",
            Op::Args => "Args",
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Op::Or(ids) | Op::Seq(ids) => ids.clone(),
            Op::Not(id)
            | Op::Peek(id)
            | Op::FailIf(id)
            | Op::Opt(id)
            | Op::Take(id)
            | Op::Extent(id)
            | Op::LookBehind { rule: id, .. }
            | Op::Repeat { rule: id, .. }
            | Op::Replace { rule: id, .. }
            | Op::Bind { rule: id, .. }
            | Op::Params { rule: id, .. }
            | Op::Call { target: id, .. } => vec![*id],
            Op::Mixed { until, content } => {
                let mut ids = vec![*until];
                ids.extend(*content);
                ids
            }
            _ => Vec::new(),
        }
    }

    /// Terminals never evaluate another node.
    pub fn is_terminal(&self) -> bool {
        self.children().is_empty()
    }
}

#[derive(Debug)]
pub struct Node {
    name: Option<String>,
    op: Op,
    dispatch: OnceLock<Dispatch>,
}

impl Node {
    pub(crate) fn new(name: Option<String>, op: Op) -> Self {
        Self {
            name,
            op,
            dispatch: OnceLock::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn op(&self) -> &Op {
        &self.op
    }
}

/// The arena produced by the snap pass.
#[derive(Debug)]
pub struct RuleGraph {
    nodes: Vec<Node>,
    namespace: IndexMap<String, NodeId>,
}

impl RuleGraph {
    pub(crate) fn new(nodes: Vec<Node>, namespace: IndexMap<String, NodeId>) -> Self {
        Self { nodes, namespace }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn op(&self, id: NodeId) -> &Op {
        &self.nodes[id.index()].op
    }

    pub(crate) fn op_mut(&mut self, id: NodeId) -> &mut Op {
        &mut self.nodes[id.index()].op
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Rule name to node, in grammar order.
    pub fn namespace(&self) -> &IndexMap<String, NodeId> {
        &self.namespace
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.namespace.get(name).copied()
    }

    /// Whether `id` is a named composite rule. Both backends count nested
    /// entries into these against the recursion limit; every cycle in the
    /// graph passes through one.
    pub fn is_rule(&self, id: NodeId) -> bool {
        self.node(id).name().is_some() && !self.op(id).is_terminal()
    }

    /// Short human-readable description used in errors and traces.
    ///
    /// Named nodes are described by name; anonymous nodes by a shallow
    /// rendering whose children appear by name or id.
    pub fn describe(&self, id: NodeId) -> String {
        match self.node(id).name() {
            Some(name) => name.to_string(),
            None => self.render_op(id),
        }
    }

    fn child_label(&self, id: NodeId) -> String {
        match self.node(id).name() {
            Some(name) => name.to_string(),
            None if self.op(id).is_terminal() => self.render_op(id),
            None => id.to_string(),
        }
    }

    /// One-level rendering of a node's operation.
    pub fn render_op(&self, id: NodeId) -> String {
        let op = self.op(id);
        let label = |id: &NodeId| self.child_label(*id);
        match op {
            Op::Any => "any".into(),
            Op::AlphaNum => "alphanum".into(),
            Op::StreamStart => "streamstart".into(),
            Op::LineStart => "linestart".into(),
            Op::LineEnd => "lineend".into(),
            Op::StreamEnd => "streamend".into(),
            Op::BlockBreak => "blockbreak".into(),
            Op::Put { name, value } => format!("Put({name}, {value})"),
            Op::Get { name, default } => format!("Get({name}, {default})"),
            Op::Literal(text) => escape::quote(text),
            Op::Among(set) => format!("{set:?}"),
            Op::Regex(pattern) => format!("{pattern:?}"),
            Op::Value(value) => format!("-> {value}"),
            Op::Or(ids) => format!(
                "({})",
                ids.iter().map(label).collect::<Vec<_>>().join(" | ")
            ),
            Op::Seq(ids) => format!("({})", ids.iter().map(label).collect::<Vec<_>>().join(" ")),
            Op::Not(id) => format!("~{}", label(id)),
            Op::Peek(id) => format!("~~{}", label(id)),
            Op::LookBehind { rule, .. } => format!("^{}", label(rule)),
            Op::FailIf(id) => format!(".({})", label(id)),
            Op::Repeat { rule, min, max } => match (min, max) {
                (0, None) => format!("{}*", label(rule)),
                (1, None) => format!("{}+", label(rule)),
                (min, None) => format!("{}{{{min},}}", label(rule)),
                (min, Some(max)) => format!("{}{{{min},{max}}}", label(rule)),
            },
            Op::Opt(id) => format!("{}?", label(id)),
            Op::FirstChars(set) => format!(">{set:?}"),
            Op::Replace { rule, value } => format!("Replace({}, {value})", label(rule)),
            Op::Take(id) => format!("<{}>", label(id)),
            Op::Bind { rule, name } => format!("{}:{name}", label(rule)),
            Op::Extent(id) => format!("x({})", label(id)),
            Op::Params { rule, names } => format!("Params[{}] {}", names.join(" "), label(rule)),
            Op::Call { target, args } => {
                let args: Vec<&str> = args.iter().map(Action::source).collect();
                format!("{}({})", label(target), args.join(" "))
            }
            Op::Mixed { until, content } => match content {
                Some(content) => format!("@({}, {})", label(until), label(content)),
                None => format!("@({})", label(until)),
            },
            Op::Do(action) => format!("!({})", action.source()),
            Op::DoCode(action) => format!("!!({})", action.source()),
            Op::If(action) => format!("?({})", action.source()),
            Op::IfCode(action) => format!("??({})", action.source()),
            Op::Wall(name) => format!("!!{name}"),
            Op::Code(ends) => format!("Code({})", escape::quote(ends)),
            Op::Args => "Args".into(),
        }
    }

    /// Every node with its analysis results, one per line.
    pub fn dump(&self, colors: Colors) -> String {
        let c = colors;
        let mut out = String::new();
        for id in self.ids() {
            let name = match self.node(id).name() {
                Some(name) => format!(" {}{name}{}", c.blue, c.reset),
                None => String::new(),
            };
            let firsts = match self.first_chars(id) {
                Some(set) => format!("{set:?}"),
                None => "*".to_string(),
            };
            let len = match self.fixed_length(id) {
                Some(n) => n.to_string(),
                None => "?".to_string(),
            };
            let _ = writeln!(
                out,
                "{}{id:>5}{}{name} {} {}first={firsts} len={len}{}",
                c.dim,
                c.reset,
                self.render_op(id),
                c.dim,
                c.reset
            );
        }
        out
    }
}
