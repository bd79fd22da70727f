//! The snap pass: resolve names and lower builder rules into the arena.
//!
//! Every distinct builder rule (by allocation, per grammar) becomes exactly
//! one node. A node's id is reserved before its children are visited, so a
//! rule that reaches itself through calls closes into a cycle instead of
//! recursing forever.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::{Node, NodeId, Op, RuleGraph};
use crate::grammar::{Grammar, Library};
use crate::rule::{Rule, RuleKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapError {
    #[error("rule `{0}` is not defined")]
    UndefinedRule(String),

    #[error("import alias `{0}` is not declared")]
    UnknownImport(String),

    #[error("grammar `{0}` is not in the library")]
    MissingGrammar(String),

    #[error("rule `{0}` is an alias of itself")]
    AliasCycle(String),

    #[error("`{call}` passes arguments to `{target}`, which declares no parameters")]
    NotParameterized { call: String, target: String },

    #[error("`{call}` passes {given} arguments but `{target}` declares {declared}")]
    TooManyArguments {
        call: String,
        target: String,
        given: usize,
        declared: usize,
    },

    #[error("lookbehind `{0}` needs a child with a fixed, positive length")]
    LookBehindLength(String),
}

/// Snap `grammar` (resolving imports through `library`) into a graph.
pub(crate) fn snap(grammar: &Grammar, library: &Library) -> Result<RuleGraph, SnapError> {
    let mut snapper = Snapper {
        scopes: vec![Scope {
            grammar,
            prefix: None,
        }],
        scope_paths: IndexMap::new(),
        library,
        nodes: Vec::new(),
        seen: HashMap::new(),
        resolving: Vec::new(),
        builtins: HashMap::new(),
    };

    let mut namespace = IndexMap::with_capacity(grammar.rules().len());
    for (name, rule) in grammar.rules() {
        let id = snapper.snap(rule, 0)?;
        namespace.insert(name.clone(), id);
    }

    let nodes = snapper
        .nodes
        .into_iter()
        .map(|slot| slot.expect("every reserved node is filled"))
        .collect();
    let mut graph = RuleGraph::new(nodes, namespace);
    finish(&mut graph)?;
    Ok(graph)
}

struct Scope<'a> {
    grammar: &'a Grammar,
    /// Dotted path of an imported grammar; `None` for the root.
    prefix: Option<&'a str>,
}

struct Snapper<'a> {
    scopes: Vec<Scope<'a>>,
    scope_paths: IndexMap<&'a str, usize>,
    library: &'a Library,
    nodes: Vec<Option<Node>>,
    /// (scope, rule identity) to node.
    seen: HashMap<(usize, usize), NodeId>,
    /// Argument-less calls being followed since the last real node.
    resolving: Vec<(usize, String)>,
    /// Builtin terminals, kept alive so their identities stay unique.
    builtins: HashMap<String, Rule>,
}

impl<'a> Snapper<'a> {
    fn snap(&mut self, rule: &Rule, scope: usize) -> Result<NodeId, SnapError> {
        let key = (scope, rule.identity());
        if let Some(&id) = self.seen.get(&key) {
            return Ok(id);
        }

        if let RuleKind::Call { module, name, args } = rule.kind()
            && args.is_empty()
        {
            let id = self.follow(scope, module.as_deref(), name)?;
            self.seen.insert(key, id);
            return Ok(id);
        }

        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(None);
        self.seen.insert(key, id);

        let outer = std::mem::take(&mut self.resolving);
        let op = self.lower(rule, scope);
        self.resolving = outer;
        let op = op?;

        let name = rule.name().map(|name| match self.scopes[scope].prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        });
        self.nodes[id.index()] = Some(Node::new(name, op));
        Ok(id)
    }

    /// Snap the rule a call refers to, rejecting pure alias cycles.
    fn follow(&mut self, scope: usize, module: Option<&str>, name: &str) -> Result<NodeId, SnapError> {
        let (target, target_scope) = self.resolve(scope, module, name)?;
        let key = (target_scope, name.to_string());
        if self.resolving.contains(&key) {
            return Err(SnapError::AliasCycle(qualified(module, name)));
        }
        self.resolving.push(key);
        let id = self.snap(&target, target_scope);
        self.resolving.pop();
        id
    }

    fn resolve(
        &mut self,
        scope: usize,
        module: Option<&str>,
        name: &str,
    ) -> Result<(Rule, usize), SnapError> {
        let target_scope = match module {
            None => scope,
            Some(alias) => self.import_scope(scope, alias)?,
        };
        let rule = self.scopes[target_scope]
            .grammar
            .rule(name)
            .cloned()
            .or_else(|| self.builtin(name))
            .ok_or_else(|| SnapError::UndefinedRule(qualified(module, name)))?;
        Ok((rule, target_scope))
    }

    fn builtin(&mut self, name: &str) -> Option<Rule> {
        if let Some(rule) = self.builtins.get(name) {
            return Some(rule.clone());
        }
        let rule = builtin(name)?;
        self.builtins.insert(name.to_string(), rule.clone());
        Some(rule)
    }

    fn import_scope(&mut self, scope: usize, alias: &str) -> Result<usize, SnapError> {
        let grammar = self.scopes[scope].grammar;
        let path = grammar
            .imports()
            .get(alias)
            .ok_or_else(|| SnapError::UnknownImport(alias.to_string()))?;
        if let Some(&index) = self.scope_paths.get(path.as_str()) {
            return Ok(index);
        }
        let (path, imported) = self
            .library
            .get_key_value(path)
            .ok_or_else(|| SnapError::MissingGrammar(path.clone()))?;
        let index = self.scopes.len();
        self.scopes.push(Scope {
            grammar: imported,
            prefix: Some(path),
        });
        self.scope_paths.insert(path, index);
        Ok(index)
    }

    fn lower(&mut self, rule: &Rule, scope: usize) -> Result<Op, SnapError> {
        let op = match rule.kind() {
            RuleKind::Any => Op::Any,
            RuleKind::AlphaNum => Op::AlphaNum,
            RuleKind::StreamStart => Op::StreamStart,
            RuleKind::LineStart => Op::LineStart,
            RuleKind::LineEnd => Op::LineEnd,
            RuleKind::StreamEnd => Op::StreamEnd,
            RuleKind::BlockBreak => Op::BlockBreak,
            RuleKind::Put { name, value } => Op::Put {
                name: name.clone(),
                value: value.clone(),
            },
            RuleKind::Get { name, default } => Op::Get {
                name: name.clone(),
                default: default.clone(),
            },
            RuleKind::Literal(text) => Op::Literal(text.clone()),
            RuleKind::Among(set) => Op::Among(set.clone()),
            RuleKind::Regex(pattern) => Op::Regex(pattern.clone()),
            RuleKind::Value(value) => Op::Value(value.clone()),
            RuleKind::Or(rules) => Op::Or(self.snap_all(rules, scope)?),
            RuleKind::Seq(rules) => Op::Seq(self.snap_all(rules, scope)?),
            RuleKind::Not(r) => Op::Not(self.snap(r, scope)?),
            RuleKind::Peek(r) => Op::Peek(self.snap(r, scope)?),
            RuleKind::LookBehind(r) => Op::LookBehind {
                rule: self.snap(r, scope)?,
                len: 0,
            },
            RuleKind::FailIf(r) => Op::FailIf(self.snap(r, scope)?),
            RuleKind::Repeat { rule, min, max } => Op::Repeat {
                rule: self.snap(rule, scope)?,
                min: *min,
                max: *max,
            },
            RuleKind::Opt(r) => Op::Opt(self.snap(r, scope)?),
            RuleKind::FirstChars(set) => Op::FirstChars(set.clone()),
            RuleKind::Replace { rule, value } => Op::Replace {
                rule: self.snap(rule, scope)?,
                value: value.clone(),
            },
            RuleKind::Take(r) => Op::Take(self.snap(r, scope)?),
            RuleKind::Bind { rule, name } => Op::Bind {
                rule: self.snap(rule, scope)?,
                name: name.clone(),
            },
            RuleKind::Extent(r) => Op::Extent(self.snap(r, scope)?),
            RuleKind::Params { rule, names } => Op::Params {
                rule: self.snap(rule, scope)?,
                names: names.clone(),
            },
            RuleKind::Call { module, name, args } => Op::Call {
                target: self.follow(scope, module.as_deref(), name)?,
                args: args.clone(),
            },
            RuleKind::Mixed { until, content } => Op::Mixed {
                until: self.snap(until, scope)?,
                content: match content {
                    Some(content) => Some(self.snap(content, scope)?),
                    None => None,
                },
            },
            RuleKind::Do(action) => Op::Do(action.clone()),
            RuleKind::DoCode(action) => Op::DoCode(action.clone()),
            RuleKind::If(action) => Op::If(action.clone()),
            RuleKind::IfCode(action) => Op::IfCode(action.clone()),
            RuleKind::Wall(name) => Op::Wall(name.clone()),
            RuleKind::Code(ends) => Op::Code(ends.clone()),
            RuleKind::Args => Op::Args,
        };
        Ok(op)
    }

    fn snap_all(&mut self, rules: &[Rule], scope: usize) -> Result<Vec<NodeId>, SnapError> {
        rules.iter().map(|r| self.snap(r, scope)).collect()
    }
}

/// Terminals every grammar can call by name without defining them.
fn builtin(name: &str) -> Option<Rule> {
    let rule = match name {
        "any" => Rule::any(),
        "alphanum" => Rule::alphanum(),
        "streamstart" => Rule::stream_start(),
        "linestart" => Rule::line_start(),
        "lineend" => Rule::line_end(),
        "streamend" => Rule::stream_end(),
        "blockbreak" => Rule::block_break(),
        _ => return None,
    };
    Some(rule)
}

fn qualified(module: Option<&str>, name: &str) -> String {
    match module {
        Some(module) => format!("{module}.{name}"),
        None => name.to_string(),
    }
}

/// Checks that need the whole graph: lookbehind lengths and call arity.
fn finish(graph: &mut RuleGraph) -> Result<(), SnapError> {
    let mut lengths = Vec::new();
    for id in graph.ids() {
        match graph.op(id) {
            Op::LookBehind { rule, .. } => match graph.fixed_length(*rule) {
                Some(len) if len > 0 => lengths.push((id, len)),
                _ => return Err(SnapError::LookBehindLength(graph.describe(id))),
            },
            Op::Call { target, args } => match graph.op(*target) {
                Op::Params { names, .. } if names.len() >= args.len() => {}
                Op::Params { names, .. } => {
                    return Err(SnapError::TooManyArguments {
                        call: graph.describe(id),
                        target: graph.describe(*target),
                        given: args.len(),
                        declared: names.len(),
                    });
                }
                _ => {
                    return Err(SnapError::NotParameterized {
                        call: graph.describe(id),
                        target: graph.describe(*target),
                    });
                }
            },
            _ => {}
        }
    }
    for (id, len) in lengths {
        if let Op::LookBehind { len: slot, .. } = graph.op_mut(id) {
            *slot = len;
        }
    }
    Ok(())
}
