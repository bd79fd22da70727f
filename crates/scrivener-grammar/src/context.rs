//! Scoped variable bindings for a single parse.
//!
//! Scopes form a stack: lookups search from the innermost scope outward,
//! writes go to the innermost scope. Combinators push a scope before trying
//! something that may fail and then either [`merge`](ParserContext::merge) it
//! into the enclosing scope or [`discard`](ParserContext::discard) it, so a
//! miss never leaves bindings behind.
//!
//! The root scope also owns the per-document cache and the debug flag.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::value::Value;

pub type Bindings = IndexMap<String, Value>;

#[derive(Clone, Debug)]
pub struct ParserContext {
    /// Never empty; index 0 is the root scope.
    scopes: Vec<Bindings>,
    cache: HashMap<String, Value>,
    debug: bool,
}

impl Default for ParserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserContext {
    pub fn new() -> Self {
        Self {
            scopes: vec![Bindings::new()],
            cache: HashMap::new(),
            debug: false,
        }
    }

    /// A root context pre-populated with `bindings`.
    pub fn with_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut ctx = Self::new();
        ctx.update(bindings);
        ctx
    }

    /// Enable or disable tracing for parses run in this context.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Look `name` up, innermost scope first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Look `name` up, falling back to `default`.
    pub fn get_or(&self, name: &str, default: &Value) -> Value {
        self.get(name).unwrap_or(default).clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.innermost_mut().insert(name.into(), value);
    }

    /// Bind several names in the innermost scope.
    pub fn update<I, K>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let scope = self.innermost_mut();
        for (name, value) in bindings {
            scope.insert(name.into(), value);
        }
    }

    /// Bindings of the innermost scope only.
    pub fn first(&self) -> &Bindings {
        self.scopes.last().expect("context always has a root scope")
    }

    pub fn push(&mut self) {
        self.scopes.push(Bindings::new());
    }

    pub fn push_with(&mut self, bindings: Bindings) {
        self.scopes.push(bindings);
    }

    /// Pop the innermost scope, copying its bindings into the new innermost.
    pub fn merge(&mut self) {
        if self.scopes.len() > 1 {
            let popped = self.scopes.pop().unwrap_or_default();
            self.innermost_mut().extend(popped);
        }
    }

    /// Pop the innermost scope, dropping its bindings.
    pub fn discard(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Drop scopes until only `depth` pushed scopes remain.
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth + 1);
    }

    /// Number of pushed scopes above the root.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Every visible binding, inner scopes shadowing outer ones.
    pub fn visible(&self) -> Bindings {
        let mut all = Bindings::new();
        for scope in &self.scopes {
            for (name, value) in scope {
                all.insert(name.clone(), value.clone());
            }
        }
        all
    }

    pub fn cache(&self) -> &HashMap<String, Value> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.cache
    }

    fn innermost_mut(&mut self) -> &mut Bindings {
        self.scopes
            .last_mut()
            .expect("context always has a root scope")
    }
}
