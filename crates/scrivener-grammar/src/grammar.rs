//! Named rule collections and the library of importable grammars.

use std::fmt;

use indexmap::IndexMap;

use crate::rule::{Rule, RuleKind};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar value must be [imports, rules], got {0}")]
    Shape(&'static str),
    #[error("import `{alias}` must map to a dotted path, got {found}")]
    Import { alias: String, found: &'static str },
    #[error("rule `{name}` must be a rule, got {found}")]
    NotARule { name: String, found: &'static str },
}

/// A set of named rules plus the grammars it imports.
///
/// Rules are named on insertion so that diagnostics and compiled routines
/// can refer to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    imports: IndexMap<String, String>,
    rules: IndexMap<String, Rule>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the grammar at dotted `path` callable as `alias.rule`.
    pub fn import(&mut self, alias: impl Into<String>, path: impl Into<String>) -> &mut Self {
        self.imports.insert(alias.into(), path.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: impl Into<Rule>) -> &mut Self {
        let name = name.into();
        let rule = rule.into();
        let rule = if rule.name() == Some(name.as_str()) {
            rule
        } else {
            rule.named(name.clone())
        };
        self.rules.insert(name, rule);
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rules(&self) -> &IndexMap<String, Rule> {
        &self.rules
    }

    pub fn imports(&self) -> &IndexMap<String, String> {
        &self.imports
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Build a grammar from the `[imports, rules]` value a grammar file
    /// parses to.
    pub fn from_value(value: Value) -> Result<Self, GrammarError> {
        let parts = match value {
            Value::List(parts) => parts,
            other => return Err(GrammarError::Shape(other.type_name())),
        };
        let [imports, rules]: [Value; 2] = parts
            .try_into()
            .map_err(|_| GrammarError::Shape("a list of the wrong length"))?;

        let mut grammar = Grammar::new();
        match imports {
            Value::Map(map) => {
                for (alias, path) in map {
                    match path {
                        Value::Str(path) => {
                            grammar.import(alias, path);
                        }
                        other => {
                            return Err(GrammarError::Import {
                                alias,
                                found: other.type_name(),
                            });
                        }
                    }
                }
            }
            other => return Err(GrammarError::Shape(other.type_name())),
        }
        match rules {
            Value::Map(map) => {
                for (name, rule) in map {
                    match rule {
                        Value::Rule(rule) => {
                            grammar.insert(name, rule);
                        }
                        other => {
                            return Err(GrammarError::NotARule {
                                name,
                                found: other.type_name(),
                            });
                        }
                    }
                }
            }
            other => return Err(GrammarError::Shape(other.type_name())),
        }
        Ok(grammar)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (alias, path) in &self.imports {
            writeln!(f, "import {path} as {alias}")?;
        }
        for (name, rule) in &self.rules {
            match rule.kind() {
                RuleKind::Params { rule, names } => {
                    let inner = match rule.name() {
                        Some(inner) => inner.to_string(),
                        None => rule.body(),
                    };
                    writeln!(f, "{name}({}) = {inner}", names.join(" "))?;
                }
                _ => writeln!(f, "{name} = {}", rule.body())?,
            }
        }
        Ok(())
    }
}

/// Grammars addressable by dotted path, for `import` resolution.
#[derive(Debug, Clone, Default)]
pub struct Library {
    grammars: IndexMap<String, Grammar>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, grammar: Grammar) -> &mut Self {
        self.grammars.insert(path.into(), grammar);
        self
    }

    pub fn with(mut self, path: impl Into<String>, grammar: Grammar) -> Self {
        self.insert(path, grammar);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Grammar> {
        self.grammars.get(path)
    }

    pub(crate) fn get_key_value(&self, path: &str) -> Option<(&str, &Grammar)> {
        self.grammars
            .get_key_value(path)
            .map(|(path, grammar)| (path.as_str(), grammar))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.grammars.keys().map(String::as_str)
    }
}
