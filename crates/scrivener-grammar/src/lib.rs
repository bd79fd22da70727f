#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Grammars for the scrivener PEG toolkit.
//!
//! Rules are built with [`Rule`] constructors (or parsed from grammar text
//! by [`bootstrap`]), collected into a [`Grammar`], and snapped into a
//! [`Parser`] that evaluates them directly.
//!
//! # Example
//!
//! ```
//! use scrivener_grammar::{Grammar, Parser, Rule, Value};
//!
//! let word = Rule::take(Rule::plus(Rule::alphanum()));
//! let grammar = Grammar::new()
//!     .with("word", word)
//!     .with("pair", Rule::bind("a", Rule::call("word")) + "=" + Rule::call("word"));
//! let parser = Parser::new(grammar, "pair").expect("grammar snaps");
//! assert_eq!(parser.parse("key=value").unwrap(), Value::str("value"));
//! ```

pub mod bootstrap;
mod context;
pub mod diagnostics;
pub mod engine;
pub mod expr;
mod grammar;
pub mod graph;
mod parser;
mod rule;
mod value;

pub use context::{Bindings, ParserContext};
pub use diagnostics::{RenderOptions, render_parse_error};
pub use engine::{Limits, ParseError, ParseResult};
pub use grammar::{Grammar, GrammarError, Library};
pub use graph::{NodeId, Op, RuleGraph, SnapError};
pub use parser::Parser;
pub use rule::{Action, Pattern, PatternMatch, Rule, RuleError, RuleKind};
pub use value::{Outcome, Value};

#[cfg(test)]
mod bootstrap_tests;
#[cfg(test)]
mod diagnostics_tests;
#[cfg(test)]
mod value_tests;
