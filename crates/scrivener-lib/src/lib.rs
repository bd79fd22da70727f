//! Scrivener: PEG grammars with an interpreter and a compiled backend.
//!
//! Grammars are written in the grammar-definition language (or built from
//! [`Rule`] constructors), snapped into a [`Parser`] and either interpreted
//! directly or compiled into a [`Module`] that the VM runs. Both backends
//! produce the same values, positions, context effects and errors.
//!
//! # Example
//!
//! ```
//! use scrivener_lib::{Value, compile, load_grammar};
//!
//! let text = "word = <alphanum+>\npair = word:k \"=\" word:v -> [k, v]\n";
//! let parser = load_grammar(text, "pair").expect("grammar loads");
//! let compiled = compile(&parser).expect("grammar compiles");
//!
//! let expected = Value::List(vec![Value::str("key"), Value::str("value")]);
//! assert_eq!(parser.parse("key=value").unwrap(), expected);
//! assert_eq!(compiled.parse("key=value").unwrap(), expected);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod backend;

pub use backend::{Backend, CompiledParser};

pub use scrivener_bytecode::{Module, ModuleError, VerifyError};
pub use scrivener_compiler::CompileError;
pub use scrivener_core::{Colors, Stream};
pub use scrivener_grammar::engine::Verbosity;
pub use scrivener_grammar::{
    Grammar, GrammarError, Library, Limits, Outcome, ParseError, Parser, ParserContext,
    RenderOptions, Rule, SnapError, Value, bootstrap, render_parse_error,
};

/// Errors raised while loading, compiling or running a grammar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Grammar text failed to parse, convert or snap.
    #[error(transparent)]
    Grammar(#[from] bootstrap::LoadError),

    #[error(transparent)]
    Snap(#[from] SnapError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Module source failed to lex, checksum or verify.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// A module's regexes, expressions or constants failed to load.
    #[error(transparent)]
    Program(#[from] scrivener_vm::LoadError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse grammar-definition text and snap it with `main` as entry rule.
pub fn load_grammar(text: &str, main: &str) -> Result<Parser> {
    Ok(bootstrap::load(text, main)?)
}

/// Like [`load_grammar`], resolving `import` lines through `library`.
pub fn load_grammar_with_library(text: &str, main: &str, library: &Library) -> Result<Parser> {
    Ok(bootstrap::load_with_library(text, main, library)?)
}

/// Compile a snapped parser into a runnable program.
pub fn compile(parser: &Parser) -> Result<CompiledParser> {
    let module = scrivener_compiler::compile(parser)?;
    CompiledParser::new(&module).map(|compiled| compiled.limits(parser.get_limits()))
}

/// Load a program from module source as written by [`CompiledParser::to_source`].
pub fn load_module(source: &str) -> Result<CompiledParser> {
    let module = Module::from_source(source)?;
    CompiledParser::new(&module)
}

#[cfg(test)]
mod backend_tests;
#[cfg(test)]
mod bootstrap_tests;
#[cfg(test)]
mod lib_tests;
