//! Scrivener compiler: lowers snapped grammars to bytecode modules.
//!
//! - `compile` - routine planning and code emission
//! - `emit` - operand tables and label layout
//!
//! The emitted module is verified before it is returned, so every module
//! this crate produces is safe to load.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod compile;
pub mod emit;
mod error;

pub use error::{CompileError, CompileResult};

use scrivener_bytecode::Module;
use scrivener_grammar::Parser;

/// Compile a snapped grammar into a verified module.
pub fn compile(parser: &Parser) -> CompileResult<Module> {
    compile::Compiler::compile(parser)
}
