//! Grammar-to-module compilation.
//!
//! - `plan`: which nodes become routines and which are inlined
//! - `compiler`: per-rule-kind code emission over symbolic labels

mod compiler;
mod plan;

#[cfg(test)]
mod compile_tests;
#[cfg(test)]
mod plan_tests;

pub use compiler::Compiler;
pub use plan::{Plan, routine_name};
