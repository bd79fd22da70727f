#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compiled module format for scrivener grammars.
//!
//! A [`Module`] holds deduplicated operand tables, a list of routines of
//! [`Instruction`]s and the entry points of the grammar's rules. Modules are
//! verified when assembled and round-trip through a checksummed text form
//! ([`Module::to_source`] / [`Module::from_source`]).

mod ids;
mod instructions;
mod module;
mod source;
mod verify;

pub use ids::{Addr, CharSetId, ConstId, ExprId, RegexId, RoutineId, StrId};
pub use instructions::Instruction;
pub use module::{Constant, Module, Routine, Tables};
pub use source::{ModuleError, VERSION};
pub use verify::VerifyError;

#[cfg(test)]
mod source_tests;
