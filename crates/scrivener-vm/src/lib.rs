//! Runtime VM for executing compiled scrivener modules.
//!
//! A [`Program`] is a loaded [`Module`](scrivener_bytecode::Module) with its
//! regexes compiled and its expressions and constants parsed. Each parse
//! runs a fresh [`VM`] over one stream with an explicit frame stack.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod engine;

pub use engine::{
    Frame, FrameStack, LoadError, NoopTracer, PrintTracer, Program, Status, Tracer, VM,
    VMBuilder, Verbosity,
};
