//! Loading and execution of compiled modules.

mod error;
mod frame;
mod program;
mod trace;
mod vm;

#[cfg(test)]
mod program_tests;
#[cfg(test)]
mod vm_tests;

pub use error::LoadError;
pub use frame::{Frame, FrameStack};
pub use program::Program;
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
pub use vm::{Status, VM, VMBuilder};
