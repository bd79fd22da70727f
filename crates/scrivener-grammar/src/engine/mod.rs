//! Evaluation of snapped rule graphs.
//!
//! The [`Interpreter`] walks the graph recursively. The terminal and action
//! helpers in [`terminals`] and [`actions`] are public so that the compiled
//! backend evaluates leaves through exactly the same code.

pub mod actions;
mod error;
mod interpreter;
pub mod terminals;
mod trace;


pub use error::{ParseError, ParseResult, SNIPPET_WIDTH};
pub use interpreter::{Interpreter, Limits};
pub use trace::{NoopTracer, PrintTracer, PrintTracerBuilder, Tracer, Verbosity};
