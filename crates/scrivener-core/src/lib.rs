#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Shared building blocks for the scrivener PEG toolkit.
//!
//! - [`Stream`]: conditioned input text addressed by character index
//! - [`CharSet`]: ordered character sets used for first-character analysis
//! - [`scan`]: hand-written scanners shared by the interpreter and the VM
//! - [`escape`]: quoting and unquoting of string literals
//! - [`Colors`], [`Interner`]: presentation and table-building helpers

mod charset;
mod colors;
pub mod escape;
mod interner;
pub mod scan;
mod stream;

pub use charset::CharSet;
pub use colors::Colors;
pub use interner::{Interner, Symbol};
pub use stream::{END_OF_TEXT, Stream, condition};

#[cfg(test)]
mod interner_tests;
#[cfg(test)]
mod stream_tests;
#[cfg(test)]
mod scan_tests;
