//! Table building and label layout for emitted code.

mod layout;
mod tables;

#[cfg(test)]
mod layout_tests;

pub use layout::{Item, Label, layout};
pub use tables::TableBuilder;
