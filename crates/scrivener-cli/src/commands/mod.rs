pub mod check;
pub mod compile;
pub mod dump;
pub mod exec;
pub mod loader;
pub mod trace;

#[cfg(test)]
mod loader_tests;
