//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` so the same definition can be
//! reused across commands, hidden (via `.hide(true)`) where it does not apply.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Grammar file (positional, `-` for stdin).
pub fn grammar_path_arg() -> Arg {
    Arg::new("grammar_path")
        .value_name("GRAMMAR")
        .value_parser(value_parser!(PathBuf))
        .help("Grammar file (- for stdin)")
}

/// Document to parse (positional, `-` for stdin).
pub fn doc_path_arg() -> Arg {
    Arg::new("doc_path")
        .value_name("DOC")
        .value_parser(value_parser!(PathBuf))
        .help("Document to parse (- for stdin)")
}

/// Inline document text (-s/--source).
pub fn doc_text_arg() -> Arg {
    Arg::new("doc_text")
        .short('s')
        .long("source")
        .value_name("TEXT")
        .help("Inline document text")
}

/// Compiled module to run instead of a grammar (--module).
pub fn module_arg() -> Arg {
    Arg::new("module")
        .long("module")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Run a compiled module instead of a grammar")
}

/// Main rule name (--main).
pub fn main_arg() -> Arg {
    Arg::new("main")
        .long("main")
        .value_name("NAME")
        .help("Main rule (defaults to the first rule of the grammar)")
}

/// Directories searched for imported grammars (-I/--include).
pub fn include_arg() -> Arg {
    Arg::new("include")
        .short('I')
        .long("include")
        .value_name("DIR")
        .action(ArgAction::Append)
        .value_parser(value_parser!(PathBuf))
        .help("Search DIR for imported grammars (after the grammar's own directory)")
}

/// Run through the compiled backend (--compiled).
pub fn compiled_arg() -> Arg {
    Arg::new("compiled")
        .long("compiled")
        .action(ArgAction::SetTrue)
        .help("Compile the grammar and run it on the VM")
}

/// Output compact JSON (--compact).
pub fn compact_arg() -> Arg {
    Arg::new("compact")
        .long("compact")
        .action(ArgAction::SetTrue)
        .help("Output compact JSON")
}

/// Write output to file (-o/--output).
pub fn output_file_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Write output to file")
}

/// Verbosity level (-v, -vv).
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Verbosity level (-v for verbose, -vv for very verbose)")
}

/// Skip printing the parse value (--no-result).
pub fn no_result_arg() -> Arg {
    Arg::new("no_result")
        .long("no-result")
        .action(ArgAction::SetTrue)
        .help("Show the trace only")
}

/// Maximum nested rule evaluations (--recursion-limit).
pub fn recursion_limit_arg() -> Arg {
    Arg::new("recursion_limit")
        .long("recursion-limit")
        .value_name("N")
        .value_parser(value_parser!(u32))
        .help("Maximum depth of nested rule calls")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}
