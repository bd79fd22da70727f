//! Tests for CLI dispatch logic.
//!
//! - exec and trace accept each other's flags
//! - hidden flags stay out of `--help`
//! - `--module` shifts the positional to the document

use std::path::PathBuf;

use super::*;
use crate::cli::commands::{check_command, compile_command, exec_command, trace_command};
use crate::commands::exec::ExecArgs;
use crate::commands::trace::TraceArgs;
use scrivener_lib::Verbosity;

#[test]
fn check_extracts_grammar_flags() {
    let m = check_command()
        .try_get_matches_from([
            "check", "doc.peg", "--main", "doc", "-I", "lib", "-I", "vendor", "--color", "never",
        ])
        .unwrap();
    let params = CheckParams::from_matches(&m);
    assert_eq!(params.grammar_path, Some(PathBuf::from("doc.peg")));
    assert_eq!(params.main.as_deref(), Some("doc"));
    assert_eq!(params.include, [PathBuf::from("lib"), PathBuf::from("vendor")]);
    assert_eq!(params.color, ColorChoice::Never);
}

#[test]
fn check_rejects_document() {
    let result = check_command().try_get_matches_from(["check", "doc.peg", "page.txt"]);
    assert!(result.is_err());
}

#[test]
fn compile_takes_output() {
    let m = compile_command()
        .try_get_matches_from(["compile", "doc.peg", "-o", "doc.scm"])
        .unwrap();
    let params = CompileParams::from_matches(&m);
    assert_eq!(params.output, Some(PathBuf::from("doc.scm")));
    assert_eq!(params.grammar.grammar_path, Some(PathBuf::from("doc.peg")));
}

#[test]
fn exec_accepts_trace_flags() {
    let result = exec_command().try_get_matches_from(["exec", "doc.peg", "page.txt", "-vv", "--no-result"]);
    assert!(result.is_ok(), "exec should accept trace flags: {:?}", result.err());
}

#[test]
fn trace_accepts_exec_flags() {
    let result = trace_command().try_get_matches_from(["trace", "doc.peg", "page.txt", "--compact"]);
    assert!(result.is_ok(), "trace should accept exec flags: {:?}", result.err());
}

#[test]
fn exec_positionals() {
    let m = exec_command()
        .try_get_matches_from(["exec", "doc.peg", "page.txt", "--compiled", "--compact"])
        .unwrap();
    let args: ExecArgs = ExecParams::from_matches(&m).into();
    assert_eq!(args.program.grammar.path, Some(PathBuf::from("doc.peg")));
    assert_eq!(args.doc.path, Some(PathBuf::from("page.txt")));
    assert!(args.program.compiled);
    assert!(args.compact);
    assert!(args.program.module.is_none());
}

#[test]
fn module_shifts_positional_to_document() {
    let m = exec_command()
        .try_get_matches_from(["exec", "--module", "doc.scm", "page.txt"])
        .unwrap();
    let args: ExecArgs = ExecParams::from_matches(&m).into();
    assert_eq!(args.program.module, Some(PathBuf::from("doc.scm")));
    assert_eq!(args.program.grammar.path, None);
    assert_eq!(args.doc.path, Some(PathBuf::from("page.txt")));
}

#[test]
fn inline_source_leaves_positional_as_grammar() {
    let m = exec_command()
        .try_get_matches_from(["exec", "doc.peg", "-s", "a=1"])
        .unwrap();
    let args: ExecArgs = ExecParams::from_matches(&m).into();
    assert_eq!(args.program.grammar.path, Some(PathBuf::from("doc.peg")));
    assert_eq!(args.doc.text.as_deref(), Some("a=1"));
    assert_eq!(args.doc.path, None);
}

#[test]
fn trace_verbosity_levels() {
    let levels = [
        (vec!["trace", "g.peg", "d.txt"], Verbosity::Default),
        (vec!["trace", "g.peg", "d.txt", "-v"], Verbosity::Verbose),
        (vec!["trace", "g.peg", "d.txt", "-vv"], Verbosity::VeryVerbose),
        (vec!["trace", "g.peg", "d.txt", "-vvv"], Verbosity::VeryVerbose),
    ];
    for (argv, expected) in levels {
        let m = trace_command().try_get_matches_from(argv).unwrap();
        let args: TraceArgs = TraceParams::from_matches(&m).into();
        assert_eq!(args.verbosity, expected);
    }
}

#[test]
fn recursion_limit_is_parsed() {
    let m = trace_command()
        .try_get_matches_from(["trace", "g.peg", "d.txt", "--recursion-limit", "64"])
        .unwrap();
    let args: TraceArgs = TraceParams::from_matches(&m).into();
    assert_eq!(args.program.recursion_limit, Some(64));
}

#[test]
fn color_defaults_to_auto() {
    let m = check_command().try_get_matches_from(["check", "g.peg"]).unwrap();
    assert_eq!(CheckParams::from_matches(&m).color, ColorChoice::Auto);
}

#[test]
fn exec_help_hides_trace_flags() {
    let help = exec_command().render_help().to_string();
    assert!(help.contains("--compiled"));
    assert!(!help.contains("--no-result"));
    assert!(!help.contains("Verbosity level"));
}

#[test]
fn trace_help_hides_exec_flags() {
    let help = trace_command().render_help().to_string();
    assert!(help.contains("--no-result"));
    assert!(!help.contains("--compact"));
}

#[test]
fn cli_is_consistent() {
    build_cli().debug_assert();
}
