//! Command builders for the CLI.
//!
//! exec and trace share their runtime flags; each accepts the other's
//! flags with the irrelevant ones hidden from `--help`.

use clap::Command;

use super::args::*;

/// Grammar input flags shared by every command.
fn with_grammar_args(cmd: Command) -> Command {
    cmd.arg(grammar_path_arg())
        .arg(main_arg())
        .arg(include_arg())
        .arg(color_arg())
}

/// Document input and backend flags shared by exec and trace.
fn with_run_args(cmd: Command) -> Command {
    cmd.arg(doc_path_arg())
        .arg(doc_text_arg())
        .arg(module_arg())
        .arg(compiled_arg())
        .arg(recursion_limit_arg())
}

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("scrivener")
        .about("PEG grammars with an interpreter and a compiled VM")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(check_command())
        .subcommand(dump_command())
        .subcommand(compile_command())
        .subcommand(exec_command())
        .subcommand(trace_command())
}

/// Validate a grammar.
pub fn check_command() -> Command {
    let cmd = Command::new("check")
        .about("Validate a grammar")
        .override_usage(
            "\
  scrivener check <GRAMMAR>
  scrivener check <GRAMMAR> --main <NAME>",
        )
        .after_help(
            r#"EXAMPLES:
  scrivener check markup.peg              # parse and snap, silent on success
  scrivener check markup.peg --main doc   # check a specific main rule
  scrivener check markup.peg -I lib/      # resolve imports from lib/"#,
        );
    with_grammar_args(cmd)
}

/// Show the snapped rule graph.
pub fn dump_command() -> Command {
    let cmd = Command::new("dump")
        .about("Show the snapped rule graph")
        .after_help(
            r#"EXAMPLES:
  scrivener dump markup.peg               # nodes with first chars and fixed lengths"#,
        );
    with_grammar_args(cmd)
}

/// Compile a grammar to module source.
pub fn compile_command() -> Command {
    let cmd = Command::new("compile")
        .about("Compile a grammar to module source")
        .override_usage(
            "\
  scrivener compile <GRAMMAR> [-o <FILE>]",
        )
        .after_help(
            r#"EXAMPLES:
  scrivener compile markup.peg               # print module source
  scrivener compile markup.peg -o markup.scm # write to a file"#,
        )
        .arg(output_file_arg());
    with_grammar_args(cmd)
}

/// Parse a document and print the value as JSON.
pub fn exec_command() -> Command {
    let cmd = Command::new("exec")
        .about("Parse a document and print the value as JSON")
        .override_usage(
            "\
  scrivener exec <GRAMMAR> <DOC>
  scrivener exec <GRAMMAR> -s <TEXT>
  scrivener exec --module <FILE> <DOC>",
        )
        .after_help(
            r#"EXAMPLES:
  scrivener exec markup.peg page.txt              # interpret
  scrivener exec markup.peg page.txt --compiled   # compile and run on the VM
  scrivener exec --module markup.scm page.txt     # run a compiled module
  scrivener exec markup.peg -s 'a=1' --compact    # inline document"#,
        )
        .arg(compact_arg());

    // Hidden trace flags
    with_run_args(with_grammar_args(cmd))
        .arg(verbose_arg().hide(true))
        .arg(no_result_arg().hide(true))
}

/// Trace the rules entered while parsing a document.
pub fn trace_command() -> Command {
    let cmd = Command::new("trace")
        .about("Trace rule evaluation while parsing a document")
        .override_usage(
            "\
  scrivener trace <GRAMMAR> <DOC> [-v|-vv]
  scrivener trace --module <FILE> <DOC> [-v|-vv]",
        )
        .after_help(
            r#"EXAMPLES:
  scrivener trace markup.peg page.txt             # named rules only
  scrivener trace markup.peg page.txt -v          # every node
  scrivener trace markup.peg page.txt --compiled -vv
                                                  # routines and instructions"#,
        )
        .arg(verbose_arg())
        .arg(no_result_arg());

    // Hidden exec flags
    with_run_args(with_grammar_args(cmd)).arg(compact_arg().hide(true))
}
