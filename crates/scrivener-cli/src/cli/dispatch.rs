//! Dispatch logic: extract params from ArgMatches and convert to command args.
//!
//! - `*Params` structs are populated from clap, ignoring hidden flags
//! - `Into<*Args>` impls bridge dispatch and the command handlers
//! - with `--module`, a single positional is the document, not a grammar

use std::path::PathBuf;

use clap::ArgMatches;

use super::ColorChoice;
use crate::commands::check::CheckArgs;
use crate::commands::compile::CompileArgs;
use crate::commands::dump::DumpArgs;
use crate::commands::exec::ExecArgs;
use crate::commands::loader::{DocInput, GrammarInput, ProgramInput};
use crate::commands::trace::TraceArgs;
use scrivener_lib::Verbosity;

pub struct CheckParams {
    pub grammar_path: Option<PathBuf>,
    pub main: Option<String>,
    pub include: Vec<PathBuf>,
    pub color: ColorChoice,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            grammar_path: m.get_one::<PathBuf>("grammar_path").cloned(),
            main: m.get_one::<String>("main").cloned(),
            include: parse_include(m),
            color: parse_color(m),
        }
    }

    fn grammar(&self) -> GrammarInput {
        GrammarInput {
            path: self.grammar_path.clone(),
            main: self.main.clone(),
            include: self.include.clone(),
        }
    }
}

impl From<CheckParams> for CheckArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            grammar: p.grammar(),
            color: p.color.should_colorize(),
        }
    }
}

/// dump takes exactly the grammar flags check does.
pub type DumpParams = CheckParams;

impl From<CheckParams> for DumpArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            grammar: p.grammar(),
            color: p.color.should_colorize(),
        }
    }
}

pub struct CompileParams {
    pub grammar: CheckParams,
    pub output: Option<PathBuf>,
}

impl CompileParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            grammar: CheckParams::from_matches(m),
            output: m.get_one::<PathBuf>("output").cloned(),
        }
    }
}

impl From<CompileParams> for CompileArgs {
    fn from(p: CompileParams) -> Self {
        Self {
            grammar: p.grammar.grammar(),
            output: p.output,
            color: p.grammar.color.should_colorize(),
        }
    }
}

/// Inputs shared by exec and trace.
pub struct RunParams {
    pub grammar_path: Option<PathBuf>,
    pub module: Option<PathBuf>,
    pub doc_path: Option<PathBuf>,
    pub doc_text: Option<String>,
    pub main: Option<String>,
    pub include: Vec<PathBuf>,
    pub compiled: bool,
    pub recursion_limit: Option<u32>,
    pub color: ColorChoice,
}

impl RunParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        let module = m.get_one::<PathBuf>("module").cloned();
        let (grammar_path, doc_path) = shift_positional_to_doc(
            module.is_some(),
            m.get_one::<PathBuf>("grammar_path").cloned(),
            m.get_one::<PathBuf>("doc_path").cloned(),
        );
        Self {
            grammar_path,
            module,
            doc_path,
            doc_text: m.get_one::<String>("doc_text").cloned(),
            main: m.get_one::<String>("main").cloned(),
            include: parse_include(m),
            compiled: m.get_flag("compiled"),
            recursion_limit: m.get_one::<u32>("recursion_limit").copied(),
            color: parse_color(m),
        }
    }

    fn program(&self) -> ProgramInput {
        ProgramInput {
            grammar: GrammarInput {
                path: self.grammar_path.clone(),
                main: self.main.clone(),
                include: self.include.clone(),
            },
            module: self.module.clone(),
            compiled: self.compiled,
            recursion_limit: self.recursion_limit,
        }
    }

    fn doc(&self) -> DocInput {
        DocInput {
            path: self.doc_path.clone(),
            text: self.doc_text.clone(),
        }
    }
}

pub struct ExecParams {
    pub run: RunParams,
    pub compact: bool,
    // verbose and no_result are parsed but not extracted
}

impl ExecParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            run: RunParams::from_matches(m),
            compact: m.get_flag("compact"),
        }
    }
}

impl From<ExecParams> for ExecArgs {
    fn from(p: ExecParams) -> Self {
        Self {
            program: p.run.program(),
            doc: p.run.doc(),
            compact: p.compact,
            color: p.run.color.should_colorize(),
        }
    }
}

pub struct TraceParams {
    pub run: RunParams,
    pub verbose: u8,
    pub no_result: bool,
}

impl TraceParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            run: RunParams::from_matches(m),
            verbose: m.get_count("verbose"),
            no_result: m.get_flag("no_result"),
        }
    }
}

impl From<TraceParams> for TraceArgs {
    fn from(p: TraceParams) -> Self {
        let verbosity = match p.verbose {
            0 => Verbosity::Default,
            1 => Verbosity::Verbose,
            _ => Verbosity::VeryVerbose,
        };
        Self {
            program: p.run.program(),
            doc: p.run.doc(),
            verbosity,
            no_result: p.no_result,
            color: p.run.color.should_colorize(),
        }
    }
}

/// With a module in place of a grammar, the first positional is the document.
fn shift_positional_to_doc(
    has_module: bool,
    grammar_path: Option<PathBuf>,
    doc_path: Option<PathBuf>,
) -> (Option<PathBuf>, Option<PathBuf>) {
    if has_module && doc_path.is_none() {
        return (None, grammar_path);
    }
    (grammar_path, doc_path)
}

fn parse_include(m: &ArgMatches) -> Vec<PathBuf> {
    m.get_many::<PathBuf>("include")
        .map(|dirs| dirs.cloned().collect())
        .unwrap_or_default()
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
