use std::fs;
use std::path::PathBuf;

use super::loader::{GrammarInput, InputError, fail, load_parser};

pub struct CompileArgs {
    pub grammar: GrammarInput,
    pub output: Option<PathBuf>,
    pub color: bool,
}

pub fn run(args: CompileArgs) {
    let source = compile_source(&args.grammar).unwrap_or_else(|e| fail(e, args.color));

    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &source) {
                eprintln!("error: failed to write '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => print!("{source}"),
    }
}

/// Module source for the grammar.
pub fn compile_source(grammar: &GrammarInput) -> Result<String, InputError> {
    let parser = load_parser(grammar)?;
    let compiled = scrivener_lib::compile(&parser)?;
    Ok(compiled.to_source())
}
