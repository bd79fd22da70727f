//! Trace rule evaluation for debugging.

use scrivener_lib::{Colors, Verbosity};

use super::loader::{DocInput, ProgramInput, fail, load_backend, load_doc};

pub struct TraceArgs {
    pub program: ProgramInput,
    pub doc: DocInput,
    pub verbosity: Verbosity,
    pub no_result: bool,
    pub color: bool,
}

pub fn run(args: TraceArgs) {
    let backend = load_backend(&args.program).unwrap_or_else(|e| fail(e, args.color));
    let text = load_doc(&args.doc, &args.program).unwrap_or_else(|e| fail(e, args.color));
    let colors = Colors::new(args.color);

    let (result, lines) = backend.trace(&text, args.verbosity, colors);
    for line in &lines {
        println!("{line}");
    }

    let value = match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}error{}: {}", colors.red, colors.reset, e);
            std::process::exit(1);
        }
    };

    if args.no_result {
        return;
    }

    println!("{}---{}", colors.dim, colors.reset);
    println!("{}", value.format(true, colors));
}
