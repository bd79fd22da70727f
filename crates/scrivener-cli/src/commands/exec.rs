use scrivener_lib::{RenderOptions, Stream, Value, render_parse_error};

use super::loader::{DocInput, ProgramInput, fail, load_backend, load_doc};

pub struct ExecArgs {
    pub program: ProgramInput,
    pub doc: DocInput,
    pub compact: bool,
    pub color: bool,
}

pub fn run(args: ExecArgs) {
    let backend = load_backend(&args.program).unwrap_or_else(|e| fail(e, args.color));
    let text = load_doc(&args.doc, &args.program).unwrap_or_else(|e| fail(e, args.color));

    let value = match backend.parse(&text) {
        Ok(value) => value,
        Err(e) => {
            let options = if args.color {
                RenderOptions::colored()
            } else {
                RenderOptions::plain()
            };
            let path = args.doc.path.as_ref().map(|p| p.display().to_string());
            eprintln!(
                "{}",
                render_parse_error(&Stream::new(&text), &e, path.as_deref(), options)
            );
            std::process::exit(1);
        }
    };

    match to_json(&value, args.compact) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: JSON serialization failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn to_json(value: &Value, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}
