//! Reading grammars, modules and documents from files, stdin or flags.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use scrivener_lib::{
    Backend, Grammar, Library, Limits, ParseError, Parser, RenderOptions, Stream, bootstrap,
    load_module, render_parse_error,
};

/// File extension of grammar files found through imports.
pub const GRAMMAR_EXT: &str = "peg";

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Missing(&'static str),

    #[error("{0} and the document cannot both come from stdin")]
    DoubleStdin(&'static str),

    /// Grammar text did not parse; rendered against the text.
    #[error("{error}")]
    Syntax {
        path: String,
        text: String,
        error: ParseError,
    },

    #[error("import '{import}' not found (searched {searched})")]
    MissingImport { import: String, searched: String },

    #[error(transparent)]
    Scrivener(#[from] scrivener_lib::Error),
}

impl InputError {
    /// Render for the terminal, with a source excerpt for syntax errors.
    pub fn render(&self, color: bool) -> String {
        match self {
            InputError::Syntax { path, text, error } => {
                let options = if color {
                    RenderOptions::colored()
                } else {
                    RenderOptions::plain()
                };
                render_parse_error(&Stream::new(text), error, Some(path), options)
            }
            other => format!("error: {other}"),
        }
    }
}

pub struct GrammarInput {
    pub path: Option<PathBuf>,
    pub main: Option<String>,
    pub include: Vec<PathBuf>,
}

pub struct ProgramInput {
    pub grammar: GrammarInput,
    pub module: Option<PathBuf>,
    pub compiled: bool,
    pub recursion_limit: Option<u32>,
}

pub struct DocInput {
    pub path: Option<PathBuf>,
    pub text: Option<String>,
}

/// Read `path`, with `-` meaning stdin.
pub fn read_input(path: &Path) -> Result<String, InputError> {
    let read_error = |source| InputError::Read {
        path: path.display().to_string(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(read_error)?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(read_error)
}

/// Parse a grammar file without snapping it.
pub fn parse_grammar_file(path: &Path) -> Result<Grammar, InputError> {
    let text = read_input(path)?;
    parse_grammar_text(&path.display().to_string(), text)
}

fn parse_grammar_text(path: &str, text: String) -> Result<Grammar, InputError> {
    match bootstrap::parse_grammar(&text) {
        Ok(grammar) => Ok(grammar),
        Err(bootstrap::LoadError::Parse(error)) => Err(InputError::Syntax {
            path: path.to_string(),
            text,
            error,
        }),
        Err(other) => Err(scrivener_lib::Error::from(other).into()),
    }
}

/// Directories searched for imports of the grammar at `path`.
pub fn search_dirs(path: &Path, include: &[PathBuf]) -> Vec<PathBuf> {
    let own = match path.parent() {
        _ if path.as_os_str() == "-" => PathBuf::from("."),
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::iter::once(own).chain(include.iter().cloned()).collect()
}

/// `a.b.c` resolves to `<dir>/a/b/c.peg` in the first directory that has it.
pub fn resolve_import(import: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let relative: PathBuf = import.split('.').collect();
    let relative = relative.with_extension(GRAMMAR_EXT);
    dirs.iter().map(|dir| dir.join(&relative)).find(|p| p.is_file())
}

/// Load every grammar reachable through `grammar`'s imports.
pub fn collect_library(grammar: &Grammar, dirs: &[PathBuf]) -> Result<Library, InputError> {
    let mut library = Library::new();
    let mut pending: Vec<String> = grammar.imports().values().cloned().collect();
    while let Some(import) = pending.pop() {
        if library.get(&import).is_some() {
            continue;
        }
        let path = resolve_import(&import, dirs).ok_or_else(|| InputError::MissingImport {
            import: import.clone(),
            searched: dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        let imported = parse_grammar_file(&path)?;
        pending.extend(imported.imports().values().cloned());
        library.insert(import, imported);
    }
    Ok(library)
}

/// Load and snap a grammar; without `--main` the first rule is the main rule.
pub fn load_parser(input: &GrammarInput) -> Result<Parser, InputError> {
    let path = input
        .path
        .as_deref()
        .ok_or(InputError::Missing("grammar is required"))?;
    let grammar = parse_grammar_file(path)?;
    let main = match &input.main {
        Some(name) => name.clone(),
        None => grammar
            .rules()
            .keys()
            .next()
            .cloned()
            .ok_or(InputError::Missing("grammar defines no rules"))?,
    };
    let library = collect_library(&grammar, &search_dirs(path, &input.include))?;
    let parser =
        Parser::with_library(grammar, &main, &library).map_err(scrivener_lib::Error::from)?;
    Ok(parser)
}

/// Build the backend exec and trace run on.
pub fn load_backend(input: &ProgramInput) -> Result<Backend, InputError> {
    let mut backend = match &input.module {
        Some(path) => {
            let compiled = load_module(&read_input(path)?)?;
            Backend::Compiled(compiled)
        }
        None => {
            let parser = load_parser(&input.grammar)?;
            let backend = Backend::Interpreted(parser);
            if input.compiled {
                backend.into_compiled()?
            } else {
                backend
            }
        }
    };
    if let Some(limit) = input.recursion_limit {
        let limits = Limits::default().recursion_limit(limit);
        backend = match backend {
            Backend::Interpreted(parser) => Backend::Interpreted(parser.limits(limits)),
            Backend::Compiled(compiled) => Backend::Compiled(compiled.limits(limits)),
        };
    }
    Ok(backend)
}

/// Read the document from `--source` text or a path.
pub fn load_doc(doc: &DocInput, program: &ProgramInput) -> Result<String, InputError> {
    if let Some(text) = &doc.text {
        return Ok(text.clone());
    }
    let path = doc
        .path
        .as_deref()
        .ok_or(InputError::Missing("document is required: give a path or -s/--source"))?;
    if path.as_os_str() == "-" {
        let stdin_program = match (&program.module, &program.grammar.path) {
            (Some(module), _) if module.as_os_str() == "-" => Some("module"),
            (None, Some(grammar)) if grammar.as_os_str() == "-" => Some("grammar"),
            _ => None,
        };
        if let Some(what) = stdin_program {
            return Err(InputError::DoubleStdin(what));
        }
    }
    read_input(path)
}

/// Print `error` and exit with status 1.
pub fn fail(error: InputError, color: bool) -> ! {
    eprintln!("{}", error.render(color));
    std::process::exit(1);
}
