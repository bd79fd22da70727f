use std::fs;
use std::path::{Path, PathBuf};

use indoc::indoc;
use tempfile::TempDir;

use super::compile::compile_source;
use super::exec::to_json;
use super::loader::*;
use scrivener_lib::{ParseError, Value};

const PAIRS: &str = indoc! {r#"
    pairs = pair:first ("," pair)*:rest -> [first] + rest
    pair = word:k "=" word:v -> [k, v]
    word = <alphanum+>
"#};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, text).unwrap();
    path
}

fn grammar(path: &Path) -> GrammarInput {
    GrammarInput {
        path: Some(path.to_path_buf()),
        main: None,
        include: Vec::new(),
    }
}

fn program(grammar: GrammarInput) -> ProgramInput {
    ProgramInput {
        grammar,
        module: None,
        compiled: false,
        recursion_limit: None,
    }
}

fn doc(text: &str) -> DocInput {
    DocInput {
        path: None,
        text: Some(text.to_string()),
    }
}

#[test]
fn first_rule_is_main_by_default() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "pairs.peg", PAIRS);

    let parser = load_parser(&grammar(&path)).unwrap();
    assert_eq!(parser.main_name(), "pairs");

    let mut input = grammar(&path);
    input.main = Some("word".to_string());
    assert_eq!(load_parser(&input).unwrap().main_name(), "word");
}

#[test]
fn imports_resolve_next_to_the_grammar() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common/words.peg", "word = <alphanum+>\n");
    let path = write(
        dir.path(),
        "main.peg",
        "import common.words as w\nmain = w.word:x \"!\" -> x\n",
    );

    let parser = load_parser(&grammar(&path)).unwrap();
    assert_eq!(parser.parse("hey!").unwrap(), Value::str("hey"));
}

#[test]
fn imports_resolve_through_include_dirs() {
    let grammars = TempDir::new().unwrap();
    let vendor = TempDir::new().unwrap();
    write(vendor.path(), "text/num.peg", "import text.digits as d\nnum = <d.digit+>\n");
    write(vendor.path(), "text/digits.peg", "digit = [0123456789]\n");
    let path = write(
        grammars.path(),
        "main.peg",
        "import text.num as n\nmain = n.num:x \";\" -> x\n",
    );

    let mut input = grammar(&path);
    assert!(matches!(
        load_parser(&input),
        Err(InputError::MissingImport { ref import, .. }) if import == "text.num"
    ));

    input.include = vec![vendor.path().to_path_buf()];
    let parser = load_parser(&input).unwrap();
    assert_eq!(parser.parse("42;").unwrap(), Value::str("42"));
}

#[test]
fn syntax_errors_render_with_the_path() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "bad.peg", "x = \"abc\n");

    let err = load_parser(&grammar(&path)).unwrap_err();
    assert!(matches!(
        err,
        InputError::Syntax { error: ParseError::Wall { .. }, .. }
    ));
    let rendered = err.render(false);
    assert!(rendered.contains("bad.peg"), "{rendered}");
}

#[test]
fn unknown_main_rule_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "pairs.peg", PAIRS);
    let mut input = grammar(&path);
    input.main = Some("nothing".to_string());

    let err = load_parser(&input).unwrap_err();
    assert!(matches!(err, InputError::Scrivener(_)));
    assert!(err.render(false).starts_with("error: "));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = load_parser(&grammar(&dir.path().join("none.peg"))).unwrap_err();
    assert!(matches!(err, InputError::Read { .. }));
}

#[test]
fn compiled_module_runs_like_the_grammar() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "pairs.peg", PAIRS);
    let source = compile_source(&grammar(&path)).unwrap();
    let module = write(dir.path(), "pairs.scm", &source);

    let interpreted = load_backend(&program(grammar(&path))).unwrap();
    let mut compiled_input = program(grammar(&path));
    compiled_input.compiled = true;
    let compiled = load_backend(&compiled_input).unwrap();
    let mut module_input = program(GrammarInput {
        path: None,
        main: None,
        include: Vec::new(),
    });
    module_input.module = Some(module);
    let loaded = load_backend(&module_input).unwrap();

    assert_eq!(interpreted.kind_name(), "interpreter");
    assert_eq!(compiled.kind_name(), "vm");
    assert_eq!(loaded.main_name(), "pairs");
    for text in ["a=1,b=2", "a=1,", "="] {
        let expected = interpreted.parse(text);
        assert_eq!(compiled.parse(text), expected, "{text:?}");
        assert_eq!(loaded.parse(text), expected, "{text:?}");
    }
}

#[test]
fn recursion_limit_applies_to_both_backends() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "nest.peg", "nest = (\"(\" nest \")\") | \"x\"\n");
    for compiled in [false, true] {
        let mut input = program(grammar(&path));
        input.compiled = compiled;
        input.recursion_limit = Some(16);
        let backend = load_backend(&input).unwrap();
        assert!(backend.parse("(x)").is_ok());
        let deep = format!("{}x{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(
            backend.parse(&deep),
            Err(ParseError::RecursionLimitExceeded { limit: 16 })
        ));
    }
}

#[test]
fn document_from_text_or_file() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "page.txt", "a=1");
    let input = program(grammar(Path::new("g.peg")));

    assert_eq!(load_doc(&doc("x=y"), &input).unwrap(), "x=y");
    let from_file = DocInput {
        path: Some(path),
        text: None,
    };
    assert_eq!(load_doc(&from_file, &input).unwrap(), "a=1");
    let neither = DocInput {
        path: None,
        text: None,
    };
    assert!(matches!(load_doc(&neither, &input), Err(InputError::Missing(_))));
}

#[test]
fn grammar_and_document_cannot_share_stdin() {
    let input = program(grammar(Path::new("-")));
    let stdin_doc = DocInput {
        path: Some(PathBuf::from("-")),
        text: None,
    };
    assert!(matches!(
        load_doc(&stdin_doc, &input),
        Err(InputError::DoubleStdin("grammar"))
    ));
}

#[test]
fn search_dirs_start_with_the_grammar_directory() {
    let dirs = search_dirs(Path::new("grammars/main.peg"), &[PathBuf::from("lib")]);
    assert_eq!(dirs, [PathBuf::from("grammars"), PathBuf::from("lib")]);
    assert_eq!(search_dirs(Path::new("main.peg"), &[]), [PathBuf::from(".")]);
    assert_eq!(search_dirs(Path::new("-"), &[]), [PathBuf::from(".")]);
}

#[test]
fn json_output() {
    let value = Value::List(vec![Value::str("a"), Value::Int(1), Value::None]);
    assert_eq!(to_json(&value, true).unwrap(), r#"["a",1,null]"#);
    insta::assert_snapshot!(to_json(&value, false).unwrap(), @r#"
    [
      "a",
      1,
      null
    ]
    "#);
}
