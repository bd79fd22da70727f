use indoc::indoc;

use crate::{Grammar, ParseError, Parser, Value, bootstrap, compile, load_module};

const PAIRS: &str = indoc! {r#"
    import common.words as w
    # comma-separated key/value pairs
    word = <alphanum+>
    sp = [ ]*
    pair = word:k sp "=" sp word:v -> [k, v]
    pairs = pair:first (sp "," sp pair)*:rest
        -> [first] + rest
    hex = <any{0x3}> ^"z" ~~~"q"
    list(sep) = <alphanum+>:x ?(sep == ',') -> x
    brackets = "[" @("]", <"*" alphanum+ "*">):t "]" -> t
"#};

fn bootstrap_program() -> crate::CompiledParser {
    let compiled = compile(bootstrap::parser()).unwrap();
    load_module(&compiled.to_source()).unwrap()
}

#[test]
fn compiled_bootstrap_parses_grammars_identically() {
    let program = bootstrap_program();
    let expected = bootstrap::parser().parse(PAIRS).unwrap();
    assert_eq!(program.parse(PAIRS).unwrap(), expected);
}

#[test]
fn grammar_from_compiled_bootstrap_runs() {
    let program = bootstrap_program();
    let text = "word = <alphanum+>\npair = word:k \"=\" word:v -> [k, v]\n";
    let grammar = Grammar::from_value(program.parse(text).unwrap()).unwrap();
    let parser = Parser::new(grammar, "pair").unwrap();
    assert_eq!(
        parser.parse("key=value").unwrap(),
        Value::List(vec![Value::str("key"), Value::str("value")])
    );

    let second = compile(&parser).unwrap();
    assert_eq!(second.parse("key=value"), parser.parse("key=value"));
}

#[test]
fn compiled_bootstrap_reports_the_same_errors() {
    let program = bootstrap_program();
    for text in ["x = \"abc\n", "x = \n", "x = (a\n", "= a\n", "x = <a\n"] {
        let expected = bootstrap::parser().parse(text);
        assert!(expected.is_err(), "{text:?} should not parse");
        assert_eq!(program.parse(text), expected, "{text:?}");
    }
    assert!(matches!(
        program.parse("x = \"abc\n"),
        Err(ParseError::Wall { ref wall, .. }) if wall == "dq"
    ));
}

#[test]
fn compiled_bootstrap_parses_itself_stably() {
    let compiled = compile(bootstrap::parser()).unwrap();
    let source = compiled.to_source();
    let reloaded = load_module(&source).unwrap();
    assert_eq!(reloaded.module(), compiled.module());
    assert_eq!(reloaded.to_source(), source);
}
