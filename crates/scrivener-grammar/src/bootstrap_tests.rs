use indoc::indoc;

use crate::bootstrap::{self, LoadError};
use crate::engine::ParseError;
use crate::expr::EvalError;
use crate::grammar::Library;
use crate::rule::RuleError;
use crate::value::Value;

const PAIRS: &str = indoc! {r#"
    # comma-separated key/value pairs
    word = <alphanum+>
    sp = [ ]*
    pair = word:k sp "=" sp word:v -> [k, v]
    pairs = pair:first (sp "," sp pair)*:rest
        -> [first] + rest
"#};

fn strs(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::str(*s)).collect())
}

#[test]
fn bootstrap_parser_builds() {
    let parser = bootstrap::parser();
    assert_eq!(parser.main_name(), bootstrap::MAIN);
    assert!(parser.namespace().contains_key("expr"));
}

#[test]
fn rules_keep_declaration_order() {
    let grammar = bootstrap::parse_grammar(PAIRS).unwrap();
    let names: Vec<&str> = grammar.rules().keys().map(String::as_str).collect();
    assert_eq!(names, ["word", "sp", "pair", "pairs"]);
}

#[test]
fn loaded_grammar_parses() {
    let parser = bootstrap::load(PAIRS, "pairs").unwrap();
    assert_eq!(
        parser.parse("a=1, b = 2").unwrap(),
        Value::List(vec![strs(&["a", "1"]), strs(&["b", "2"])])
    );
}

#[test]
fn repetition_counts() {
    let text = indoc! {r#"
        split = <any{2}>:a <any{1,}>:b -> [a, b]
        hex = <any{0x3}>
    "#};
    let parser = bootstrap::load(text, "split").unwrap();
    assert_eq!(parser.parse("abcd").unwrap(), strs(&["ab", "cd"]));
    assert_eq!(parser.parse_rule("hex", "xyz").unwrap(), Value::str("xyz"));
}

#[test]
fn string_escapes() {
    let text = indoc! {r#"
        nl = "\n" -> 'newline'
        letter = '\x41' -> 'letter'
        either = nl | letter
    "#};
    let parser = bootstrap::load(text, "either").unwrap();
    assert_eq!(parser.parse("\n").unwrap(), Value::str("newline"));
    assert_eq!(parser.parse_rule("letter", "A").unwrap(), Value::str("letter"));
}

#[test]
fn lookarounds_and_predicates() {
    let text = indoc! {r#"
        word = <(~" " any)+>:w ?(len(w) > 1) ~~" "
        tail = "ab" ^"b" -> 'ok'
    "#};
    let parser = bootstrap::load(text, "word").unwrap();
    assert_eq!(parser.parse("ab cd"), Ok(Value::Empty));
    assert!(matches!(parser.parse("a cd"), Err(ParseError::NoMatch { .. })));
    assert_eq!(parser.parse_rule("tail", "ab").unwrap(), Value::str("ok"));
}

#[test]
fn mixed_text() {
    let text = indoc! {r#"
        bracketed = "[" @("]"):t "]" -> ''.join(t)
        marked = @(streamend, <"*" alphanum+ "*">)
    "#};
    let parser = bootstrap::load(text, "bracketed").unwrap();
    assert_eq!(parser.parse("[a b]").unwrap(), Value::str("a b"));
    assert_eq!(
        parser.parse_rule("marked", "x *y* z").unwrap(),
        strs(&["x ", "*y*", " z"])
    );
}

#[test]
fn parameters_are_bound_per_call() {
    let text = indoc! {r#"
        item(sep) = <alphanum+>:x ?(sep == ',') -> x
        main = item(',')
        other = item(';')
    "#};
    let parser = bootstrap::load(text, "main").unwrap();
    assert_eq!(parser.parse("abc").unwrap(), Value::str("abc"));
    assert!(parser.parse_rule("other", "abc").is_err());
}

#[test]
fn imports_resolve_through_library() {
    let common = bootstrap::parse_grammar("word = <alphanum+>\n").unwrap();
    let library = Library::new().with("common.words", common);
    let text = indoc! {r#"
        import common.words as w
        main = w.word:x "!" -> x
    "#};
    let parser = bootstrap::load_with_library(text, "main", &library).unwrap();
    assert_eq!(parser.parse("hey!").unwrap(), Value::str("hey"));
}

#[test]
fn unterminated_string_hits_wall() {
    let err = bootstrap::parse_grammar("x = \"abc\n").unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse(ParseError::Wall { ref wall, .. }) if wall == "dq"
    ));
}

#[test]
fn missing_expression_hits_rule_wall() {
    let err = bootstrap::parse_grammar("x = \n").unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse(ParseError::Wall { ref wall, row: 1, .. }) if wall == "rule"
    ));
}

#[test]
fn zero_repeat_count_is_rejected() {
    let err = bootstrap::parse_grammar("x = \"a\"{0}\n").unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse(ParseError::Action {
            error: EvalError::Rule(RuleError::ZeroRepeat),
            ..
        })
    ));
    assert!(err.to_string().contains("`{0}`"), "{err}");

    let err = bootstrap::parse_grammar("x = any{0,0}\n").unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse(ParseError::Action {
            error: EvalError::Rule(RuleError::ZeroRepeat),
            ..
        })
    ));
    assert!(bootstrap::parse_grammar("x = any{0,1}\n").is_ok());
}

#[test]
fn undefined_rule_fails_to_snap() {
    let err = bootstrap::load("main = nothing\n", "main").unwrap_err();
    assert!(matches!(err, LoadError::Snap(_)));
}
