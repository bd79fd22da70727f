use indexmap::IndexMap;

use super::{EvalError, eval_str, parse};
use crate::rule::Rule;
use crate::value::Value;

fn env() -> IndexMap<String, Value> {
    let mut env = IndexMap::new();
    env.insert("x".to_string(), Value::Int(7));
    env.insert("s".to_string(), Value::str("Hello"));
    env.insert(
        "items".to_string(),
        Value::List(vec![Value::str("a"), Value::str("b"), Value::str("c")]),
    );
    env
}

fn run(source: &str) -> String {
    match eval_str(source, &env()) {
        Ok(value) => value.to_string(),
        Err(e) => format!("error: {e}"),
    }
}

#[test]
fn arithmetic_follows_floor_semantics() {
    assert_eq!(run("1 + 2 * 3"), "7");
    assert_eq!(run("(1 + 2) * 3"), "9");
    assert_eq!(run("-7 // 2"), "-4");
    assert_eq!(run("-7 / 2"), "-4");
    assert_eq!(run("-7 % 3"), "2");
    assert_eq!(run("7 % -3"), "-2");
    assert_eq!(run("-x"), "-7");
    assert_eq!(run("0x1F + 1"), "32");
    assert_eq!(run("1 // 0"), "error: division by zero");
}

#[test]
fn strings_and_lists() {
    assert_eq!(run("'ab' + \"cd\""), r#""abcd""#);
    assert_eq!(run("'ab' * 2"), r#""abab""#);
    assert_eq!(run("s[0]"), r#""H""#);
    assert_eq!(run("s[-1]"), r#""o""#);
    assert_eq!(run("s[1:3]"), r#""el""#);
    assert_eq!(run("s[:-2]"), r#""Hel""#);
    assert_eq!(run("items[1:]"), r#"["b", "c"]"#);
    assert_eq!(run("items[5]"), "error: index 5 out of range for length 3");
    assert_eq!(run("(1, 2) + [3]"), "[1, 2, 3]");
    assert_eq!(run("'a' 'b'"), r#""ab""#);
}

#[test]
fn oversized_repetition_is_an_error() {
    assert_eq!(run("'ab' * 9223372036854775807"), "error: integer overflow or oversized result");
    assert_eq!(run("items * 9223372036854775807"), "error: integer overflow or oversized result");
    assert_eq!(run("4611686018427387904 * 'abcd'"), "error: integer overflow or oversized result");
    assert_eq!(run("'' * 9223372036854775807"), r#""""#);
    assert_eq!(run("items * -3"), "[]");
    assert_eq!(run("[0] * 3"), "[0, 0, 0]");
}

#[test]
fn boolean_operators_return_operands() {
    assert_eq!(run("0 or 'x'"), r#""x""#);
    assert_eq!(run("'' and 1"), r#""""#);
    assert_eq!(run("not []"), "True");
    assert_eq!(run("1 if items else 2"), "1");
    assert_eq!(run("1 if [] else 2"), "2");
    assert_eq!(run("'b' in items"), "True");
    assert_eq!(run("'z' not in items"), "True");
    assert_eq!(run("'ell' in s"), "True");
    assert_eq!(run("True == 1"), "True");
    assert_eq!(run("[1, 2] < [1, 3]"), "True");
}

#[test]
fn builtins() {
    assert_eq!(run("int('42')"), "42");
    assert_eq!(run("int('ff', 16)"), "255");
    assert_eq!(run("int('0x10', 16)"), "16");
    assert_eq!(run("int(' -12 ')"), "-12");
    assert_eq!(run("str(12) + str(None)"), r#""12None""#);
    assert_eq!(run("len(s) + len(items)"), "8");
    assert_eq!(run("chr(65) + chr(0x263a)"), "\"A\u{263a}\"");
    assert_eq!(run("ord('a')"), "97");
    assert_eq!(run("bool(0)"), "False");
    assert_eq!(run("list('ab')"), r#"["a", "b"]"#);
    assert_eq!(run("dict([('a', 1)], b=2)"), r#"{"a": 1, "b": 2}"#);
    assert_eq!(run("join(items, sep='-')"), r#""a-b-c""#);
    assert_eq!(run("int('zz')"), r#"error: invalid literal for int() with base 10: "zz""#);
}

#[test]
fn methods() {
    assert_eq!(run("''.join(items)"), r#""abc""#);
    assert_eq!(run("', '.join(items)"), r#""a, b, c""#);
    assert_eq!(run("'  x '.strip()"), r#""x""#);
    assert_eq!(run("s.lower() + s.upper()"), r#""helloHELLO""#);
    assert_eq!(run("s.startswith('He') and s.endswith('lo')"), "True");
    assert_eq!(run("'a b  c'.split()"), r#"["a", "b", "c"]"#);
    assert_eq!(run("'a,b'.split(',')"), r#"["a", "b"]"#);
    assert_eq!(run("s.replace('l', 'L')"), r#""HeLLo""#);
    assert_eq!(run("{'k': 1}.get('k')"), "1");
    assert_eq!(run("{'k': 1}.get('q', 5)"), "5");
    assert_eq!(run("{'k': 1, 'j': 2}.keys()"), r#"["k", "j"]"#);
    assert_eq!(run("items.pop()"), "error: `list` has no method `pop`");
}

#[test]
fn splat_and_keyword_arguments() {
    assert_eq!(run("Seq(*items)"), r#"<"a" "b" "c">"#);
    assert_eq!(run("Repeat('a', 2, 3)"), r#"<"a"{2,3}>"#);
    assert_eq!(run("Repeat('a', min=1)"), r#"<"a"+>"#);
    assert_eq!(run("Get('n', default=3)"), "<Get(n, 3)>");
}

#[test]
fn rule_constructors() {
    let value = eval_str("Bind('n', Take(Plus(Among('0123456789'))))", &env()).unwrap();
    let expected = Rule::bind("n", Rule::take(Rule::plus(Rule::among("0123456789"))));
    assert_eq!(value, Value::Rule(expected));

    let value = eval_str("Or(String('a'), Not(Peek('b')), LineEnd)", &env()).unwrap();
    let expected = Rule::or([
        Rule::literal("a"),
        Rule::not(Rule::peek("b")),
        Rule::line_end(),
    ]);
    assert_eq!(value, Value::Rule(expected));

    let value = eval_str("Call('item', ['x + 1'])", &env()).unwrap();
    assert_eq!(value.to_string(), "<item(x + 1)>");

    let err = eval_str("Regex('(')", &env()).unwrap_err();
    assert!(err.to_string().starts_with("invalid regular expression /(/"));

    let err = eval_str("Call('item', ['x +'])", &env()).unwrap_err();
    assert!(err.to_string().starts_with("invalid expression `x +`"));
}

#[test]
fn undefined_names_are_errors() {
    assert_eq!(run("y + 1"), "error: name `y` is not defined");
    assert_eq!(run("frobnicate(1)"), "error: unknown function `frobnicate`");
    let err = eval_str("missing", &env()).unwrap_err();
    assert!(matches!(
        err,
        super::EvalStrError::Eval(EvalError::UndefinedVariable(ref n)) if n == "missing"
    ));
}

#[test]
fn parse_errors_carry_spans() {
    let err = parse("1 +").unwrap_err();
    insta::assert_snapshot!(err, @"expected expression, found end of expression at 3..3");

    let err = parse("(1, 2").unwrap_err();
    insta::assert_snapshot!(err, @"expected RParen, found end of expression at 5..5");

    let err = parse("a $ b").unwrap_err();
    insta::assert_snapshot!(err, @r#"unexpected character "$" at 2..3"#);

    let err = parse("1 2").unwrap_err();
    insta::assert_snapshot!(err, @"unexpected `2` after expression at 2..3");
}
