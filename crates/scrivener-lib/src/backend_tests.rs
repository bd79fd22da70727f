use crate::{Backend, Colors, ParserContext, Stream, Value, Verbosity, load_grammar};

const TEXT: &str = "word = <alphanum+>\npair = word:k \"=\" word:v -> [k, v]\n";

fn backends() -> [Backend; 2] {
    let parser = load_grammar(TEXT, "pair").unwrap();
    let compiled = Backend::Interpreted(parser.clone()).into_compiled().unwrap();
    [Backend::Interpreted(parser), compiled]
}

#[test]
fn backends_are_interchangeable() {
    let [interpreted, compiled] = backends();
    assert_eq!(interpreted.kind_name(), "interpreter");
    assert_eq!(compiled.kind_name(), "vm");
    assert_eq!(compiled.main_name(), "pair");

    for text in ["a=b", "a=", "=b", "ab=cd"] {
        assert_eq!(compiled.parse(text), interpreted.parse(text), "{text:?}");
    }
    assert_eq!(
        compiled.parse_rule("word", "abc"),
        Ok(Value::str("abc"))
    );
    assert_eq!(
        compiled.parse_rule("missing", "abc"),
        interpreted.parse_rule("missing", "abc")
    );
}

#[test]
fn call_returns_raw_outcomes() {
    let [interpreted, compiled] = backends();
    let stream = Stream::new("x=y!");
    for backend in [&interpreted, &compiled] {
        let mut ctx = ParserContext::new();
        let outcome = backend.call("pair", &stream, 0, &mut ctx).unwrap();
        assert!(outcome.is_match(), "{}", backend.kind_name());
        let outcome = backend.call("pair", &stream, 3, &mut ctx).unwrap();
        assert!(outcome.is_miss(), "{}", backend.kind_name());
    }
}

#[test]
fn compiling_twice_keeps_the_program() {
    let [_, compiled] = backends();
    let again = compiled.into_compiled().unwrap();
    assert_eq!(again.kind_name(), "vm");
    assert_eq!(again.parse("a=b").unwrap(), Value::List(vec![Value::str("a"), Value::str("b")]));
}

#[test]
fn traces_name_the_main_rule() {
    for backend in backends() {
        let (result, lines) = backend.trace("a=b", Verbosity::Default, Colors::OFF);
        assert!(result.is_ok(), "{}", backend.kind_name());
        let first = lines.first().unwrap();
        let last = lines.last().unwrap();
        assert!(first.starts_with("pair @"), "{}: {first}", backend.kind_name());
        assert!(last.starts_with("✓ pair -> 3"), "{}: {last}", backend.kind_name());
        assert_eq!(
            lines.iter().filter(|l| l.trim_start().starts_with("word @")).count(),
            2,
            "{}",
            backend.kind_name()
        );
    }
}
