use indoc::indoc;

use crate::{
    Error, Library, Limits, ModuleError, ParseError, Parser, ParserContext, Stream, Value, bootstrap,
    compile, load_grammar, load_grammar_with_library, load_module,
};

/// Parse every input with the interpreter, the compiled program and the
/// program reloaded from its module source, and require identical results.
fn agree(parser: &Parser, inputs: &[&str]) {
    let compiled = compile(parser).unwrap();
    let reloaded = load_module(&compiled.to_source()).unwrap();
    for input in inputs {
        let expected = parser.parse(input);
        assert_eq!(compiled.parse(input), expected, "vm on {input:?}");
        assert_eq!(reloaded.parse(input), expected, "reloaded vm on {input:?}");
    }
}

fn agree_text(text: &str, main: &str, inputs: &[&str]) {
    agree(&load_grammar(text, main).unwrap(), inputs);
}

fn strs(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::str(*s)).collect())
}

const PAIRS: &str = indoc! {r#"
    word = <alphanum+>
    sp = [ ]*
    pair = word:k sp "=" sp word:v -> [k, v]
    pairs = pair:first (sp "," sp pair)*:rest
        -> [first] + rest
"#};

#[test]
fn compiled_pairs_match_interpreter() {
    let parser = load_grammar(PAIRS, "pairs").unwrap();
    let compiled = compile(&parser).unwrap();
    assert_eq!(
        compiled.parse("a=1, b = 2").unwrap(),
        Value::List(vec![strs(&["a", "1"]), strs(&["b", "2"])])
    );
    agree(&parser, &["a=1", "a=1,b=2,c=3", "a=", "=1", "", "a=1,"]);
}

#[test]
fn choices_and_repetition() {
    let text = indoc! {r#"
        split = <any{2}>:a <any{1,}>:b -> [a, b]
        digits = <[0123456789]{2,3}>
        pick = ("ab" -> 1) | ("a" -> 2) | (any -> 3)
        main = (digits | pick)+
    "#};
    agree_text(text, "main", &["12ab", "1234", "a", "ab5", "", "99999"]);
    agree_text(text, "split", &["abcd", "ab", "a"]);
}

#[test]
fn lookarounds_and_predicates() {
    let text = indoc! {r#"
        word = <(~" " any)+>:w ?(len(w) > 1) ~~" "
        tail = "ab" ^"b" -> 'ok'
        main = word | tail
    "#};
    agree_text(text, "main", &["ab cd", "a cd", "ab", "abc", " "]);
}

#[test]
fn mixed_text() {
    let text = indoc! {r#"
        bracketed = "[" @("]"):t "]" -> ''.join(t)
        marked = @(streamend, <"*" alphanum+ "*">)
    "#};
    agree_text(text, "bracketed", &["[a b]", "[]", "[a", "a]"]);
    agree_text(text, "marked", &["x *y* z", "", "**", "*a* *b*"]);
}

#[test]
fn walls_fail_identically() {
    let text = indoc! {r#"
        call = "(" !!call alphanum+ ")" -> 'ok'
    "#};
    let parser = load_grammar(text, "call").unwrap();
    assert!(matches!(parser.parse("(x"), Err(ParseError::Wall { .. })));
    agree(&parser, &["(x)", "(x", "(", "x"]);
}

#[test]
fn parameters_and_context() {
    let text = indoc! {r#"
        item(sep) = <alphanum+>:x ?(sep == ',') -> x
        main = item(',')
        other = item(';')
    "#};
    let parser = load_grammar(text, "main").unwrap();
    agree(&parser, &["abc", "", "a,b"]);

    let compiled = compile(&parser).unwrap();
    assert!(compiled.parse_rule("other", "abc").is_err());
    assert_eq!(
        compiled.parse_rule("other", "abc"),
        parser.parse_rule("other", "abc")
    );
}

#[test]
fn recursion_through_named_rules() {
    let text = indoc! {r#"
        nest = ("(" nest:inner ")" -> [inner]) | "x"
    "#};
    let parser = load_grammar(text, "nest").unwrap();
    assert_eq!(
        parser.parse("((x))").unwrap(),
        Value::List(vec![Value::List(vec![Value::str("x")])])
    );
    agree(&parser, &["x", "(x)", "((x))", "((x)", "()"]);
}

const NEST: &str = "nest = (\"(\" nest:inner \")\" -> [inner]) | \"x\"\n";

fn nested(depth: usize) -> String {
    format!("{}x{}", "(".repeat(depth), ")".repeat(depth))
}

#[test]
fn recursion_limit_agrees_at_the_boundary() {
    for limit in [4, 64, 300] {
        let parser = load_grammar(NEST, "nest")
            .unwrap()
            .limits(Limits::new().recursion_limit(limit));
        let depth = limit as usize;
        // `depth - 1` parentheses enter `nest` exactly `limit` times.
        assert!(parser.parse(&nested(depth - 1)).is_ok());
        assert_eq!(
            parser.parse(&nested(depth)),
            Err(ParseError::RecursionLimitExceeded { limit })
        );
        let compiled = compile(&parser).unwrap();
        let reloaded = load_module(&compiled.to_source())
            .unwrap()
            .limits(parser.get_limits());
        for text in [nested(depth - 2), nested(depth - 1), nested(depth), nested(depth + 5)] {
            let expected = parser.parse(&text);
            assert_eq!(compiled.parse(&text), expected, "vm at limit {limit}");
            assert_eq!(reloaded.parse(&text), expected, "reloaded vm at limit {limit}");
        }
    }
}

#[test]
fn default_limit_agrees_on_a_small_stack() {
    let outcomes = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(|| {
            let parser = load_grammar(NEST, "nest").unwrap();
            let compiled = compile(&parser).unwrap();
            [600, 1023, 1024]
                .map(|depth| {
                    let text = nested(depth);
                    let expected = parser.parse(&text);
                    let agreed = compiled.parse(&text) == expected;
                    (expected.is_ok(), agreed)
                })
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(outcomes, [(true, true), (true, true), (false, true)]);
}

#[test]
fn block_break_follows_context_indent() {
    let text = indoc! {r#"
        at2 = !(2):indent <alphanum+> blockbreak -> 'brk'
        at0 = <alphanum+> blockbreak -> 'brk'
        sum = !(1):indent !(1):bwidth <alphanum+> blockbreak -> 'brk'
    "#};
    let parser = load_grammar(text, "at2").unwrap();
    assert!(matches!(parser.parse("ab\n  cd"), Err(ParseError::NoMatch { .. })));
    assert_eq!(parser.parse("ab\ncd"), Ok(Value::str("brk")));
    assert_eq!(parser.parse_rule("at0", "ab\n  cd"), Ok(Value::str("brk")));
    assert!(parser.parse_rule("sum", "ab\n  cd").is_err());
    assert_eq!(parser.parse_rule("sum", "ab\n cd"), Ok(Value::str("brk")));

    let inputs = ["ab\n  cd", "ab\ncd", "ab\n cd", "ab", "ab\n\ncd", "ab\n"];
    for main in ["at2", "at0", "sum"] {
        agree(&load_grammar(text, main).unwrap(), &inputs);
    }
}

#[test]
fn oversized_repetition_fails_in_both_backends() {
    let text = indoc! {r#"
        s = <[0123456789]+>:d -> 'ab' * int(d)
        n = <[0123456789]+>:d -> ['a', 'b'] * int(d)
    "#};
    for main in ["s", "n"] {
        let parser = load_grammar(text, main).unwrap();
        assert!(matches!(
            parser.parse("9223372036854775807"),
            Err(ParseError::Action { .. })
        ));
        assert_eq!(parser.parse("2").unwrap().to_string().matches('a').count(), 2);
        agree(&parser, &["9223372036854775807", "3", "0"]);
    }
}

#[test]
fn parse_in_leaves_same_context_and_position() {
    let text = indoc! {r#"
        word = <alphanum+>:w
    "#};
    let parser = load_grammar(text, "word").unwrap();
    let compiled = compile(&parser).unwrap();
    let stream = Stream::new("  abc def");

    let mut interpreted_ctx = ParserContext::new();
    let mut compiled_ctx = ParserContext::new();
    let interpreted = parser.parse_in(&stream, 2, &mut interpreted_ctx);
    let vm = compiled.parse_in(&stream, 2, &mut compiled_ctx);
    assert_eq!(vm, Ok((Value::str("abc"), 5)));
    assert_eq!(vm, interpreted);
    assert_eq!(compiled_ctx.get("w"), Some(&Value::str("abc")));
    assert_eq!(compiled_ctx.visible(), interpreted_ctx.visible());
}

#[test]
fn imported_rules_compile() {
    let common = bootstrap::parse_grammar("word = <alphanum+>\n").unwrap();
    let library = Library::new().with("common.words", common);
    let text = indoc! {r#"
        import common.words as w
        main = w.word:x "!" -> x
    "#};
    let parser = load_grammar_with_library(text, "main", &library).unwrap();
    assert_eq!(parser.parse("hey!").unwrap(), Value::str("hey"));
    agree(&parser, &["hey!", "hey", "!"]);
}

#[test]
fn limits_carry_over_to_compiled_parser() {
    let parser = load_grammar("x = \"x\"\n", "x").unwrap();
    let compiled = compile(&parser).unwrap();
    assert_eq!(
        compiled.get_limits().get_recursion_limit(),
        parser.get_limits().get_recursion_limit()
    );
}

#[test]
fn undefined_rule_is_a_grammar_error() {
    let err = load_grammar("main = nothing\n", "main").unwrap_err();
    assert!(matches!(err, Error::Grammar(bootstrap::LoadError::Snap(_))));
}

#[test]
fn corrupt_module_source_is_rejected() {
    let parser = load_grammar(PAIRS, "pairs").unwrap();
    let source = compile(&parser).unwrap().to_source();
    let corrupted = source.replacen("ret", "pop_pos", 1);
    assert!(matches!(
        load_module(&corrupted),
        Err(Error::Module(ModuleError::ChecksumMismatch { .. }))
    ));
    assert!(matches!(load_module("not a module"), Err(Error::Module(_))));
}

#[test]
fn parse_errors_convert() {
    fn run(text: &str) -> crate::Result<Value> {
        let parser = load_grammar(PAIRS, "pairs")?;
        Ok(compile(&parser)?.parse(text)?)
    }
    assert_eq!(run("a=1").unwrap(), Value::List(vec![strs(&["a", "1"])]));
    assert!(matches!(run("=").unwrap_err(), Error::Parse(ParseError::NoMatch { .. })));
}
