use scrivener_core::{Colors, Stream};
use scrivener_grammar::{Grammar, Limits, Outcome, ParseError, Parser, ParserContext, Rule, Value};

use super::{PrintTracer, Program, Verbosity};

fn load(parser: &Parser) -> Program {
    let module = scrivener_compiler::compile(parser).unwrap();
    Program::load(&module).unwrap()
}

fn single(rule: Rule) -> Parser {
    Parser::new(Grammar::new().with("main", rule), "main").unwrap()
}

/// Run every text through both backends and require identical outcomes,
/// errors and context effects.
fn agree(parser: &Parser, texts: &[&str]) {
    let program = load(parser);
    for text in texts {
        let stream = Stream::new(text);
        let mut expected_ctx = ParserContext::new();
        let expected = parser.call(parser.main_name(), &stream, 0, &mut expected_ctx);
        let mut actual_ctx = ParserContext::new();
        let actual = program.call(program.main_name(), &stream, 0, &mut actual_ctx);

        assert_eq!(actual, expected, "outcome for {text:?}");
        assert_eq!(actual_ctx.visible(), expected_ctx.visible(), "context for {text:?}");
        assert_eq!(actual_ctx.depth(), expected_ctx.depth(), "scopes for {text:?}");
    }
}

fn word() -> Rule {
    Rule::take(Rule::plus(Rule::alphanum()))
}

#[test]
fn take_yields_the_consumed_text() {
    let program = load(&single(word()));

    assert_eq!(program.parse("abc"), Ok(Value::str("abc")));
}

#[test]
fn sequence_yields_its_last_value() {
    let grammar = Grammar::new()
        .with("word", word())
        .with("pair", Rule::bind("a", Rule::call("word")) + "=" + Rule::call("word"));
    let program = load(&Parser::new(grammar, "pair").unwrap());

    assert_eq!(program.parse("key=value"), Ok(Value::str("value")));
    assert_eq!(program.parse_rule("word", "key"), Ok(Value::str("key")));
}

#[test]
fn repetition_collects_values() {
    let program = load(&single(Rule::star(Rule::take(Rule::alphanum()))));

    assert_eq!(
        program.parse("ab"),
        Ok(Value::List(vec![Value::str("a"), Value::str("b")]))
    );
}

#[test]
fn top_level_miss_reports_no_match() {
    let program = load(&single(Rule::literal("a")));

    assert!(matches!(program.parse("b"), Err(ParseError::NoMatch { .. })));
}

#[test]
fn unknown_entry_is_an_error() {
    let program = load(&single(Rule::literal("a")));

    assert_eq!(
        program.parse_rule("missing", "a"),
        Err(ParseError::UnknownRule("missing".into()))
    );
}

#[test]
fn choice_and_sequence_agree() {
    let rule = Rule::bind("k", word()) + Rule::opt(Rule::literal("=") + Rule::bind("v", word()))
        | Rule::literal("#") + Rule::take(Rule::star(Rule::any()));
    agree(&single(rule), &["", "key", "key=value", "key=", "#note", "=x"]);
}

#[test]
fn lookarounds_agree() {
    let rule = Rule::plus(Rule::not(Rule::literal("c")) + Rule::take(Rule::alphanum()))
        + Rule::peek("c")
        + Rule::look_behind("b")
        + Rule::any();
    agree(&single(rule), &["abc", "ac", "c", "ab", "abbc"]);
}

#[test]
fn bounded_repetition_agrees() {
    let rule = Rule::repeat(Rule::take(Rule::alphanum()), 2, Some(3)).unwrap() + Rule::take(Rule::star(Rule::any()));
    agree(&single(rule), &["a", "ab", "abc", "abcd", "ab-", ""]);
}

#[test]
fn zero_width_repetition_agrees() {
    let rule = Rule::star(Rule::opt("x"));
    agree(&single(rule), &["", "xx", "xy", "y"]);
}

#[test]
fn interleaved_text_agrees() {
    let tag = Rule::take("{" + Rule::plus(Rule::alphanum()) + "}");
    let rule = Rule::mixed(Rule::literal("}"), Some(tag));
    agree(&single(rule), &["ab{cd}ef}", "{x}{y}", "plain", "}", "", "a{b"]);

    let stop = Rule::mixed(Rule::literal("\n"), Some(Rule::fail_if(Rule::literal("#"))));
    agree(&single(stop), &["abc\nd", "ab#c\n", "abc"]);

    let plain = Rule::mixed(Rule::literal(";"), None);
    agree(&single(plain), &["ab;c", "abc"]);
}

#[test]
fn walls_agree() {
    let rule = Rule::literal("a") + Rule::wall("header") + "b" + "c";
    agree(&single(rule), &["abc", "ac", "abd", "x"]);
}

#[test]
fn actions_and_context_agree() {
    let rule = Rule::put("mode", Value::str("strict"))
        + Rule::bind("n", word())
        + Rule::if_expr("len(n) > 2").unwrap()
        + Rule::do_expr("n + mode").unwrap();
    agree(&single(rule), &["abc", "ab", ""]);

    let code = Rule::take(Rule::alphanum()) + Rule::do_code("i").unwrap();
    agree(&single(code), &["a", ""]);
}

#[test]
fn extents_agree() {
    let ok = Rule::extent(word() + Rule::do_expr("{\"k\": 1}").unwrap());
    agree(&single(ok), &["abc", ""]);

    let not_a_map = Rule::extent(word());
    agree(&single(not_a_map), &["abc"]);
}

#[test]
fn parameterized_calls_agree() {
    let item = Rule::params(word() + Rule::get("suffix", Value::None), ["suffix"]);
    let grammar = Grammar::new()
        .with("main", Rule::call_with("item", ["\"x\""]).unwrap() + Rule::get("suffix", Value::str("none")))
        .with("item", item);
    agree(&Parser::new(grammar, "main").unwrap(), &["abc", ""]);
}

#[test]
fn recursion_agrees() {
    let grammar = Grammar::new().with(
        "nest",
        Rule::take("(" + Rule::opt(Rule::call("nest")) + ")"),
    );
    agree(&Parser::new(grammar, "nest").unwrap(), &["()", "(())", "((())", "(()))", ""]);
}

#[test]
fn recursion_limit_is_enforced() {
    let grammar = Grammar::new().with("nest", "(" + Rule::opt(Rule::call("nest")) + ")");
    let program = load(&Parser::new(grammar, "nest").unwrap())
        .limits(Limits::new().recursion_limit(4));

    let stream = Stream::new("((((((()))))))");
    let mut ctx = ParserContext::new();
    let outcome = program.call("nest", &stream, 0, &mut ctx);

    assert_eq!(outcome, Err(ParseError::RecursionLimitExceeded { limit: 4 }));
    assert_eq!(ctx.depth(), 0);
    assert_eq!(program.parse("(())"), Ok(Value::str(")")));
}

#[test]
fn parse_at_an_offset() {
    let program = load(&single(word()));
    let stream = Stream::new("12 abc");
    let mut ctx = ParserContext::new();

    assert_eq!(
        program.call("main", &stream, 3, &mut ctx),
        Ok(Outcome::Match(Value::str("abc"), 6))
    );
}

#[test]
fn print_tracer_logs_named_routines() {
    let grammar = Grammar::new()
        .with("word", word())
        .with("pair", Rule::call("word") + "=" + Rule::call("word"));
    let program = load(&Parser::new(grammar, "pair").unwrap());
    let mut tracer = PrintTracer::new(Verbosity::Default, Colors::OFF);

    assert_eq!(program.trace("a=b", &mut tracer), Ok(Value::str("b")));
    let lines = tracer.lines();
    assert!(lines[0].starts_with("pair @"));
    assert_eq!(lines.iter().filter(|l| l.trim_start().starts_with("word @")).count(), 2);
    assert!(lines.last().unwrap().starts_with("✓ pair -> 3"));
}

#[test]
fn very_verbose_tracer_logs_instructions() {
    let program = load(&single(Rule::literal("a")));
    let mut tracer = PrintTracer::new(Verbosity::VeryVerbose, Colors::OFF);
    program.trace("a", &mut tracer).unwrap();

    assert!(tracer.lines().iter().any(|l| l.trim_start() == "p0@0 literal s0"));
}
