use scrivener_core::{CharSet, Colors};

use super::{Op, RuleGraph, SnapError, snap};
use crate::grammar::{Grammar, Library};
use crate::rule::Rule;
use crate::value::Value;

fn snapped(grammar: &Grammar) -> RuleGraph {
    snap(grammar, &Library::new()).unwrap()
}

fn arith() -> Grammar {
    Grammar::new()
        .with("term", Rule::take(Rule::plus(Rule::among("0123456789"))))
        .with(
            "expr",
            (Rule::call("expr") + "+" + Rule::call("term")) | Rule::call("term"),
        )
}

#[test]
fn self_recursion_closes_into_a_cycle() {
    let graph = snapped(&arith());
    assert!(graph.ids().all(|id| !matches!(graph.op(id), Op::Call { .. })));

    let expr = graph.lookup("expr").unwrap();
    let Op::Or(alternatives) = graph.op(expr) else {
        panic!("expr is not an Or");
    };
    let Op::Seq(items) = graph.op(alternatives[0]) else {
        panic!("first alternative is not a Seq");
    };
    assert_eq!(items[0], expr);
    assert_eq!(items[2], graph.lookup("term").unwrap());
}

#[test]
fn shared_rules_snap_once() {
    let word = Rule::take(Rule::plus(Rule::alphanum()));
    let grammar = Grammar::new().with("pair", word.clone() + "=" + word);
    let graph = snapped(&grammar);
    let Op::Seq(items) = graph.op(graph.lookup("pair").unwrap()) else {
        panic!("pair is not a Seq");
    };
    assert_eq!(items[0], items[2]);
}

#[test]
fn aliases_resolve_to_their_target() {
    let grammar = Grammar::new()
        .with("a", Rule::call("b"))
        .with("b", Rule::literal("x"));
    let graph = snapped(&grammar);
    assert_eq!(graph.lookup("a"), graph.lookup("b"));
}

#[test]
fn alias_cycles_are_rejected() {
    let grammar = Grammar::new()
        .with("a", Rule::call("b"))
        .with("b", Rule::call("a"));
    assert!(matches!(
        snap(&grammar, &Library::new()),
        Err(SnapError::AliasCycle(_))
    ));
}

#[test]
fn undefined_names_are_rejected() {
    let grammar = Grammar::new().with("main", "a" + Rule::call("missing"));
    assert_eq!(
        snap(&grammar, &Library::new()).unwrap_err(),
        SnapError::UndefinedRule("missing".to_string())
    );
}

#[test]
fn builtin_names_resolve() {
    let grammar = Grammar::new().with("main", Rule::call("alphanum") + Rule::call("streamend"));
    let graph = snapped(&grammar);
    let Op::Seq(items) = graph.op(graph.lookup("main").unwrap()) else {
        panic!("main is not a Seq");
    };
    assert!(matches!(graph.op(items[0]), Op::AlphaNum));
    assert!(matches!(graph.op(items[1]), Op::StreamEnd));
}

#[test]
fn imports_resolve_through_the_library() {
    let common = Grammar::new().with("word", Rule::take(Rule::plus(Rule::alphanum())));
    let library = Library::new().with("common.text", common);

    let mut grammar = Grammar::new().with(
        "main",
        Rule::call2("t", "word", Vec::<&str>::new()).unwrap() + "!",
    );
    grammar.import("t", "common.text");
    let graph = snap(&grammar, &library).unwrap();

    let Op::Seq(items) = graph.op(graph.lookup("main").unwrap()) else {
        panic!("main is not a Seq");
    };
    assert_eq!(graph.node(items[0]).name(), Some("common.text.word"));

    let mut unknown = Grammar::new().with("main", Rule::call2("u", "word", Vec::<&str>::new()).unwrap());
    unknown.import("t", "common.text");
    assert_eq!(
        snap(&unknown, &library).unwrap_err(),
        SnapError::UnknownImport("u".to_string())
    );

    let mut missing = Grammar::new().with("main", Rule::call2("t", "word", Vec::<&str>::new()).unwrap());
    missing.import("t", "common.other");
    assert_eq!(
        snap(&missing, &library).unwrap_err(),
        SnapError::MissingGrammar("common.other".to_string())
    );
}

#[test]
fn calls_need_parameterized_targets() {
    let grammar = Grammar::new()
        .with("plain", Rule::literal("x"))
        .with("main", Rule::call_with("plain", ["1"]).unwrap());
    assert!(matches!(
        snap(&grammar, &Library::new()),
        Err(SnapError::NotParameterized { .. })
    ));
}

#[test]
fn fixed_lengths() {
    let grammar = Grammar::new()
        .with("lit", Rule::literal("abc"))
        .with("seq", "ab" + Rule::among("xy") + Rule::not("z"))
        .with("alt", Rule::literal("ab") | "cd")
        .with("uneven", Rule::literal("a") | "bc")
        .with("rep", Rule::repeat("ab", 2, Some(2)).unwrap())
        .with("star", Rule::star("a"));
    let graph = snapped(&grammar);
    let len = |name: &str| graph.fixed_length(graph.lookup(name).unwrap());
    assert_eq!(len("lit"), Some(3));
    assert_eq!(len("seq"), Some(3));
    assert_eq!(len("alt"), Some(2));
    assert_eq!(len("uneven"), None);
    assert_eq!(len("rep"), None);
    assert_eq!(len("star"), None);
}

#[test]
fn first_characters() {
    let grammar = Grammar::new()
        .with("alt", Rule::literal("ab") | Rule::among("xy"))
        .with("optional_head", Rule::opt("a") + "b")
        .with("star_head", Rule::star("a") + "b")
        .with("declared", Rule::first_chars("qr") + Rule::any())
        .with("open", Rule::any() | "a");
    let graph = snapped(&grammar);
    let firsts = |name: &str| graph.first_chars(graph.lookup(name).unwrap());
    assert_eq!(firsts("alt"), Some(CharSet::from("axy")));
    assert_eq!(firsts("optional_head"), None);
    assert_eq!(firsts("star_head"), None);
    assert_eq!(firsts("declared"), Some(CharSet::from("qr")));
    assert_eq!(firsts("open"), None);
}

#[test]
fn or_tables_keep_declaration_order() {
    let grammar = Grammar::new().with(
        "main",
        Rule::or([
            Rule::literal("a"),
            Rule::value(Value::None),
            Rule::among("ab"),
            Rule::literal("c"),
        ]),
    );
    let graph = snapped(&grammar);
    let table = graph.or_table(graph.lookup("main").unwrap());
    assert_eq!(table.candidates(Some('a')), &[0, 1, 2]);
    assert_eq!(table.candidates(Some('b')), &[1, 2]);
    assert_eq!(table.candidates(Some('z')), &[1]);
    assert_eq!(table.candidates(None), &[0, 1, 2, 3]);
}

#[test]
fn seq_guards_skip_walls_and_unbounded_children() {
    let grammar = Grammar::new().with(
        "main",
        "(" + Rule::wall("paren") + Rule::star(" ") + Rule::among("xy"),
    );
    let graph = snapped(&grammar);
    let guards = graph.seq_guards(graph.lookup("main").unwrap());
    assert_eq!(
        guards,
        &[
            Some(CharSet::from("(")),
            None,
            None,
            Some(CharSet::from("xy")),
        ]
    );
}

#[test]
fn dump_lists_every_node() {
    let graph = snapped(&arith());
    let dump = graph.dump(Colors::OFF);
    assert_eq!(dump.lines().count(), graph.len());
    assert!(dump.lines().any(|line| line.contains(" expr ") && line.contains("first=")));
    assert!(dump.contains("len=?"));
}
