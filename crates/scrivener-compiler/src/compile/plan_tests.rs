use scrivener_bytecode::RoutineId;
use scrivener_grammar::{Grammar, Library, Parser, Rule};

use super::plan::{Plan, routine_name};

fn plan(parser: &Parser) -> Plan {
    Plan::new(parser.graph(), parser.main())
}

#[test]
fn main_rule_is_the_first_routine() {
    let grammar = Grammar::new()
        .with("word", Rule::take(Rule::plus(Rule::alphanum())))
        .with("pair", Rule::call("word") + "=" + Rule::call("word"));
    let parser = Parser::new(grammar, "pair").unwrap();
    let plan = plan(&parser);

    assert_eq!(plan.routine(parser.main()), Some(RoutineId(0)));
    assert_eq!(plan.routines().len(), 2);
    assert_eq!(plan.entries()["pair"], RoutineId(0));
    assert_eq!(plan.entries()["word"], RoutineId(1));
}

#[test]
fn shared_anonymous_rule_gets_a_routine() {
    let digits = Rule::take(Rule::plus(Rule::among("0123456789")));
    let grammar = Grammar::new().with("pair", digits.clone() + "," + digits);
    let parser = Parser::new(grammar, "pair").unwrap();
    let plan = plan(&parser);

    assert_eq!(plan.routines().len(), 2);
    let shared = plan.routines()[1];
    assert!(routine_name(parser.graph(), shared).starts_with('#'));
    assert_eq!(plan.entries().len(), 1);
}

#[test]
fn single_use_composites_are_inlined() {
    let rule = Rule::take(Rule::plus(Rule::alphanum())) + Rule::opt("!");
    let parser = Parser::new(Grammar::new().with("main", rule), "main").unwrap();

    assert_eq!(plan(&parser).routines().len(), 1);
}

#[test]
fn imported_recursion_gets_a_routine() {
    let nest = Grammar::new().with("nest", "(" + Rule::opt(Rule::call("nest")) + ")");
    let library = Library::new().with("lib", nest);
    let mut grammar = Grammar::new().with(
        "main",
        Rule::call2("n", "nest", Vec::<&str>::new()).unwrap() + "!",
    );
    grammar.import("n", "lib");
    let parser = Parser::with_library(grammar, "main", &library).unwrap();
    let plan = plan(&parser);

    assert_eq!(plan.routines().len(), 2);
    assert_eq!(routine_name(parser.graph(), plan.routines()[1]), "lib.nest");
    assert_eq!(plan.entries().keys().collect::<Vec<_>>(), ["main"]);
}

#[test]
fn aliases_share_the_routine() {
    let grammar = Grammar::new()
        .with("word", Rule::take(Rule::plus(Rule::alphanum())))
        .with("alias", Rule::call("word"));
    let parser = Parser::new(grammar, "word").unwrap();
    let plan = plan(&parser);

    assert_eq!(plan.routines().len(), 1);
    assert_eq!(plan.entries()["alias"], RoutineId(0));
}
