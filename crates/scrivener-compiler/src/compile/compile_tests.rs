use indoc::indoc;

use scrivener_bytecode::{Instruction as I, Module, RoutineId, StrId};
use scrivener_grammar::{Grammar, Parser, Rule, Value, bootstrap};

use crate::{CompileError, compile};

fn single(rule: Rule) -> Module {
    let parser = Parser::new(Grammar::new().with("main", rule), "main").unwrap();
    compile(&parser).unwrap()
}

fn listing(module: &Module, routine: RoutineId) -> String {
    module
        .routine(routine)
        .code()
        .iter()
        .enumerate()
        .map(|(addr, instr)| format!("@{addr} {instr}\n"))
        .collect()
}

#[test]
fn terminal_rule_compiles_inline() {
    let module = single(Rule::literal("ab"));

    assert_eq!(module.main_name(), "main");
    assert_eq!(
        module.routine(module.main()).code(),
        [I::Literal(StrId(0)), I::Ret]
    );
    assert_eq!(module.tables().strings, ["ab"]);
}

#[test]
fn choice_guards_each_alternative() {
    let module = single(Rule::literal("a") | "b");

    insta::assert_snapshot!(listing(&module, module.main()), @r"
    @0 guard c0 @7
    @1 scope_push
    @2 literal s0
    @3 jump_miss @6
    @4 scope_merge
    @5 jump @15
    @6 scope_discard
    @7 guard c1 @14
    @8 scope_push
    @9 literal s1
    @10 jump_miss @13
    @11 scope_merge
    @12 jump @15
    @13 scope_discard
    @14 miss
    @15 ret
    ");
}

#[test]
fn sequence_restores_the_position_on_a_miss() {
    let module = single(Rule::literal("a") + "b");

    assert_eq!(
        listing(&module, module.main()),
        indoc! {"
            @0 push_pos
            @1 scope_push
            @2 guard c0 @13
            @3 literal s0
            @4 jump_miss @13
            @5 jump_failure @13
            @6 guard c1 @13
            @7 literal s1
            @8 jump_miss @13
            @9 jump_failure @13
            @10 scope_discard
            @11 drop_pos
            @12 jump @15
            @13 scope_discard
            @14 pop_pos
            @15 ret
        "}
    );
}

#[test]
fn wall_misses_raise_errors() {
    let module = single(Rule::literal("a") + Rule::wall("header") + "b");
    let code = module.routine(module.main()).code();

    let Some(I::WallError { wall, rule }) = code.iter().find(|i| matches!(i, I::WallError { .. }))
    else {
        panic!("no wall error emitted");
    };
    assert_eq!(module.tables().string(*wall), "header");
    assert_eq!(module.tables().string(*rule), "\"b\"");
}

#[test]
fn recursion_compiles_to_calls() {
    let grammar = Grammar::new().with("nest", "(" + Rule::opt(Rule::call("nest")) + ")");
    let parser = Parser::new(grammar, "nest").unwrap();
    let module = compile(&parser).unwrap();

    assert_eq!(module.routines().len(), 1);
    assert!(module.routine(RoutineId(0)).code().contains(&I::Call(RoutineId(0))));
}

#[test]
fn shared_rules_are_emitted_once() {
    let word = Rule::take(Rule::plus(Rule::alphanum()));
    let module = single(word.clone() + "=" + word);

    assert_eq!(module.routines().len(), 2);
    let calls = module
        .routine(module.main())
        .code()
        .iter()
        .filter(|i| **i == I::Call(RoutineId(1)))
        .count();
    assert_eq!(calls, 2);
}

#[test]
fn every_rule_is_an_entry() {
    let grammar = Grammar::new()
        .with("word", Rule::take(Rule::plus(Rule::alphanum())))
        .with("pair", Rule::call("word") + "=" + Rule::call("word"));
    let parser = Parser::new(grammar, "pair").unwrap();
    let module = compile(&parser).unwrap();

    assert_eq!(module.entries().keys().collect::<Vec<_>>(), ["word", "pair"]);
    assert_eq!(module.main(), RoutineId(0));
    assert_eq!(module.routine(module.main()).name(), "pair");
}

#[test]
fn rule_constants_are_rejected() {
    let parser = Parser::new(
        Grammar::new().with("main", Rule::value(Value::Rule(Rule::any()))),
        "main",
    )
    .unwrap();

    assert_eq!(
        compile(&parser),
        Err(CompileError::UnsupportedConstant {
            rule: "main".into(),
            found: "rule",
        })
    );
}

#[test]
fn bootstrap_grammar_compiles_and_round_trips() {
    let module = compile(bootstrap::parser()).unwrap();
    let reloaded = Module::from_source(&module.to_source()).unwrap();

    assert_eq!(reloaded, module);
    assert_eq!(reloaded.main_name(), bootstrap::parser().main_name());
}
