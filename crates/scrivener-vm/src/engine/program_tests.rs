use indexmap::IndexMap;

use scrivener_bytecode::{Constant, Instruction as I, Module, RegexId, Routine, RoutineId, Tables};
use scrivener_grammar::Value;

use super::{LoadError, Program};

fn module(tables: Tables, code: Vec<I>) -> Module {
    let entries = IndexMap::from([("main".to_string(), RoutineId(0))]);
    Module::new(tables, vec![Routine::new("main", code)], entries, "main").unwrap()
}

#[test]
fn constants_are_evaluated_at_load() {
    let tables = Tables {
        consts: vec![
            Constant::Literal("[1, \"a\", None]".into()),
            Constant::Empty,
        ],
        ..Tables::default()
    };
    let program = Program::load(&module(tables, vec![I::Ret])).unwrap();

    assert_eq!(
        program.constant(0),
        &Value::List(vec![Value::Int(1), Value::str("a"), Value::None])
    );
    assert_eq!(program.constant(1), &Value::Empty);
}

#[test]
fn bad_regex_fails_to_load() {
    let tables = Tables {
        regexes: vec!["[a-z]+".into(), "(".into()],
        ..Tables::default()
    };
    let code = vec![I::Regex(RegexId(1)), I::Ret];
    let error = Program::load(&module(tables, code)).unwrap_err();

    assert!(matches!(error, LoadError::Regex { index: 1, .. }));
}

#[test]
fn bad_expression_fails_to_load() {
    let tables = Tables {
        exprs: vec!["1 +".into()],
        ..Tables::default()
    };
    let error = Program::load(&module(tables, vec![I::Ret])).unwrap_err();

    assert!(matches!(error, LoadError::Expr { index: 0, .. }));
}

#[test]
fn bad_constant_fails_to_load() {
    let tables = Tables {
        consts: vec![Constant::Literal("undefined_name".into())],
        ..Tables::default()
    };
    let error = Program::load(&module(tables, vec![I::Ret])).unwrap_err();

    let LoadError::Constant { index, source_text, .. } = error else {
        panic!("expected a constant error, got {error:?}");
    };
    assert_eq!(index, 0);
    assert_eq!(source_text, "undefined_name");
}

#[test]
fn main_name_comes_from_the_module() {
    let program = Program::load(&module(Tables::default(), vec![I::Empty, I::Ret])).unwrap();

    assert_eq!(program.main_name(), "main");
    assert_eq!(program.parse("anything"), Ok(Value::Empty));
}
