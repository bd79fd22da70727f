use indexmap::IndexMap;

use crate::context::Bindings;
use crate::expr::eval_str;
use crate::value::Value;

fn map(entries: &[(&str, Value)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<IndexMap<_, _>>(),
    )
}

#[test]
fn serializes_as_json() {
    let value = map(&[
        ("name", Value::str("x")),
        ("items", Value::List(vec![Value::Int(1), Value::Bool(true)])),
        ("missing", Value::None),
        ("empty", Value::Empty),
    ]);
    assert_eq!(
        serde_json::to_string(&value).unwrap(),
        r#"{"name":"x","items":[1,true],"missing":null,"empty":null}"#
    );
}

#[test]
fn truthiness() {
    assert!(!Value::Empty.is_truthy());
    assert!(!Value::None.is_truthy());
    assert!(!Value::str("").is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(!Value::List(Vec::new()).is_truthy());
    assert!(Value::str("a").is_truthy());
    assert!(Value::Int(-1).is_truthy());
}

#[test]
fn literals_evaluate_back() {
    let env = Bindings::new();
    let values = [
        Value::None,
        Value::Bool(false),
        Value::Int(-42),
        Value::str("quote \" and \\ and\nnewline"),
        Value::List(vec![Value::Int(1), Value::str("a"), Value::List(Vec::new())]),
        map(&[("k", Value::Int(1)), ("nested", map(&[("x", Value::None)]))]),
    ];
    for value in values {
        let literal = value.to_literal().unwrap();
        assert_eq!(eval_str(&literal, &env).unwrap(), value, "{literal}");
    }
    assert_eq!(Value::Empty.to_literal(), None);
}

#[test]
fn text_form() {
    assert_eq!(Value::str("abc").to_text(), "abc");
    assert_eq!(Value::Int(7).to_text(), "7");
    assert_eq!(Value::Empty.to_text(), "");
    assert_eq!(Value::None.type_name(), "None");
    assert_eq!(Value::Map(IndexMap::new()).type_name(), "dict");
}
