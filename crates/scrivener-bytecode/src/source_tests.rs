use indexmap::IndexMap;

use scrivener_core::CharSet;

use super::ids::{Addr, CharSetId, ExprId, RegexId, RoutineId, StrId};
use super::instructions::Instruction as I;
use super::module::{Constant, Module, Routine, Tables};
use super::source::ModuleError;
use super::verify::VerifyError;

fn sample() -> Module {
    let tables = Tables {
        strings: vec!["ab".into(), "w".into()],
        charsets: vec![CharSet::from("ba")],
        regexes: vec!["[a-z]+".into()],
        exprs: vec!["len(w) > 1".into()],
        consts: vec![Constant::Empty, Constant::Literal("None".into())],
    };
    let main = vec![
        I::PushPos,
        I::Guard {
            set: CharSetId(0),
            skip: Addr(3),
        },
        I::Call(RoutineId(1)),
        I::Take,
        I::Ret,
    ];
    let word = vec![
        I::Regex(RegexId(0)),
        I::Bind(StrId(1)),
        I::If(ExprId(0)),
        I::Ret,
    ];
    let entries = IndexMap::from([
        ("main".to_string(), RoutineId(0)),
        ("word".to_string(), RoutineId(1)),
    ]);
    Module::new(
        tables,
        vec![Routine::new("main", main), Routine::new("word", word).rule(true)],
        entries,
        "main",
    )
    .unwrap()
}

fn body(source: &str) -> &str {
    source.split_once('\n').unwrap().1
}

/// Source text with a correct header for `body`.
fn with_checksum(body: &str) -> String {
    format!(".module v1 crc32 {:#010x}\n{body}", crc32fast::hash(body.as_bytes()))
}

#[test]
fn source_layout() {
    let source = sample().to_source();
    assert!(source.starts_with(".module v1 crc32 0x"));
    insta::assert_snapshot!(body(&source), @r#"
    .strings 2
      s0 "ab"
      s1 "w"
    .charsets 1
      c0 "ab"
    .regexes 1
      x0 "[a-z]+"
    .exprs 1
      e0 "len(w) > 1"
    .consts 2
      k0 empty
      k1 "None"
    .routines 2
    .routine p0 "main" slots 1
      @0 push_pos
      @1 guard c0 @3
      @2 call p1
      @3 take
      @4 ret
    .routine p1 "word" slots 0 rule
      @0 regex x0
      @1 bind s1
      @2 if e0
      @3 ret
    .entries 2
      "main" p0
      "word" p1
    .main "main"
    "#);
}

#[test]
fn source_round_trips() {
    let module = sample();
    assert_eq!(Module::from_source(&module.to_source()).unwrap(), module);
}

#[test]
fn escapes_survive_the_round_trip() {
    let tables = Tables {
        strings: vec!["tab\there \"quoted\"\n".into(), "\\".into()],
        ..Tables::default()
    };
    let code = vec![I::Literal(StrId(0)), I::Literal(StrId(1)), I::Ret];
    let entries = IndexMap::from([("odd name".to_string(), RoutineId(0))]);
    let module = Module::new(tables, vec![Routine::new("odd name", code)], entries, "odd name").unwrap();
    assert_eq!(Module::from_source(&module.to_source()).unwrap(), module);
}

#[test]
fn comments_are_ignored() {
    let source = sample().to_source();
    let commented = body(&source).replace("  @4 ret\n", "  @4 ret ; leave main\n");
    let module = Module::from_source(&with_checksum(&commented)).unwrap();
    assert_eq!(module, sample());
}

#[test]
fn tampered_body_fails_the_checksum() {
    let source = sample().to_source().replace("s0 \"ab\"", "s0 \"ac\"");
    assert!(matches!(
        Module::from_source(&source),
        Err(ModuleError::ChecksumMismatch { .. })
    ));
}

#[test]
fn header_is_checked() {
    assert_eq!(
        Module::from_source("routine\n"),
        Err(ModuleError::MissingHeader)
    );
    assert_eq!(
        Module::from_source(".module v9 crc32 0x00000000\n"),
        Err(ModuleError::UnsupportedVersion("v9".into()))
    );
    assert!(matches!(
        Module::from_source(".module v1 md5 0x00000000\n"),
        Err(ModuleError::BadHeader(_))
    ));
}

#[test]
fn syntax_errors_report_lines() {
    let source = sample().to_source();
    let broken = body(&source).replace("@2 call p1", "@2 call s1");
    let err = Module::from_source(&with_checksum(&broken)).unwrap_err();
    assert!(matches!(err, ModuleError::Syntax { line: 18, .. }), "{err}");

    let unknown = body(&source).replace("@3 take", "@3 fly");
    assert_eq!(
        Module::from_source(&with_checksum(&unknown)).unwrap_err(),
        ModuleError::UnknownInstruction {
            line: 19,
            name: "fly".into()
        }
    );
}

#[test]
fn addresses_must_be_sequential() {
    let source = sample().to_source();
    let skipped = body(&source).replace("@3 take", "@4 take");
    assert!(matches!(
        Module::from_source(&with_checksum(&skipped)),
        Err(ModuleError::Syntax { .. })
    ));
}

#[test]
fn declared_slots_must_match() {
    let source = sample().to_source();
    let wrong = body(&source).replace("\"main\" slots 1", "\"main\" slots 3");
    assert_eq!(
        Module::from_source(&with_checksum(&wrong)).unwrap_err(),
        ModuleError::SlotMismatch {
            routine: "main".into(),
            declared: 3,
            needed: 1
        }
    );
}

#[test]
fn loaded_code_is_verified() {
    let source = sample().to_source();
    let unbalanced = body(&source).replace("@3 take", "@3 empty");
    assert!(matches!(
        Module::from_source(&with_checksum(&unbalanced)),
        Err(ModuleError::Verify(VerifyError::Unbalanced { .. }))
    ));
}
