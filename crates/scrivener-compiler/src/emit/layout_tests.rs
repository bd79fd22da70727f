use scrivener_bytecode::{Addr, Instruction as I};

use super::layout::{Item, Label, layout};
use crate::error::CompileError;

fn instr(instr: I<Label>) -> Item {
    Item::Instr(instr)
}

#[test]
fn marks_resolve_to_the_next_instruction() {
    let items = vec![
        Item::Mark(Label(0)),
        instr(I::Any),
        instr(I::JumpIfMiss(Label(1))),
        instr(I::Jump(Label(0))),
        Item::Mark(Label(1)),
        instr(I::Ret),
    ];
    let code = layout(items).unwrap();

    assert_eq!(
        code,
        vec![I::Any, I::JumpIfMiss(Addr(3)), I::Jump(Addr(0)), I::Ret]
    );
}

#[test]
fn jumps_to_the_following_mark_are_dropped() {
    let items = vec![
        instr(I::Any),
        instr(I::Jump(Label(1))),
        Item::Mark(Label(0)),
        Item::Mark(Label(1)),
        instr(I::Ret),
    ];
    let code = layout(items).unwrap();

    assert_eq!(code, vec![I::Any, I::Ret]);
}

#[test]
fn conditional_jumps_are_kept() {
    let items = vec![
        instr(I::JumpIfMiss(Label(0))),
        Item::Mark(Label(0)),
        instr(I::Ret),
    ];
    let code = layout(items).unwrap();

    assert_eq!(code, vec![I::JumpIfMiss(Addr(1)), I::Ret]);
}

#[test]
fn unplaced_label_is_an_error() {
    let items = vec![instr(I::Jump(Label(7))), instr(I::Ret)];

    assert_eq!(layout(items), Err(CompileError::UnplacedLabel(7)));
}
